/*!
 * Completion Records
 * Units of work produced on host threads and applied on the main thread
 */

use crate::core::errors::CompletionError;
use crate::core::types::LocalId;
use crate::host::{DeviceAssociationChange, SignInOutcome};
use std::fmt;

/// Account state change reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SessionChangeEvent {
    SignedInAgain = 0,
    SigningOut = 1,
    SignedOut = 2,
    Gamertag = 3,
    GamerPicture = 4,
    Privileges = 5,
}

impl SessionChangeEvent {
    /// Decode a host event code
    pub fn from_raw(raw: u32) -> Result<Self, CompletionError> {
        match raw {
            0 => Ok(SessionChangeEvent::SignedInAgain),
            1 => Ok(SessionChangeEvent::SigningOut),
            2 => Ok(SessionChangeEvent::SignedOut),
            3 => Ok(SessionChangeEvent::Gamertag),
            4 => Ok(SessionChangeEvent::GamerPicture),
            5 => Ok(SessionChangeEvent::Privileges),
            _ => Err(CompletionError::UnknownSessionEvent(raw)),
        }
    }

    pub fn raw(self) -> u32 {
        self as u32
    }
}

/// One unit of work handed from a host thread to the dispatch loop
///
/// Applied exactly once, then discarded.
pub enum PendingCompletion {
    /// An asynchronous sign-in finished
    SignIn(SignInOutcome),
    /// An account changed state; the event code is decoded on apply
    SessionChanged { local_id: LocalId, raw_event: u32 },
    /// A device moved between sessions
    DeviceAssociation(DeviceAssociationChange),
}

impl PendingCompletion {
    pub fn kind(&self) -> &'static str {
        match self {
            PendingCompletion::SignIn(_) => "sign_in",
            PendingCompletion::SessionChanged { .. } => "session_changed",
            PendingCompletion::DeviceAssociation(_) => "device_association",
        }
    }
}

impl fmt::Debug for PendingCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingCompletion::SignIn(outcome) => f
                .debug_tuple("SignIn")
                .field(&outcome.as_ref().map(|_| "handle"))
                .finish(),
            PendingCompletion::SessionChanged {
                local_id,
                raw_event,
            } => f
                .debug_struct("SessionChanged")
                .field("local_id", local_id)
                .field("raw_event", raw_event)
                .finish(),
            PendingCompletion::DeviceAssociation(change) => {
                f.debug_tuple("DeviceAssociation").field(change).finish()
            }
        }
    }
}
