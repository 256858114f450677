/*!
 * Host Types
 * Data handed across the host boundary
 */

use crate::core::errors::HostError;
use crate::core::types::{DeviceId, LocalId};
use crate::session::SessionHandle;
use serde::{Deserialize, Serialize};

/// How an asynchronous sign-in should pick the account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInOptions {
    /// Sign in the default account without showing UI
    AddDefaultUserSilently,
    /// Sign in the default account, showing UI if the host needs it
    AddDefaultUserAllowingUi,
    /// Let the player pick an account
    AddUser,
}

/// Result of an asynchronous sign-in, as delivered by the host
pub type SignInOutcome = Result<Box<dyn SessionHandle>, HostError>;

/// Message posted to the main window and pumped back on the main thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMessage {
    /// Payload-free wake-up that marshals a quiescence notification
    QuiesceWake,
    /// Any other window message, forwarded to the registered handler
    Native(u32),
}

/// A device moved between sessions
///
/// `None` on either side means the device was unbound before, or is
/// unbound after, the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAssociationChange {
    pub device: DeviceId,
    pub old_user: Option<LocalId>,
    pub new_user: Option<LocalId>,
}
