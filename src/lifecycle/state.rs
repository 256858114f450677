/*!
 * Lifecycle State
 * Suspend/resume state machine shared between host and main threads
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Position in the suspend/resume handshake
///
/// `Running -> Suspending -> Suspended -> Resuming -> Running`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LifecycleState {
    Running = 0,
    /// Quiescence received, main thread not yet done reacting
    Suspending = 1,
    /// On-suspend handlers returned, host released
    Suspended = 2,
    /// Host signalled continuation, on-resume handlers pending
    Resuming = 3,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => LifecycleState::Suspending,
            2 => LifecycleState::Suspended,
            3 => LifecycleState::Resuming,
            _ => LifecycleState::Running,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Running => "running",
            LifecycleState::Suspending => "suspending",
            LifecycleState::Suspended => "suspended",
            LifecycleState::Resuming => "resuming",
        };
        f.write_str(name)
    }
}

/// Lock-free cell holding a [`LifecycleState`]
#[derive(Debug)]
pub(crate) struct AtomicLifecycleState(AtomicU8);

impl AtomicLifecycleState {
    pub(crate) const fn new(state: LifecycleState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    #[inline]
    pub(crate) fn load(&self) -> LifecycleState {
        LifecycleState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn store(&self, state: LifecycleState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move `from -> to`; returns the state actually observed on failure
    pub(crate) fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), LifecycleState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(LifecycleState::from_u8)
    }
}
