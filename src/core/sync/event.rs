/*!
 * Binary Event Signal
 *
 * A set/reset signal built on parking_lot::Condvar, used for the suspend
 * handshake between the host notification thread and the main thread.
 *
 * # Reset Modes
 *
 * - **Auto**: a successful wait consumes the signal, so exactly one waiter
 *   is released per `set`
 * - **Manual**: the signal stays set until `reset`, releasing every waiter
 */

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// How a signalled event returns to the unsignalled state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    Auto,
    Manual,
}

/// Binary synchronization signal
///
/// Created unsignalled. `wait` blocks without a timeout; callers that need a
/// deadline use `wait_timeout`.
pub struct Event {
    signalled: Mutex<bool>,
    condvar: Condvar,
    mode: ResetMode,
}

impl Event {
    pub const fn new(mode: ResetMode) -> Self {
        Self {
            signalled: Mutex::new(false),
            condvar: Condvar::new(),
            mode,
        }
    }

    pub const fn auto_reset() -> Self {
        Self::new(ResetMode::Auto)
    }

    pub const fn manual_reset() -> Self {
        Self::new(ResetMode::Manual)
    }

    #[inline]
    pub fn mode(&self) -> ResetMode {
        self.mode
    }

    /// Signal the event, releasing one waiter (auto) or all waiters (manual)
    pub fn set(&self) {
        let mut signalled = self.signalled.lock();
        *signalled = true;
        match self.mode {
            ResetMode::Auto => {
                self.condvar.notify_one();
            }
            ResetMode::Manual => {
                self.condvar.notify_all();
            }
        }
    }

    /// Return the event to the unsignalled state
    pub fn reset(&self) {
        *self.signalled.lock() = false;
    }

    /// Check the signal without blocking or consuming it
    pub fn is_set(&self) -> bool {
        *self.signalled.lock()
    }

    /// Consume the signal if it is set, without blocking
    ///
    /// For manual-reset events this only observes the signal.
    pub fn try_wait(&self) -> bool {
        let mut signalled = self.signalled.lock();
        if !*signalled {
            return false;
        }
        if self.mode == ResetMode::Auto {
            *signalled = false;
        }
        true
    }

    /// Block until the event is signalled. No timeout.
    pub fn wait(&self) {
        let mut signalled = self.signalled.lock();
        while !*signalled {
            self.condvar.wait(&mut signalled);
        }
        if self.mode == ResetMode::Auto {
            *signalled = false;
        }
    }

    /// Block until signalled or until `timeout` elapses
    ///
    /// Returns `true` if the signal was observed, `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signalled = self.signalled.lock();
        while !*signalled {
            if self.condvar.wait_until(&mut signalled, deadline).timed_out() {
                break;
            }
        }
        if !*signalled {
            return false;
        }
        if self.mode == ResetMode::Auto {
            *signalled = false;
        }
        true
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::auto_reset()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("mode", &self.mode)
            .field("signalled", &self.is_set())
            .finish()
    }
}
