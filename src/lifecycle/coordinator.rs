/*!
 * Suspend/Resume Coordinator
 *
 * Two-event handshake between the host notification thread and the main
 * thread.
 *
 * # Protocol
 *
 * 1. Host thread receives `quiescing = true`: both events are reset, a
 *    payload-free wake-up is posted to the main window, and the host thread
 *    parks on `quiesce_ack` with no timeout. The host enforces its own outer
 *    deadline; returning before the main thread has quiesced would let the
 *    host revoke resources mid-save.
 * 2. Main thread pumps the wake-up: marks itself suspended, fires
 *    on-suspend, then sets `quiesce_ack`, which releases the host thread.
 * 3. Main thread waits for `resume` (parked or polled, per `ResumeMode`).
 * 4. Host thread receives `quiescing = false`: sets `resume`.
 * 5. Main thread clears the suspended flag and fires on-resume.
 */

use super::events::{LifecycleEvent, LifecycleEvents};
use super::state::{AtomicLifecycleState, LifecycleState};
use crate::config::ResumeMode;
use crate::core::sync::Event;
use crate::core::types::WindowHandle;
use crate::host::{HostMessage, PlatformServices};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Coordinates the quiescence handshake
pub struct SuspendCoordinator {
    host: Arc<dyn PlatformServices>,
    /// Set by the main thread once on-suspend handlers have returned
    quiesce_ack: Event,
    /// Set by the host thread when the process may continue
    resume: Event,
    state: AtomicLifecycleState,
    suspended: AtomicBool,
    window: Mutex<Option<WindowHandle>>,
    detached: AtomicBool,
    handshakes: AtomicU64,
}

impl SuspendCoordinator {
    pub fn new(host: Arc<dyn PlatformServices>) -> Self {
        Self {
            host,
            quiesce_ack: Event::auto_reset(),
            resume: Event::auto_reset(),
            state: AtomicLifecycleState::new(LifecycleState::Running),
            suspended: AtomicBool::new(false),
            window: Mutex::new(None),
            detached: AtomicBool::new(false),
            handshakes: AtomicU64::new(0),
        }
    }

    /// Target window for the wake-up message
    pub fn attach_window(&self, window: WindowHandle) {
        *self.window.lock() = Some(window);
        self.detached.store(false, Ordering::Release);
    }

    /// Stop reacting to quiescence notifications
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
        *self.window.lock() = None;
        let state = self.state();
        if state != LifecycleState::Running {
            warn!(%state, "Shutdown during a pending suspend handshake is unsupported");
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state.load()
    }

    /// False between the main thread reacting to suspend and resuming
    pub fn has_focus(&self) -> bool {
        !self.suspended.load(Ordering::Acquire)
    }

    /// Completed suspend/resume cycles
    pub fn handshakes_completed(&self) -> u64 {
        self.handshakes.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Host thread
    // ========================================================================

    /// Entry point for the host quiescence notification
    pub fn on_quiescence(&self, quiescing: bool) {
        if quiescing {
            self.begin_suspend();
        } else {
            self.signal_resume();
        }
    }

    fn begin_suspend(&self) {
        if self.detached.load(Ordering::Acquire) {
            warn!("Quiescence notification after shutdown ignored");
            return;
        }
        let Some(window) = *self.window.lock() else {
            warn!("Quiescence notification without a main window, not deferring");
            return;
        };

        self.quiesce_ack.reset();
        self.resume.reset();

        if let Err(observed) = self
            .state
            .transition(LifecycleState::Running, LifecycleState::Suspending)
        {
            warn!(state = %observed, "Quiescence notification while not running");
            self.state.store(LifecycleState::Suspending);
        }

        // Marshal to the main thread; the message carries no payload
        if let Err(e) = self.host.post_message(window, HostMessage::QuiesceWake) {
            error!(error = %e, "Could not post suspend wake-up, suspending without deferral");
            self.state.store(LifecycleState::Running);
            return;
        }

        debug!("Deferring suspend until the main thread quiesces");
        // Unbounded by contract; the host owns the deadline
        self.quiesce_ack.wait();
        debug!("Suspend deferral released");
    }

    fn signal_resume(&self) {
        if self.detached.load(Ordering::Acquire) {
            warn!("Resume notification after shutdown ignored");
            return;
        }
        match self
            .state
            .transition(LifecycleState::Suspended, LifecycleState::Resuming)
        {
            Ok(()) => debug!("Resume signalled"),
            Err(state) => debug!(%state, "Resume signalled outside the suspended state"),
        }
        self.resume.set();
    }

    // ========================================================================
    // Main thread
    // ========================================================================

    /// Handle the wake-up message pumped on the main thread
    ///
    /// In `Park` mode this returns only after on-resume has fired.
    pub fn handle_wake(&self, events: &LifecycleEvents, mode: ResumeMode) {
        if self.state() != LifecycleState::Suspending {
            warn!(state = %self.state(), "Spurious suspend wake-up ignored");
            return;
        }

        info!("Suspending application");
        self.suspended.store(true, Ordering::Release);
        events.fire(LifecycleEvent::Suspend);
        self.state.store(LifecycleState::Suspended);

        // Complete the deferral
        self.quiesce_ack.set();

        if mode == ResumeMode::Park {
            self.resume.wait();
            self.finish_resume(events);
        }
    }

    /// Complete a pending resume without blocking (`Poll` mode)
    ///
    /// Returns `true` if on-resume fired.
    pub fn poll_resume(&self, events: &LifecycleEvents) -> bool {
        if !matches!(
            self.state(),
            LifecycleState::Suspended | LifecycleState::Resuming
        ) {
            return false;
        }
        if !self.resume.try_wait() {
            return false;
        }
        self.finish_resume(events);
        true
    }

    fn finish_resume(&self, events: &LifecycleEvents) {
        self.state.store(LifecycleState::Resuming);
        self.suspended.store(false, Ordering::Release);
        info!("Resuming application");
        events.fire(LifecycleEvent::Resume);
        self.state.store(LifecycleState::Running);
        self.handshakes.fetch_add(1, Ordering::Relaxed);
    }
}
