/*!
 * Simulated Host
 *
 * In-process `PlatformServices` implementation. Notifications are injected
 * by calling the `notify_*` / `complete_*` methods from any thread, which
 * stands in for the host's notification and thread-pool threads. Posted
 * messages are queued on a flume channel and pumped by the main thread.
 */

use super::traits::{PlatformCallbacks, PlatformServices};
use super::types::{DeviceAssociationChange, HostMessage, SignInOptions};
use crate::core::errors::{HostError, HostResult};
use crate::core::types::{LocalId, RegistrationToken, WindowHandle};
use crate::session::SessionHandle;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Failure injection for the simulated host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatedHostOptions {
    pub fail_runtime_init: bool,
    pub fail_app_state_registration: bool,
    pub fail_session_registration: bool,
    pub fail_device_registration: bool,
    pub fail_sign_in_request: bool,
    pub fail_post_message: bool,
}

/// Account handle handed out by the simulated host
///
/// Clones share the close counter, so a test can keep one clone and observe
/// whether the crate released the other.
#[derive(Debug, Clone)]
pub struct SimulatedUser {
    local_id: LocalId,
    readable: bool,
    closes: Arc<AtomicUsize>,
}

impl SimulatedUser {
    pub fn new(local_id: LocalId) -> Self {
        Self {
            local_id,
            readable: true,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A handle whose local id cannot be read back
    pub fn unreadable(local_id: LocalId) -> Self {
        Self {
            readable: false,
            ..Self::new(local_id)
        }
    }

    pub fn id(&self) -> LocalId {
        self.local_id
    }

    pub fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl SessionHandle for SimulatedUser {
    fn local_id(&self) -> HostResult<LocalId> {
        if self.readable {
            Ok(self.local_id)
        } else {
            Err(HostError::CallFailed {
                call: "XUserGetLocalId",
                code: 0x8007_0057,
            })
        }
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Registrations {
    app_state: Option<(RegistrationToken, WindowHandle, Arc<dyn PlatformCallbacks>)>,
    session: Option<(RegistrationToken, Arc<dyn PlatformCallbacks>)>,
    device: Option<(RegistrationToken, Arc<dyn PlatformCallbacks>)>,
}

/// In-process host used by tests, benches and the simulator binary
pub struct SimulatedHost {
    options: SimulatedHostOptions,
    runtime_initialized: AtomicBool,
    registrations: Mutex<Registrations>,
    pending_sign_ins: Mutex<VecDeque<(SignInOptions, Arc<dyn PlatformCallbacks>)>>,
    messages_tx: flume::Sender<(WindowHandle, HostMessage)>,
    messages_rx: flume::Receiver<(WindowHandle, HostMessage)>,
    launched: Mutex<Vec<(LocalId, String)>>,
    next_token: AtomicU64,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::with_options(SimulatedHostOptions::default())
    }

    pub fn with_options(options: SimulatedHostOptions) -> Self {
        let (messages_tx, messages_rx) = flume::unbounded();
        Self {
            options,
            runtime_initialized: AtomicBool::new(false),
            registrations: Mutex::new(Registrations::default()),
            pending_sign_ins: Mutex::new(VecDeque::new()),
            messages_tx,
            messages_rx,
            launched: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(1),
        }
    }

    fn token(&self) -> RegistrationToken {
        RegistrationToken(self.next_token.fetch_add(1, Ordering::Relaxed))
    }

    // ========================================================================
    // Notification injection (any thread)
    // ========================================================================

    /// Deliver a quiescence notification on the calling thread
    ///
    /// Blocks like the real host callback when `quiescing` is true. Returns
    /// `false` if nothing is registered.
    pub fn notify_quiescence(&self, quiescing: bool) -> bool {
        let callbacks = self
            .registrations
            .lock()
            .app_state
            .as_ref()
            .map(|(_, _, cb)| cb.clone());
        match callbacks {
            Some(callbacks) => {
                debug!(quiescing, "Simulated quiescence notification");
                callbacks.quiescence_changed(quiescing);
                true
            }
            None => false,
        }
    }

    pub fn notify_session_change(&self, local_id: LocalId, raw_event: u32) -> bool {
        let callbacks = self
            .registrations
            .lock()
            .session
            .as_ref()
            .map(|(_, cb)| cb.clone());
        match callbacks {
            Some(callbacks) => {
                callbacks.session_changed(local_id, raw_event);
                true
            }
            None => false,
        }
    }

    pub fn notify_device_association(&self, change: DeviceAssociationChange) -> bool {
        let callbacks = self
            .registrations
            .lock()
            .device
            .as_ref()
            .map(|(_, cb)| cb.clone());
        match callbacks {
            Some(callbacks) => {
                callbacks.device_association_changed(change);
                true
            }
            None => false,
        }
    }

    /// Complete the oldest pending sign-in with `user`
    pub fn complete_sign_in(&self, user: SimulatedUser) -> bool {
        match self.pending_sign_ins.lock().pop_front() {
            Some((options, callbacks)) => {
                debug!(local_id = %user.id(), ?options, "Simulated sign-in completed");
                callbacks.sign_in_completed(Ok(Box::new(user)));
                true
            }
            None => false,
        }
    }

    /// Fail the oldest pending sign-in with `error`
    pub fn fail_sign_in(&self, error: HostError) -> bool {
        match self.pending_sign_ins.lock().pop_front() {
            Some((_, callbacks)) => {
                callbacks.sign_in_completed(Err(error));
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn is_runtime_initialized(&self) -> bool {
        self.runtime_initialized.load(Ordering::SeqCst)
    }

    pub fn pending_sign_ins(&self) -> usize {
        self.pending_sign_ins.lock().len()
    }

    pub fn queued_messages(&self) -> usize {
        self.messages_rx.len()
    }

    /// Number of active notification registrations
    pub fn active_registrations(&self) -> usize {
        let regs = self.registrations.lock();
        usize::from(regs.app_state.is_some())
            + usize::from(regs.session.is_some())
            + usize::from(regs.device.is_some())
    }

    pub fn launched_uris(&self) -> Vec<(LocalId, String)> {
        self.launched.lock().clone()
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

fn injected(call: &'static str) -> HostError {
    HostError::CallFailed {
        call,
        code: 0x8000_4005,
    }
}

impl PlatformServices for SimulatedHost {
    fn initialize_runtime(&self) -> HostResult<()> {
        if self.options.fail_runtime_init {
            return Err(injected("XGameRuntimeInitialize"));
        }
        self.runtime_initialized.store(true, Ordering::SeqCst);
        info!("Simulated game runtime initialized");
        Ok(())
    }

    fn uninitialize_runtime(&self) {
        self.runtime_initialized.store(false, Ordering::SeqCst);
    }

    fn register_app_state_change(
        &self,
        window: WindowHandle,
        callbacks: Arc<dyn PlatformCallbacks>,
    ) -> HostResult<RegistrationToken> {
        if self.options.fail_app_state_registration {
            return Err(injected("RegisterAppStateChangeNotification"));
        }
        let token = self.token();
        self.registrations.lock().app_state = Some((token, window, callbacks));
        Ok(token)
    }

    fn unregister_app_state_change(&self, token: RegistrationToken) -> HostResult<()> {
        let mut regs = self.registrations.lock();
        if !matches!(&regs.app_state, Some((t, _, _)) if *t == token) {
            return Err(HostError::UnknownRegistration(token.0));
        }
        regs.app_state = None;
        Ok(())
    }

    fn register_session_change(
        &self,
        callbacks: Arc<dyn PlatformCallbacks>,
    ) -> HostResult<RegistrationToken> {
        if self.options.fail_session_registration {
            return Err(injected("XUserRegisterForChangeEvent"));
        }
        let token = self.token();
        self.registrations.lock().session = Some((token, callbacks));
        Ok(token)
    }

    fn unregister_session_change(&self, token: RegistrationToken) -> HostResult<()> {
        let mut regs = self.registrations.lock();
        if !matches!(&regs.session, Some((t, _)) if *t == token) {
            return Err(HostError::UnknownRegistration(token.0));
        }
        regs.session = None;
        Ok(())
    }

    fn register_device_association_change(
        &self,
        callbacks: Arc<dyn PlatformCallbacks>,
    ) -> HostResult<RegistrationToken> {
        if self.options.fail_device_registration {
            return Err(injected("XUserRegisterForDeviceAssociationChanged"));
        }
        let token = self.token();
        self.registrations.lock().device = Some((token, callbacks));
        Ok(token)
    }

    fn unregister_device_association_change(&self, token: RegistrationToken) -> HostResult<()> {
        let mut regs = self.registrations.lock();
        if !matches!(&regs.device, Some((t, _)) if *t == token) {
            return Err(HostError::UnknownRegistration(token.0));
        }
        regs.device = None;
        Ok(())
    }

    fn add_user_async(
        &self,
        options: SignInOptions,
        callbacks: Arc<dyn PlatformCallbacks>,
    ) -> HostResult<()> {
        if self.options.fail_sign_in_request {
            return Err(injected("XUserAddAsync"));
        }
        self.pending_sign_ins.lock().push_back((options, callbacks));
        Ok(())
    }

    fn post_message(&self, window: WindowHandle, message: HostMessage) -> HostResult<()> {
        if self.options.fail_post_message {
            return Err(injected("PostMessage"));
        }
        self.messages_tx
            .send((window, message))
            .map_err(|_| HostError::ResourceUnavailable("message queue closed".into()))
    }

    fn pump_messages(&self, dispatch: &mut dyn FnMut(WindowHandle, HostMessage)) -> usize {
        let mut delivered = 0;
        while let Ok((window, message)) = self.messages_rx.try_recv() {
            dispatch(window, message);
            delivered += 1;
        }
        delivered
    }

    fn launch_uri(&self, user: &dyn SessionHandle, uri: &str) -> HostResult<()> {
        let local_id = user.local_id()?;
        self.launched.lock().push((local_id, uri.to_string()));
        Ok(())
    }
}
