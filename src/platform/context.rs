/*!
 * Lifecycle Context
 *
 * Public entry points composing the session registry, completion channel
 * and suspend coordinator. One context per process is typical, but nothing
 * here is global: tests build as many independent contexts as they like.
 *
 * All methods taking `&mut self` belong on the main thread.
 */

use crate::config::{LifecycleConfig, ResumeMode};
use crate::core::errors::{LifecycleError, LifecycleResult, SessionError};
use crate::core::types::{RegistrationToken, WindowHandle};
use crate::dispatch::{apply_completion, CompletionChannel};
use crate::host::{HostMessage, PlatformCallbacks, PlatformServices, SignInOptions};
use crate::lifecycle::{CallbackBridge, LifecycleEvents, LifecycleState, SuspendCoordinator};
use crate::session::{SessionRegistry, UserSession};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Handler for window messages other than the suspend wake-up
pub type MessageHandler = Box<dyn FnMut(WindowHandle, u32) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Initialized,
    Exited,
}

/// Per-tick counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub completions_applied: usize,
    pub completions_discarded: usize,
    pub messages_pumped: usize,
    pub resumed: bool,
}

/// Notification registrations held between init and exit
#[derive(Debug, Default)]
struct Registrations {
    session_change: Option<RegistrationToken>,
    device_association: Option<RegistrationToken>,
    app_state: Option<RegistrationToken>,
}

/// Builder for [`LifecycleContext`]
pub struct LifecycleContextBuilder {
    host: Arc<dyn PlatformServices>,
    config: LifecycleConfig,
    message_handler: Option<MessageHandler>,
}

impl LifecycleContextBuilder {
    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_resume_mode(mut self, mode: ResumeMode) -> Self {
        self.config.resume_mode = mode;
        self
    }

    /// Receive every pumped window message except the suspend wake-up
    pub fn with_message_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(WindowHandle, u32) + Send + 'static,
    {
        self.message_handler = Some(Box::new(handler));
        self
    }

    pub fn build(self) -> LifecycleContext {
        let channel = CompletionChannel::new();
        let coordinator = Arc::new(SuspendCoordinator::new(self.host.clone()));
        let bridge: Arc<dyn PlatformCallbacks> =
            Arc::new(CallbackBridge::new(channel.sender(), coordinator.clone()));

        LifecycleContext {
            registry: SessionRegistry::new(
                self.config.max_sessions,
                self.config.max_devices_per_session,
            ),
            host: self.host,
            config: self.config,
            channel,
            coordinator,
            bridge,
            events: LifecycleEvents::new(),
            registrations: Registrations::default(),
            message_handler: self.message_handler,
            phase: Phase::Created,
        }
    }
}

/// Lifecycle facade owned by the main thread
pub struct LifecycleContext {
    host: Arc<dyn PlatformServices>,
    config: LifecycleConfig,
    registry: SessionRegistry,
    channel: CompletionChannel,
    coordinator: Arc<SuspendCoordinator>,
    bridge: Arc<dyn PlatformCallbacks>,
    events: LifecycleEvents,
    registrations: Registrations,
    message_handler: Option<MessageHandler>,
    phase: Phase,
}

impl LifecycleContext {
    pub fn builder<H>(host: Arc<H>) -> LifecycleContextBuilder
    where
        H: PlatformServices + 'static,
    {
        LifecycleContextBuilder {
            host,
            config: LifecycleConfig::default(),
            message_handler: None,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    // ========================================================================
    // Init / Exit
    // ========================================================================

    /// Bring up the runtime and session tracking
    ///
    /// Runtime failure is fatal and returned as
    /// [`LifecycleError::RuntimeInit`]. Registration failures only degrade
    /// session tracking and are logged.
    pub fn init(&mut self) -> LifecycleResult<()> {
        match self.phase {
            Phase::Created => {}
            Phase::Initialized => return Err(LifecycleError::InvalidPhase("initialized")),
            Phase::Exited => return Err(LifecycleError::InvalidPhase("exited")),
        }

        self.host
            .initialize_runtime()
            .map_err(LifecycleError::RuntimeInit)?;
        self.phase = Phase::Initialized;

        match self.host.register_session_change(self.bridge.clone()) {
            Ok(token) => self.registrations.session_change = Some(token),
            Err(e) => warn!(error = %e, "Session change notifications unavailable"),
        }
        match self.host.register_device_association_change(self.bridge.clone()) {
            Ok(token) => self.registrations.device_association = Some(token),
            Err(e) => warn!(error = %e, "Device association notifications unavailable"),
        }

        if let Some(options) = self.config.sign_in_on_init {
            if let Err(e) = self.request_sign_in(options) {
                warn!(error = %e, "Default sign-in could not be started");
            }
        }

        info!(
            resume_mode = ?self.config.resume_mode,
            max_sessions = self.config.max_sessions,
            "Lifecycle context initialized"
        );
        Ok(())
    }

    /// Register for suspend/resume once the main window exists
    ///
    /// On failure the application runs without suspend deferral.
    pub fn on_main_window_created(&mut self, window: WindowHandle) -> LifecycleResult<()> {
        if self.phase == Phase::Exited {
            return Err(LifecycleError::InvalidPhase("exited"));
        }
        if let Some(token) = self.registrations.app_state.take() {
            if let Err(e) = self.host.unregister_app_state_change(token) {
                warn!(error = %e, "Previous suspend/resume registration already gone");
            }
        }

        self.coordinator.attach_window(window);
        match self
            .host
            .register_app_state_change(window, self.bridge.clone())
        {
            Ok(token) => {
                self.registrations.app_state = Some(token);
                info!(window = window.0, "Registered for suspend/resume notifications");
            }
            Err(e) => {
                self.coordinator.detach();
                warn!(error = %e, "Suspend/resume notifications unavailable, running without deferral");
            }
        }
        Ok(())
    }

    /// Start an asynchronous sign-in; the session appears on a later tick
    pub fn request_sign_in(&self, options: SignInOptions) -> LifecycleResult<()> {
        if self.phase != Phase::Initialized {
            return Err(LifecycleError::InvalidPhase(match self.phase {
                Phase::Exited => "exited",
                _ => "uninitialized",
            }));
        }
        self.host.add_user_async(options, self.bridge.clone())?;
        debug!(?options, "Sign-in requested");
        Ok(())
    }

    /// Unregister everything and release all sessions. Idempotent.
    pub fn exit(&mut self) {
        if self.phase == Phase::Exited {
            return;
        }
        let was_initialized = self.phase == Phase::Initialized;
        self.phase = Phase::Exited;

        if let Some(token) = self.registrations.device_association.take() {
            if let Err(e) = self.host.unregister_device_association_change(token) {
                warn!(error = %e, "Device association unregistration failed");
            }
        }
        if let Some(token) = self.registrations.session_change.take() {
            if let Err(e) = self.host.unregister_session_change(token) {
                warn!(error = %e, "Session change unregistration failed");
            }
        }
        self.channel.close();

        if let Some(token) = self.registrations.app_state.take() {
            if let Err(e) = self.host.unregister_app_state_change(token) {
                warn!(error = %e, "Suspend/resume unregistration failed");
            }
        }
        self.coordinator.detach();

        self.registry.clear();

        if was_initialized {
            self.host.uninitialize_runtime();
        }
        info!("Lifecycle context exited");
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Run one dispatch pass on the main thread
    ///
    /// Applies every queued completion, then pumps host messages. In
    /// `Park` mode a suspend wake-up blocks here until resume.
    pub fn tick(&mut self) -> TickStats {
        let mut stats = TickStats::default();
        if self.phase == Phase::Exited {
            return stats;
        }

        if self.config.resume_mode == ResumeMode::Poll {
            stats.resumed = self.coordinator.poll_resume(&self.events);
        }

        // Completions first, so handlers see an up-to-date registry
        let registry = &mut self.registry;
        let drained = self
            .channel
            .drain(|completion| apply_completion(registry, completion));
        stats.completions_applied = drained.applied;
        stats.completions_discarded = drained.discarded;

        let coordinator = &self.coordinator;
        let events = &self.events;
        let mode = self.config.resume_mode;
        let handler = &mut self.message_handler;
        stats.messages_pumped = self.host.pump_messages(&mut |window, message| match message {
            HostMessage::QuiesceWake => coordinator.handle_wake(events, mode),
            HostMessage::Native(id) => match handler.as_mut() {
                Some(handler) => handler(window, id),
                None => debug!(window = window.0, id, "Unhandled window message"),
            },
        });

        stats
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn events(&self) -> &LifecycleEvents {
        &self.events
    }

    pub fn state(&self) -> LifecycleState {
        self.coordinator.state()
    }

    /// False while suspended
    pub fn has_focus(&self) -> bool {
        self.coordinator.has_focus()
    }

    /// True iff at least one session is signed in
    pub fn can_open_url(&self) -> bool {
        !self.registry.is_empty()
    }

    /// The primary session (index 0)
    pub fn default_session(&self) -> Option<&UserSession> {
        self.registry.default_session()
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn handshakes_completed(&self) -> u64 {
        self.coordinator.handshakes_completed()
    }

    /// Open `uri` on behalf of the default session
    pub fn open_url(&self, uri: &str) -> LifecycleResult<()> {
        let session = self.default_session().ok_or(SessionError::NoSession)?;
        let handle = session.handle().ok_or(SessionError::NoSession)?;
        self.host.launch_uri(handle, uri).map_err(|e| {
            error!(uri, error = %e, "Failed to launch URI");
            LifecycleError::from(e)
        })
    }
}

impl Drop for LifecycleContext {
    fn drop(&mut self) {
        self.exit();
    }
}
