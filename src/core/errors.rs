/*!
 * Error Types
 * Centralized error handling with thiserror and miette diagnostics
 */

use super::types::{DeviceId, LocalId};
use miette::Diagnostic;
use thiserror::Error;

/// Result of a call into the host platform
pub type HostResult<T> = Result<T, HostError>;

/// Result of a lifecycle facade operation
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Failures reported by the host platform services
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum HostError {
    #[error("Host call {call} failed with code {code:#010x}")]
    #[diagnostic(
        code(host::call_failed),
        help("The platform service rejected the request. Check the host logs for the failing call.")
    )]
    CallFailed { call: &'static str, code: u32 },

    #[error("Host resource unavailable: {0}")]
    #[diagnostic(
        code(host::resource_unavailable),
        help("The platform could not allocate the requested resource.")
    )]
    ResourceUnavailable(String),

    #[error("Host registration {0:?} is not active")]
    #[diagnostic(code(host::unknown_registration))]
    UnknownRegistration(u64),
}

/// Session registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SessionError {
    #[error("Session registry full ({capacity} sessions), dropping session {local_id}")]
    #[diagnostic(
        code(session::capacity_exceeded),
        help("Raise max_sessions in the lifecycle configuration or sign a user out first.")
    )]
    CapacityExceeded { local_id: LocalId, capacity: usize },

    #[error("Device set of session {local_id} full ({capacity} devices), dropping {device}")]
    #[diagnostic(
        code(session::device_capacity_exceeded),
        help("Raise max_devices_per_session in the lifecycle configuration.")
    )]
    DeviceCapacityExceeded {
        local_id: LocalId,
        device: DeviceId,
        capacity: usize,
    },

    #[error("No signed-in session")]
    #[diagnostic(
        code(session::no_session),
        help("Sign a user in before calling operations that need a session.")
    )]
    NoSession,
}

/// Failures while decoding a completion on the main thread
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum CompletionError {
    #[error("Sign-in completed with a host error: {0}")]
    #[diagnostic(code(completion::sign_in_failed))]
    SignInFailed(#[source] HostError),

    #[error("Could not read the local id of a signed-in handle: {0}")]
    #[diagnostic(code(completion::local_id_unavailable))]
    LocalIdUnavailable(#[source] HostError),

    #[error("Unknown session change event code {0}")]
    #[diagnostic(
        code(completion::unknown_session_event),
        help("The host reported an event this layer does not understand; it is skipped.")
    )]
    UnknownSessionEvent(u32),
}

/// Unified lifecycle error type
#[derive(Error, Debug, Diagnostic)]
pub enum LifecycleError {
    #[error("Game runtime initialization failed: {0}")]
    #[diagnostic(
        code(lifecycle::runtime_init),
        help("No platform operation is possible without the game runtime. The process must exit.")
    )]
    RuntimeInit(#[source] HostError),

    #[error("Host error: {0}")]
    #[diagnostic(transparent)]
    Host(#[from] HostError),

    #[error("Session error: {0}")]
    #[diagnostic(transparent)]
    Session(#[from] SessionError),

    #[error("Completion error: {0}")]
    #[diagnostic(transparent)]
    Completion(#[from] CompletionError),

    #[error("Completion channel closed")]
    #[diagnostic(
        code(lifecycle::channel_closed),
        help("The lifecycle context has exited; late notifications are ignored.")
    )]
    ChannelClosed,

    #[error("Lifecycle context is {0}")]
    #[diagnostic(code(lifecycle::invalid_phase))]
    InvalidPhase(&'static str),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(lifecycle::config),
        help("Check LIFECYCLE_* environment variables or the configuration file.")
    )]
    Config(String),
}

impl LifecycleError {
    /// Whether the error leaves the process unable to continue
    pub fn is_fatal(&self) -> bool {
        matches!(self, LifecycleError::RuntimeInit(_))
    }
}
