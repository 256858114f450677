/*!
 * Platform Lifecycle Library
 *
 * Coordinates an operating environment that suspends, resumes and changes
 * signed-in users asynchronously with a frame-paced application:
 * - Suspend/resume handshake that defers the host until the main thread
 *   has quiesced
 * - FIFO completion channel serializing host callbacks onto the main thread
 * - Session registry tracking signed-in users and their devices
 */

pub mod config;
pub mod core;
pub mod dispatch;
pub mod host;
pub mod lifecycle;
pub mod monitoring;
pub mod platform;
pub mod session;

// Re-exports
pub use config::{LifecycleConfig, ResumeMode};
pub use crate::core::errors::{
    CompletionError, HostError, HostResult, LifecycleError, LifecycleResult, SessionError,
};
pub use crate::core::types::{DeviceId, LocalId, RegistrationToken, WindowHandle};
pub use dispatch::{CompletionChannel, CompletionSender, DrainStats, PendingCompletion, SessionChangeEvent};
pub use host::{
    DeviceAssociationChange, HostMessage, PlatformCallbacks, PlatformServices, SignInOptions,
    SignInOutcome, SimulatedHost, SimulatedHostOptions, SimulatedUser,
};
pub use lifecycle::{LifecycleEvent, LifecycleEvents, LifecycleState, SubscriptionId};
pub use monitoring::init_tracing;
pub use platform::{LifecycleContext, LifecycleContextBuilder, TickStats};
pub use session::{AddOutcome, SessionHandle, SessionRegistry, SessionToken, UserSession};
