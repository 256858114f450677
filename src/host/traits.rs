/*!
 * Host Traits
 *
 * `PlatformServices` is what this crate consumes from the operating
 * environment. `PlatformCallbacks` is what it hands back: the host adapter
 * translates native callback signatures into these calls, on whatever thread
 * the host chooses.
 */

use super::types::{DeviceAssociationChange, HostMessage, SignInOptions, SignInOutcome};
use crate::core::errors::HostResult;
use crate::core::types::{LocalId, RegistrationToken, WindowHandle};
use crate::session::SessionHandle;
use std::sync::Arc;

/// Notifications delivered by the host
///
/// Implementations must only enqueue work or signal events; they run on host
/// threads and never touch main-thread state.
pub trait PlatformCallbacks: Send + Sync {
    /// Quiescence notification: `true` before suspension, `false` on resume
    ///
    /// With `true` the call blocks until the main thread has quiesced.
    fn quiescence_changed(&self, quiescing: bool);

    /// An account changed state; `raw_event` is the host event code
    fn session_changed(&self, local_id: LocalId, raw_event: u32);

    fn device_association_changed(&self, change: DeviceAssociationChange);

    /// An asynchronous sign-in finished
    fn sign_in_completed(&self, outcome: SignInOutcome);
}

/// Services provided by the host platform
pub trait PlatformServices: Send + Sync {
    /// Bring up the game runtime. Failure is fatal to the process.
    fn initialize_runtime(&self) -> HostResult<()>;

    fn uninitialize_runtime(&self);

    /// Register for quiescence notifications targeting `window`
    fn register_app_state_change(
        &self,
        window: WindowHandle,
        callbacks: Arc<dyn PlatformCallbacks>,
    ) -> HostResult<RegistrationToken>;

    /// Fails with [`HostError::UnknownRegistration`] if `token` is not active
    ///
    /// [`HostError::UnknownRegistration`]: crate::core::errors::HostError::UnknownRegistration
    fn unregister_app_state_change(&self, token: RegistrationToken) -> HostResult<()>;

    fn register_session_change(
        &self,
        callbacks: Arc<dyn PlatformCallbacks>,
    ) -> HostResult<RegistrationToken>;

    fn unregister_session_change(&self, token: RegistrationToken) -> HostResult<()>;

    fn register_device_association_change(
        &self,
        callbacks: Arc<dyn PlatformCallbacks>,
    ) -> HostResult<RegistrationToken>;

    fn unregister_device_association_change(&self, token: RegistrationToken) -> HostResult<()>;

    /// Start an asynchronous sign-in; the result arrives via
    /// [`PlatformCallbacks::sign_in_completed`]
    fn add_user_async(
        &self,
        options: SignInOptions,
        callbacks: Arc<dyn PlatformCallbacks>,
    ) -> HostResult<()>;

    /// Post a message to the main thread's queue. Never blocks.
    fn post_message(&self, window: WindowHandle, message: HostMessage) -> HostResult<()>;

    /// Deliver every queued message to `dispatch` on the calling thread
    ///
    /// Returns the number of messages delivered.
    fn pump_messages(&self, dispatch: &mut dyn FnMut(WindowHandle, HostMessage)) -> usize;

    /// Open a URI on behalf of a signed-in account
    fn launch_uri(&self, user: &dyn SessionHandle, uri: &str) -> HostResult<()>;
}
