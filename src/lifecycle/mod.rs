/*!
 * Lifecycle Module
 * Suspend/resume handshake, application events, and the host callback bridge
 */

mod bridge;
mod coordinator;
mod events;
mod state;

// Re-export public API
pub use bridge::CallbackBridge;
pub use coordinator::SuspendCoordinator;
pub use events::{EventHandler, LifecycleEvent, LifecycleEvents, SubscriptionId};
pub use state::LifecycleState;
