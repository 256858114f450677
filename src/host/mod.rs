/*!
 * Host Module
 * Contracts with the operating environment and an in-process simulation
 */

pub mod simulated;
mod traits;
mod types;

// Re-export public API
pub use simulated::{SimulatedHost, SimulatedHostOptions, SimulatedUser};
pub use traits::{PlatformCallbacks, PlatformServices};
pub use types::{DeviceAssociationChange, HostMessage, SignInOptions, SignInOutcome};
