/*!
 * Session Module
 * Signed-in user sessions and their device associations
 */

mod registry;
mod types;

// Re-export public API
pub use registry::{AddOutcome, SessionRegistry};
pub use types::{SessionHandle, SessionToken, UserSession};
