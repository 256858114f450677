/*!
 * Synchronization Primitives
 *
 * Binary set/reset events for cross-thread handshakes. Everything else in
 * this crate hands data between threads through channels.
 */

mod event;

pub use event::{Event, ResetMode};
