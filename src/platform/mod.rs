/*!
 * Platform Module
 * Lifecycle facade: init, tick, exit and the public query surface
 */

mod context;

pub use context::{LifecycleContext, LifecycleContextBuilder, MessageHandler, TickStats};
