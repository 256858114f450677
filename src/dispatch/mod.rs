/*!
 * Dispatch Module
 * Async completion channel and the main-thread application of completions
 */

mod apply;
mod channel;
mod completion;

// Re-export public API
pub use apply::apply_completion;
pub use channel::{CompletionChannel, CompletionSender, DrainStats};
pub use completion::{PendingCompletion, SessionChangeEvent};
