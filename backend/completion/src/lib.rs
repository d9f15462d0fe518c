pub mod bridge;
pub mod providers;

pub use bridge::{CompletionBridge, COMPLETION_LIMITS};
