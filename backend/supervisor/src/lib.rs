//! Runtime supervisor.
//!
//! Owns the live transport and its command pipeline, and rebuilds them when
//! the configuration file changes.

pub mod coordinator;
pub mod error;
pub mod factory;
pub mod runtime;

pub use coordinator::{RestartCoordinator, RestartOutcome, RestartStats, DEFAULT_DEBOUNCE};
pub use error::RestartError;
pub use factory::{DiscordServices, ServiceFactory};
pub use runtime::RuntimeState;
