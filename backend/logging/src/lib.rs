//! Structured logging for chatbridge.
//!
//! Console output plus a daily-rotated NDJSON file, with the threshold picked
//! from the process's verbosity argument.

pub mod logger;
pub mod verbosity;

pub use logger::init_logger;
pub use verbosity::LogVerbosity;
