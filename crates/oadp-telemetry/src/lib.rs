//! Logging setup of the `kubectl-oadp` plugin.
//!
//! See [`Tracing`] for the subscribers and [`tracing::TelemetryOptions`] for
//! the command line arguments that configure them.

pub mod tracing;

pub use tracing::Tracing;
