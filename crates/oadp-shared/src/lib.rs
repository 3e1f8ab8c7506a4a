//! Helpers shared by the `kubectl-oadp` crates: Go style durations and YAML
//! document output.

pub mod time;
pub mod yaml;
