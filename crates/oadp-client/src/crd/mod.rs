//! Typed custom resources the plugin talks to.

pub mod nonadmin;
pub mod velero;
