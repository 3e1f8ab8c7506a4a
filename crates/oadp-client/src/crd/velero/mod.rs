//! Custom resources of the Velero server (`velero.io`).
//!
//! Only the fields the plugin reads or writes are modelled. Everything else is
//! left to the server defaults.

mod backup;
mod backup_storage_location;
mod data_movement;
mod delete_backup_request;
mod download_request;
mod pod_volume;
mod restore;
mod schedule;
mod server_status_request;

pub use backup::*;
pub use backup_storage_location::*;
pub use data_movement::*;
pub use delete_backup_request::*;
pub use download_request::*;
pub use pod_volume::*;
pub use restore::*;
pub use schedule::*;
pub use server_status_request::*;
