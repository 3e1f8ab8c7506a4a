//! `kubectl oadp nonadmin`, requests of namespace-restricted users.
//!
//! Everything here acts in the namespace of the current kubeconfig context.
//! The non-admin controller turns the objects into Velero objects in the
//! admin namespace and reports their status back.

use clap::Subcommand;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use oadp_client::{crd::nonadmin::NonAdminPhase, describe::format_optional};
use snafu::Snafu;

use self::{backup::NonAdminBackupCommand, bsl::NonAdminBslCommand, restore::NonAdminRestoreCommand};
use super::Session;

pub mod backup;
pub mod bsl;
pub mod restore;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(transparent)]
    Backup { source: backup::Error },

    #[snafu(transparent)]
    Restore { source: restore::Error },

    #[snafu(transparent)]
    Bsl { source: bsl::Error },
}

#[derive(Debug, Subcommand)]
pub enum NonAdminCommand {
    /// Back up the namespace of the current context.
    #[command(subcommand, alias = "b")]
    Backup(NonAdminBackupCommand),

    /// Restore non-admin backups into the namespace of the current context.
    #[command(subcommand, alias = "r")]
    Restore(NonAdminRestoreCommand),

    /// Backup storage locations owned by the namespace of the current context.
    #[command(subcommand)]
    Bsl(NonAdminBslCommand),
}

pub async fn run(command: NonAdminCommand, session: &Session) -> Result<(), Error> {
    match command {
        NonAdminCommand::Backup(command) => backup::run(command, session).await?,
        NonAdminCommand::Restore(command) => restore::run(command, session).await?,
        NonAdminCommand::Bsl(command) => bsl::run(command, session).await?,
    }
    Ok(())
}

/// The request phase shows `New` until the controller has seen the object.
fn request_phase_cell(phase: Option<NonAdminPhase>) -> String {
    phase.unwrap_or(NonAdminPhase::New).to_string()
}

/// The Velero phase stays empty until the Velero object exists.
fn velero_phase_cell(phase: Option<impl ToString>) -> String {
    phase.map(|phase| phase.to_string()).unwrap_or_default()
}

fn created_cell(metadata: &ObjectMeta) -> String {
    format_optional(
        metadata
            .creation_timestamp
            .as_ref()
            .map(|created| created.0),
    )
}
