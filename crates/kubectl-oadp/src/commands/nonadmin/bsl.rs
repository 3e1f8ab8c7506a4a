//! `kubectl oadp nonadmin bsl`, backup storage locations of one namespace.
//!
//! Depending on the installation, an administrator has to approve a new
//! location through `kubectl oadp nabsl-request approve` before it is used.

use clap::{Args, Subcommand};
use kube::Api;
use oadp_client::{
    builder::{bsl::BslOptions, nonadmin::non_admin_backup_storage_location},
    client::{self, ResourceStore},
    crd::nonadmin::NonAdminBackupStorageLocation,
    describe::{describe_non_admin_backup_storage_location, table::Table},
};
use snafu::{ResultExt, Snafu};
use tracing::info;

use super::{request_phase_cell, velero_phase_cell};
use crate::{
    commands::{Session, lookup, now},
    output::{self, OutputFlags, print_objects, print_serialized},
};

const KIND: &str = "non-admin backup storage location";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read non-admin backup storage locations"))]
    ReadLocations { source: lookup::Error },

    #[snafu(display("failed to create non-admin backup storage location {name:?}"))]
    CreateLocation { source: client::Error, name: String },

    #[snafu(display("failed to print non-admin backup storage locations"))]
    Print { source: output::Error },
}

#[derive(Debug, Subcommand)]
pub enum NonAdminBslCommand {
    /// Request a backup storage location for the namespace.
    Create(CreateArgs),

    /// List non-admin backup storage locations.
    Get(GetArgs),

    /// Show details of non-admin backup storage locations.
    Describe(DescribeArgs),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Name of the backup storage location.
    pub name: String,

    #[command(flatten)]
    pub options: BslOptions,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Locations to show, all locations of the namespace if empty.
    pub names: Vec<String>,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Locations to describe.
    #[arg(required = true)]
    pub names: Vec<String>,

    #[command(flatten)]
    pub output: OutputFlags,
}

pub async fn run(command: NonAdminBslCommand, session: &Session) -> Result<()> {
    match command {
        NonAdminBslCommand::Create(args) => create(args, session).await,
        NonAdminBslCommand::Get(args) => get(args, session).await,
        NonAdminBslCommand::Describe(args) => describe(args, session).await,
    }
}

async fn create(args: CreateArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.namespace;
    let location = non_admin_backup_storage_location(&args.name, namespace, args.options.build());

    let api: Api<NonAdminBackupStorageLocation> = session.user_api();
    ResourceStore::create(&api, &location)
        .await
        .context(CreateLocationSnafu { name: &args.name })?;
    info!(name = %args.name, %namespace, "created non-admin backup storage location");
    println!(
        "Non-admin backup storage location {:?} submitted successfully. It may have to be approved by an administrator before it can be used.",
        args.name
    );
    Ok(())
}

async fn get(args: GetArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.namespace;
    let api: Api<NonAdminBackupStorageLocation> = session.user_api();
    let locations = lookup::get_or_list(&api, KIND, &args.names, None, namespace)
        .await
        .context(ReadLocationsSnafu)?;

    print_objects(args.output.output, &locations, namespace, location_table).context(PrintSnafu)
}

fn location_table(locations: &[NonAdminBackupStorageLocation]) -> Table {
    let mut table = Table::new([
        "NAME",
        "REQUEST PHASE",
        "PROVIDER",
        "BUCKET",
        "PREFIX",
        "VELERO PHASE",
    ]);
    for location in locations {
        let spec = &location.spec.backup_storage_location_spec;
        table.row([
            location.metadata.name.clone().unwrap_or_default(),
            request_phase_cell(location.status.as_ref().and_then(|status| status.phase)),
            spec.provider.clone(),
            spec.object_storage.bucket.clone(),
            spec.object_storage.prefix.clone().unwrap_or_default(),
            velero_phase_cell(
                location
                    .velero_status()
                    .and_then(|status| status.phase.as_deref()),
            ),
        ]);
    }
    table
}

async fn describe(args: DescribeArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.namespace;
    let api: Api<NonAdminBackupStorageLocation> = session.user_api();
    let locations = lookup::get_or_list(&api, KIND, &args.names, None, namespace)
        .await
        .context(ReadLocationsSnafu)?;

    if print_serialized(args.output.output, &locations).context(PrintSnafu)? {
        return Ok(());
    }

    for (index, location) in locations.iter().enumerate() {
        if index > 0 {
            println!();
        }
        print!(
            "{}",
            describe_non_admin_backup_storage_location(location, now())
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use oadp_client::crd::{
        nonadmin::{
            NonAdminBackupStorageLocationSpec, NonAdminBackupStorageLocationStatus, NonAdminPhase,
        },
        velero::{BackupStorageLocationSpec, ObjectStorageLocation},
    };

    use super::*;

    #[test]
    fn table_shows_the_requested_bucket() {
        let mut location = NonAdminBackupStorageLocation::new(
            "team-a",
            NonAdminBackupStorageLocationSpec {
                backup_storage_location_spec: BackupStorageLocationSpec {
                    provider: "aws".to_owned(),
                    object_storage: ObjectStorageLocation {
                        bucket: "team-a-backups".to_owned(),
                        prefix: Some("velero".to_owned()),
                        ..ObjectStorageLocation::default()
                    },
                    ..BackupStorageLocationSpec::default()
                },
            },
        );
        location.status = Some(NonAdminBackupStorageLocationStatus {
            phase: Some(NonAdminPhase::New),
            ..NonAdminBackupStorageLocationStatus::default()
        });

        let rendered = location_table(&[location]).render();
        let row: Vec<&str> = rendered.lines().nth(1).unwrap().split_whitespace().collect();

        assert_eq!(row, ["team-a", "New", "aws", "team-a-backups", "velero"]);
    }
}
