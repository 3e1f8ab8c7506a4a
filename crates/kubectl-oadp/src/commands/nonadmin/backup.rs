//! `kubectl oadp nonadmin backup`.

use clap::{Args, Subcommand};
use kube::Api;
use oadp_client::{
    builder::{
        self, MetadataFlags,
        backup::BackupOptions,
        nonadmin::{delete_backup_patch, non_admin_backup},
    },
    client::{self, ResourceStore},
    crd::{nonadmin::NonAdminBackup, velero::BackupPhase},
    describe::{describe_non_admin_backup, format_optional, table::Table},
    download::{self, DownloadTargetKind, fetch},
    wait,
};
use snafu::{ResultExt, Snafu};
use tracing::info;

use super::{created_cell, request_phase_cell, velero_phase_cell};
use crate::{
    commands::{DownloadFlags, Session, WaitFlags, lookup, now, wait_until_finished},
    output::{self, OutputFlags, print_objects, print_serialized},
    prompt,
};

const KIND: &str = "non-admin backup";

/// Artifacts shown by `describe`, in this order.
const DESCRIBE_SECTIONS: [DownloadTargetKind; 4] = [
    DownloadTargetKind::BackupResults,
    DownloadTargetKind::BackupResourceList,
    DownloadTargetKind::BackupVolumeInfos,
    DownloadTargetKind::BackupItemOperations,
];

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid backup flags"))]
    BuildBackup { source: builder::Error },

    #[snafu(display("failed to read non-admin backups"))]
    ReadBackups { source: lookup::Error },

    #[snafu(display("failed to create non-admin backup {name:?}"))]
    CreateBackup { source: client::Error, name: String },

    #[snafu(display("failed to wait for non-admin backup {name:?}"))]
    WaitForBackup { source: wait::Error, name: String },

    #[snafu(display("failed to set up artifact downloads"))]
    CreateDownloader { source: fetch::Error },

    #[snafu(display("failed to get the logs of non-admin backup {name:?}"))]
    FetchLogs { source: download::Error, name: String },

    #[snafu(display("failed to request the deletion of non-admin backup {name:?}"))]
    RequestDeletion { source: client::Error, name: String },

    #[snafu(display("failed to read the confirmation"))]
    Confirm { source: std::io::Error },

    #[snafu(display("failed to print non-admin backups"))]
    Print { source: output::Error },
}

#[derive(Debug, Subcommand)]
pub enum NonAdminBackupCommand {
    /// Request a backup of the namespace.
    Create(CreateArgs),

    /// List non-admin backups.
    Get(GetArgs),

    /// Show details of non-admin backups, including what was backed up.
    Describe(DescribeArgs),

    /// Print the log of a non-admin backup.
    Logs(LogsArgs),

    /// Delete non-admin backups together with their data.
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Name of the backup.
    pub name: String,

    #[command(flatten)]
    pub options: BackupOptions,

    #[command(flatten)]
    pub metadata: MetadataFlags,

    #[command(flatten)]
    pub wait: WaitFlags,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Backups to show, all backups of the namespace if empty.
    pub names: Vec<String>,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Backups to describe.
    #[arg(required = true)]
    pub names: Vec<String>,

    #[command(flatten)]
    pub download: DownloadFlags,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Backup to print the log of.
    pub name: String,

    #[command(flatten)]
    pub download: DownloadFlags,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Backups to delete.
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Don't ask for confirmation.
    #[arg(long)]
    pub confirm: bool,
}

pub async fn run(command: NonAdminBackupCommand, session: &Session) -> Result<()> {
    match command {
        NonAdminBackupCommand::Create(args) => create(args, session).await,
        NonAdminBackupCommand::Get(args) => get(args, session).await,
        NonAdminBackupCommand::Describe(args) => describe(args, session).await,
        NonAdminBackupCommand::Logs(args) => logs(args, session).await,
        NonAdminBackupCommand::Delete(args) => delete(args, session).await,
    }
}

fn is_finished(backup: &NonAdminBackup) -> bool {
    backup
        .velero_status()
        .and_then(|status| status.phase)
        .is_some_and(BackupPhase::is_terminal)
}

async fn create(args: CreateArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.namespace;
    let spec = args.options.build().context(BuildBackupSnafu)?;
    let backup = non_admin_backup(&args.name, namespace, &args.metadata, spec);

    let api: Api<NonAdminBackup> = session.user_api();
    ResourceStore::create(&api, &backup)
        .await
        .context(CreateBackupSnafu { name: &args.name })?;
    info!(name = %args.name, %namespace, "created non-admin backup");
    println!(
        "Non-admin backup {:?} submitted successfully. It is processed once an administrator's controller picks it up.",
        args.name
    );

    if !args.wait.wait {
        println!(
            "Run `kubectl oadp nonadmin backup describe {name}` or `kubectl oadp nonadmin backup logs {name}` for more details.",
            name = args.name
        );
        return Ok(());
    }

    let finished = wait_until_finished(api, KIND, &args.name, is_finished)
        .await
        .context(WaitForBackupSnafu { name: &args.name })?;
    if let Some(backup) = finished {
        println!(
            "Backup completed with status: {}.",
            format_optional(backup.velero_status().and_then(|status| status.phase))
        );
    }
    Ok(())
}

async fn get(args: GetArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.namespace;
    let api: Api<NonAdminBackup> = session.user_api();
    let backups = lookup::get_or_list(&api, KIND, &args.names, None, namespace)
        .await
        .context(ReadBackupsSnafu)?;

    print_objects(args.output.output, &backups, namespace, backup_table).context(PrintSnafu)
}

fn backup_table(backups: &[NonAdminBackup]) -> Table {
    let mut table = Table::new(["NAME", "REQUEST PHASE", "VELERO PHASE", "CREATED"]);
    for backup in backups {
        table.row([
            backup.metadata.name.clone().unwrap_or_default(),
            request_phase_cell(backup.status.as_ref().and_then(|status| status.phase)),
            velero_phase_cell(backup.velero_status().and_then(|status| status.phase)),
            created_cell(&backup.metadata),
        ]);
    }
    table
}

async fn describe(args: DescribeArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.namespace;
    let api: Api<NonAdminBackup> = session.user_api();
    let backups = lookup::get_or_list(&api, KIND, &args.names, None, namespace)
        .await
        .context(ReadBackupsSnafu)?;

    if print_serialized(args.output.output, &backups).context(PrintSnafu)? {
        return Ok(());
    }

    let downloader = session
        .non_admin_downloader(args.download)
        .context(CreateDownloaderSnafu)?;
    for (index, backup) in backups.iter().enumerate() {
        let name = backup.metadata.name.as_deref().unwrap_or_default();
        let sections = downloader.describe_sections(name, &DESCRIBE_SECTIONS).await;

        if index > 0 {
            println!();
        }
        print!("{}", describe_non_admin_backup(backup, &sections, now()));
    }
    Ok(())
}

async fn logs(args: LogsArgs, session: &Session) -> Result<()> {
    let downloader = session
        .non_admin_downloader(args.download)
        .context(CreateDownloaderSnafu)?;
    let log = downloader
        .fetch_artifact(DownloadTargetKind::BackupLog, &args.name)
        .await
        .context(FetchLogsSnafu { name: &args.name })?;
    print!("{log}");
    Ok(())
}

async fn delete(args: DeleteArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.namespace;
    let api: Api<NonAdminBackup> = session.user_api();

    for name in &args.names {
        lookup::get_existing::<NonAdminBackup, _>(&api, KIND, name, namespace)
            .await
            .context(ReadBackupsSnafu)?;

        if !args.confirm
            && !prompt::confirm(&format!(
                "Are you sure you want to delete non-admin backup {name:?} and its data?"
            ))
            .context(ConfirmSnafu)?
        {
            println!("Skipping non-admin backup {name:?}.");
            continue;
        }

        ResourceStore::merge_patch(&api, name, &delete_backup_patch())
            .await
            .context(RequestDeletionSnafu { name })?;
        info!(%name, %namespace, "requested non-admin backup deletion");
        println!("Deletion of non-admin backup {name:?} requested.");
    }
    Ok(())
}
