//! `kubectl oadp backup`, Velero backups in the admin namespace.

use clap::{Args, Subcommand};
use k8s_openapi::jiff::Timestamp;
use kube::Api;
use oadp_client::{
    builder::{
        self, MetadataFlags, NamespaceFilterFlags, display_selector,
        backup::{BackupOptions, backup, backup_from_schedule, delete_backup_request},
    },
    client::{self, ResourceStore},
    correlation::BACKUP_RULES,
    crd::velero::{
        Backup, BackupPhase, DataUpload, DeleteBackupRequest, PodVolumeBackup, Schedule,
    },
    describe::{BackupDetails, describe_backup, format_expires, format_optional, table::Table},
    download::{self, DownloadTargetKind, fetch},
    wait,
};
use snafu::{ResultExt, Snafu};
use tracing::info;

use super::{
    DownloadFlags, Session, WaitFlags, lookup, now, related_records, wait_until_finished,
};
use crate::{
    output::{self, OutputFlags, print_objects, print_serialized},
    prompt,
};

const KIND: &str = "backup";

/// Artifacts added to `describe --details`.
const DETAIL_SECTIONS: [DownloadTargetKind; 3] = [
    DownloadTargetKind::BackupResourceList,
    DownloadTargetKind::BackupVolumeInfos,
    DownloadTargetKind::BackupItemOperations,
];

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid backup flags"))]
    BuildBackup { source: builder::Error },

    #[snafu(display("failed to read the schedule"))]
    ReadSchedule { source: lookup::Error },

    #[snafu(display("failed to read backups"))]
    ReadBackups { source: lookup::Error },

    #[snafu(display("failed to create backup {name:?}"))]
    CreateBackup { source: client::Error, name: String },

    #[snafu(display("failed to wait for backup {name:?}"))]
    WaitForBackup { source: wait::Error, name: String },

    #[snafu(display("failed to list the volume records of backup {name:?}"))]
    ListVolumeRecords { source: client::Error, name: String },

    #[snafu(display("failed to set up artifact downloads"))]
    CreateDownloader { source: fetch::Error },

    #[snafu(display("failed to get the logs of backup {name:?}"))]
    FetchLogs { source: download::Error, name: String },

    #[snafu(display("failed to request the deletion of backup {name:?}"))]
    RequestDeletion { source: client::Error, name: String },

    #[snafu(display("failed to read the confirmation"))]
    Confirm { source: std::io::Error },

    #[snafu(display("failed to print backups"))]
    Print { source: output::Error },
}

#[derive(Debug, Subcommand)]
pub enum BackupCommand {
    /// Create a backup.
    Create(CreateArgs),

    /// List backups.
    Get(GetArgs),

    /// Show details of backups.
    Describe(DescribeArgs),

    /// Print the log of a backup.
    Logs(LogsArgs),

    /// Delete backups together with their data in object storage.
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Name of the backup.
    pub name: String,

    #[command(flatten)]
    pub namespaces: NamespaceFilterFlags,

    #[command(flatten)]
    pub options: BackupOptions,

    #[command(flatten)]
    pub metadata: MetadataFlags,

    /// Start from the backup template of this schedule. Other flags override
    /// the template.
    #[arg(long, value_name = "SCHEDULE")]
    pub from_schedule: Option<String>,

    #[command(flatten)]
    pub wait: WaitFlags,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Backups to show, all backups if empty.
    pub names: Vec<String>,

    /// Only show backups matching this label selector.
    #[arg(short = 'l', long, value_name = "SELECTOR", conflicts_with = "names")]
    pub selector: Option<String>,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Backups to describe.
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Also show the backed up resources, volumes and item operations.
    #[arg(long)]
    pub details: bool,

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

pub async fn run(command: BackupCommand, session: &Session) -> Result<()> {
    match command {
        BackupCommand::Create(args) => create(args, session).await,
        BackupCommand::Get(args) => get(args, session).await,
        BackupCommand::Describe(args) => describe(args, session).await,
        BackupCommand::Logs(args) => logs(args, session).await,
        BackupCommand::Delete(args) => delete(args, session).await,
    }
}

async fn create(args: CreateArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.admin_namespace;

    let mut backup = match &args.from_schedule {
        Some(schedule) => {
            let schedules: Api<Schedule> = session.admin_api();
            let schedule = lookup::get_existing(&schedules, "schedule", schedule, namespace)
                .await
                .context(ReadScheduleSnafu)?;
            backup_from_schedule(&args.name, namespace, &args.metadata, &schedule)
        }
        None => backup(&args.name, namespace, &args.metadata, Default::default()),
    };
    args.options
        .apply(&mut backup.spec)
        .context(BuildBackupSnafu)?;
    args.namespaces.apply_to_backup(&mut backup.spec);

    let api: Api<Backup> = session.admin_api();
    ResourceStore::create(&api, &backup)
        .await
        .context(CreateBackupSnafu { name: &args.name })?;
    info!(name = %args.name, %namespace, "created backup");
    println!("Backup request {:?} submitted successfully.", args.name);

    if !args.wait.wait {
        println!(
            "Run `kubectl oadp backup describe {name}` or `kubectl oadp backup logs {name}` for more details.",
            name = args.name
        );
        return Ok(());
    }

    let finished = wait_until_finished(api, KIND, &args.name, |backup: &Backup| {
        backup.phase().is_some_and(BackupPhase::is_terminal)
    })
    .await
    .context(WaitForBackupSnafu { name: &args.name })?;
    if let Some(backup) = finished {
        println!(
            "Backup completed with status: {}. You may check for more information using the commands `kubectl oadp backup describe {name}` and `kubectl oadp backup logs {name}`.",
            format_optional(backup.phase()),
            name = args.name
        );
    }
    Ok(())
}

async fn get(args: GetArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.admin_namespace;
    let api: Api<Backup> = session.admin_api();
    let backups = lookup::get_or_list(
        &api,
        KIND,
        &args.names,
        args.selector.as_deref(),
        namespace,
    )
    .await
    .context(ReadBackupsSnafu)?;

    let now = now();
    print_objects(args.output.output, &backups, namespace, |backups| {
        backup_table(backups, now)
    })
    .context(PrintSnafu)
}

fn backup_table(backups: &[Backup], now: Timestamp) -> Table {
    let mut table = Table::new([
        "NAME",
        "STATUS",
        "ERRORS",
        "WARNINGS",
        "CREATED",
        "EXPIRES",
        "STORAGE LOCATION",
        "SELECTOR",
    ]);
    for backup in backups {
        let status = backup.status.as_ref();
        table.row([
            backup.metadata.name.clone().unwrap_or_default(),
            backup
                .phase()
                .map_or_else(|| BackupPhase::New.to_string(), |phase| phase.to_string()),
            status.and_then(|status| status.errors).unwrap_or_default().to_string(),
            status.and_then(|status| status.warnings).unwrap_or_default().to_string(),
            format_optional(
                backup
                    .metadata
                    .creation_timestamp
                    .as_ref()
                    .map(|created| created.0),
            ),
            format_expires(status.and_then(|status| status.expiration.as_ref()), now),
            backup.spec.storage_location.clone().unwrap_or_default(),
            display_selector(backup.spec.label_selector.as_ref()),
        ]);
    }
    table
}

async fn describe(args: DescribeArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.admin_namespace;
    let api: Api<Backup> = session.admin_api();
    let backups = lookup::get_or_list(&api, KIND, &args.names, None, namespace)
        .await
        .context(ReadBackupsSnafu)?;

    if print_serialized(args.output.output, &backups).context(PrintSnafu)? {
        return Ok(());
    }

    let downloader = if args.details {
        Some(
            session
                .velero_downloader(args.download)
                .context(CreateDownloaderSnafu)?,
        )
    } else {
        None
    };

    for (index, backup) in backups.iter().enumerate() {
        let name = backup.metadata.name.as_deref().unwrap_or_default();
        let details = match &downloader {
            Some(downloader) => Some(BackupDetails {
                sections: downloader.describe_sections(name, &DETAIL_SECTIONS).await,
                data_uploads: related_records::<DataUpload>(session, name, &BACKUP_RULES)
                    .await
                    .context(ListVolumeRecordsSnafu { name })?,
                pod_volume_backups: related_records::<PodVolumeBackup>(session, name, &BACKUP_RULES)
                    .await
                    .context(ListVolumeRecordsSnafu { name })?,
            }),
            None => None,
        };

        if index > 0 {
            println!();
        }
        print!("{}", describe_backup(backup, details.as_ref(), now()));
    }
    Ok(())
}

async fn logs(args: LogsArgs, session: &Session) -> Result<()> {
    let downloader = session
        .velero_downloader(args.download)
        .context(CreateDownloaderSnafu)?;
    let log = downloader
        .fetch_artifact(DownloadTargetKind::BackupLog, &args.name)
        .await
        .context(FetchLogsSnafu { name: &args.name })?;
    print!("{log}");
    Ok(())
}

async fn delete(args: DeleteArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.admin_namespace;
    let backups: Api<Backup> = session.admin_api();
    let requests: Api<DeleteBackupRequest> = session.admin_api();

    for name in &args.names {
        lookup::get_existing::<Backup, _>(&backups, KIND, name, namespace)
            .await
            .context(ReadBackupsSnafu)?;

        if !args.confirm
            && !prompt::confirm(&format!("Are you sure you want to delete backup {name:?}?"))
                .context(ConfirmSnafu)?
        {
            println!("Skipping backup {name:?}.");
            continue;
        }

        let request = delete_backup_request(name, namespace);
        ResourceStore::create(&requests, &request)
            .await
            .context(RequestDeletionSnafu { name })?;
        info!(%name, %namespace, "requested backup deletion");
        println!(
            "Request to delete backup {name:?} submitted successfully. The backup will be fully deleted after all associated data (disk snapshots, backup files, restores) are removed."
        );
    }
    Ok(())
}
