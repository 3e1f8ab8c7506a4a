//! `kubectl oadp restore`, Velero restores in the admin namespace.

use clap::{Args, Subcommand};
use jiff::Zoned;
use kube::Api;
use oadp_client::{
    builder::{
        self, MetadataFlags, display_selector,
        restore::{
            RestoreNamespaceFlags, RestoreOptions, RestoreSourceFlags, default_restore_name,
            restore,
        },
    },
    client::{self, ResourceStore},
    correlation::RESTORE_RULES,
    crd::velero::{DataDownload, PodVolumeRestore, Restore, RestorePhase},
    describe::{RestoreDetails, describe_restore, format_optional, table::Table},
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

const KIND: &str = "restore";

/// Artifacts added to `describe --details`.
const DETAIL_SECTIONS: [DownloadTargetKind; 3] = [
    DownloadTargetKind::RestoreResults,
    DownloadTargetKind::RestoreResourceList,
    DownloadTargetKind::RestoreItemOperations,
];

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid restore flags"))]
    BuildRestore { source: builder::Error },

    #[snafu(display("failed to read restores"))]
    ReadRestores { source: lookup::Error },

    #[snafu(display("failed to create restore {name:?}"))]
    CreateRestore { source: client::Error, name: String },

    #[snafu(display("failed to wait for restore {name:?}"))]
    WaitForRestore { source: wait::Error, name: String },

    #[snafu(display("failed to list the volume records of restore {name:?}"))]
    ListVolumeRecords { source: client::Error, name: String },

    #[snafu(display("failed to set up artifact downloads"))]
    CreateDownloader { source: fetch::Error },

    #[snafu(display("failed to get the logs of restore {name:?}"))]
    FetchLogs { source: download::Error, name: String },

    #[snafu(display("failed to delete restore {name:?}"))]
    DeleteRestore { source: client::Error, name: String },

    #[snafu(display("failed to read the confirmation"))]
    Confirm { source: std::io::Error },

    #[snafu(display("failed to print restores"))]
    Print { source: output::Error },
}

#[derive(Debug, Subcommand)]
pub enum RestoreCommand {
    /// Restore a backup, or the latest backup of a schedule.
    Create(CreateArgs),

    /// List restores.
    Get(GetArgs),

    /// Show details of restores.
    Describe(DescribeArgs),

    /// Print the log of a restore.
    Logs(LogsArgs),

    /// Delete restores. The restored resources are left alone.
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Name of the restore, `<source>-<timestamp>` if not set.
    pub name: Option<String>,

    #[command(flatten)]
    pub source: RestoreSourceFlags,

    #[command(flatten)]
    pub namespaces: RestoreNamespaceFlags,

    #[command(flatten)]
    pub options: RestoreOptions,

    #[command(flatten)]
    pub metadata: MetadataFlags,

    #[command(flatten)]
    pub wait: WaitFlags,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Restores to show, all restores if empty.
    pub names: Vec<String>,

    /// Only show restores matching this label selector.
    #[arg(short = 'l', long, value_name = "SELECTOR", conflicts_with = "names")]
    pub selector: Option<String>,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Restores to describe.
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Also show the results, restored resources and item operations.
    #[arg(long)]
    pub details: bool,

    #[command(flatten)]
    pub download: DownloadFlags,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Restore to print the log of.
    pub name: String,

    #[command(flatten)]
    pub download: DownloadFlags,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Restores to delete.
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Don't ask for confirmation.
    #[arg(long)]
    pub confirm: bool,
}

pub async fn run(command: RestoreCommand, session: &Session) -> Result<()> {
    match command {
        RestoreCommand::Create(args) => create(args, session).await,
        RestoreCommand::Get(args) => get(args, session).await,
        RestoreCommand::Describe(args) => describe(args, session).await,
        RestoreCommand::Logs(args) => logs(args, session).await,
        RestoreCommand::Delete(args) => delete(args, session).await,
    }
}

async fn create(args: CreateArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.admin_namespace;

    let source = args.source.source().context(BuildRestoreSnafu)?;
    let mut spec = args.options.build(&source).context(BuildRestoreSnafu)?;
    args.namespaces.apply(&mut spec);

    let name = args
        .name
        .unwrap_or_else(|| default_restore_name(&source, &Zoned::now()));
    let restore = restore(&name, namespace, &args.metadata, spec);

    let api: Api<Restore> = session.admin_api();
    ResourceStore::create(&api, &restore)
        .await
        .context(CreateRestoreSnafu { name: &name })?;
    info!(%name, %namespace, "created restore");
    println!("Restore request {name:?} submitted successfully.");

    if !args.wait.wait {
        println!(
            "Run `kubectl oadp restore describe {name}` or `kubectl oadp restore logs {name}` for more details."
        );
        return Ok(());
    }

    let finished = wait_until_finished(api, KIND, &name, |restore: &Restore| {
        restore.phase().is_some_and(RestorePhase::is_terminal)
    })
    .await
    .context(WaitForRestoreSnafu { name: &name })?;
    if let Some(restore) = finished {
        println!(
            "Restore completed with status: {}. You may check for more information using the commands `kubectl oadp restore describe {name}` and `kubectl oadp restore logs {name}`.",
            format_optional(restore.phase()),
        );
    }
    Ok(())
}

async fn get(args: GetArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.admin_namespace;
    let api: Api<Restore> = session.admin_api();
    let restores = lookup::get_or_list(
        &api,
        KIND,
        &args.names,
        args.selector.as_deref(),
        namespace,
    )
    .await
    .context(ReadRestoresSnafu)?;

    print_objects(args.output.output, &restores, namespace, restore_table).context(PrintSnafu)
}

fn restore_table(restores: &[Restore]) -> Table {
    let mut table = Table::new([
        "NAME",
        "BACKUP",
        "STATUS",
        "STARTED",
        "COMPLETED",
        "ERRORS",
        "WARNINGS",
        "CREATED",
        "SELECTOR",
    ]);
    for restore in restores {
        let status = restore.status.as_ref();
        let source = restore
            .spec
            .backup_name
            .as_ref()
            .or(restore.spec.schedule_name.as_ref());
        table.row([
            restore.metadata.name.clone().unwrap_or_default(),
            source.cloned().unwrap_or_default(),
            restore
                .phase()
                .map_or_else(|| RestorePhase::New.to_string(), |phase| phase.to_string()),
            format_optional(
                status
                    .and_then(|status| status.start_timestamp.as_ref())
                    .map(|started| started.0),
            ),
            format_optional(
                status
                    .and_then(|status| status.completion_timestamp.as_ref())
                    .map(|completed| completed.0),
            ),
            status.and_then(|status| status.errors).unwrap_or_default().to_string(),
            status.and_then(|status| status.warnings).unwrap_or_default().to_string(),
            format_optional(
                restore
                    .metadata
                    .creation_timestamp
                    .as_ref()
                    .map(|created| created.0),
            ),
            display_selector(restore.spec.label_selector.as_ref()),
        ]);
    }
    table
}

async fn describe(args: DescribeArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.admin_namespace;
    let api: Api<Restore> = session.admin_api();
    let restores = lookup::get_or_list(&api, KIND, &args.names, None, namespace)
        .await
        .context(ReadRestoresSnafu)?;

    if print_serialized(args.output.output, &restores).context(PrintSnafu)? {
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

    for (index, restore) in restores.iter().enumerate() {
        let name = restore.metadata.name.as_deref().unwrap_or_default();
        let details = match &downloader {
            Some(downloader) => Some(RestoreDetails {
                sections: downloader.describe_sections(name, &DETAIL_SECTIONS).await,
                data_downloads: related_records::<DataDownload>(session, name, &RESTORE_RULES)
                    .await
                    .context(ListVolumeRecordsSnafu { name })?,
                pod_volume_restores: related_records::<PodVolumeRestore>(session, name, &RESTORE_RULES)
                    .await
                    .context(ListVolumeRecordsSnafu { name })?,
            }),
            None => None,
        };

        if index > 0 {
            println!();
        }
        print!("{}", describe_restore(restore, details.as_ref(), now()));
    }
    Ok(())
}

async fn logs(args: LogsArgs, session: &Session) -> Result<()> {
    let downloader = session
        .velero_downloader(args.download)
        .context(CreateDownloaderSnafu)?;
    let log = downloader
        .fetch_artifact(DownloadTargetKind::RestoreLog, &args.name)
        .await
        .context(FetchLogsSnafu { name: &args.name })?;
    print!("{log}");
    Ok(())
}

async fn delete(args: DeleteArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.admin_namespace;
    let api: Api<Restore> = session.admin_api();

    for name in &args.names {
        lookup::get_existing::<Restore, _>(&api, KIND, name, namespace)
            .await
            .context(ReadRestoresSnafu)?;

        if !args.confirm
            && !prompt::confirm(&format!("Are you sure you want to delete restore {name:?}?"))
                .context(ConfirmSnafu)?
        {
            println!("Skipping restore {name:?}.");
            continue;
        }

        ResourceStore::delete(&api, name)
            .await
            .context(DeleteRestoreSnafu { name })?;
        info!(%name, %namespace, "deleted restore");
        println!("Restore {name:?} deleted.");
    }
    Ok(())
}
