//! `kubectl oadp nonadmin restore`.

use clap::{Args, Subcommand};
use kube::Api;
use oadp_client::{
    builder::{
        self, MetadataFlags,
        nonadmin::non_admin_restore,
        restore::{RestoreOptions, RestoreSource},
    },
    client::{self, ResourceStore},
    crd::{nonadmin::NonAdminRestore, velero::RestorePhase},
    describe::{describe_non_admin_restore, format_optional, table::Table},
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

const KIND: &str = "non-admin restore";

/// Artifacts shown by `describe`, in this order.
const DESCRIBE_SECTIONS: [DownloadTargetKind; 3] = [
    DownloadTargetKind::RestoreResults,
    DownloadTargetKind::RestoreResourceList,
    DownloadTargetKind::RestoreItemOperations,
];

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("invalid restore flags"))]
    BuildRestore { source: builder::Error },

    #[snafu(display("failed to read non-admin restores"))]
    ReadRestores { source: lookup::Error },

    #[snafu(display("failed to create non-admin restore {name:?}"))]
    CreateRestore { source: client::Error, name: String },

    #[snafu(display("failed to wait for non-admin restore {name:?}"))]
    WaitForRestore { source: wait::Error, name: String },

    #[snafu(display("failed to set up artifact downloads"))]
    CreateDownloader { source: fetch::Error },

    #[snafu(display("failed to get the logs of non-admin restore {name:?}"))]
    FetchLogs { source: download::Error, name: String },

    #[snafu(display("failed to delete non-admin restore {name:?}"))]
    DeleteRestore { source: client::Error, name: String },

    #[snafu(display("failed to read the confirmation"))]
    Confirm { source: std::io::Error },

    #[snafu(display("failed to print non-admin restores"))]
    Print { source: output::Error },
}

#[derive(Debug, Subcommand)]
pub enum NonAdminRestoreCommand {
    /// Request a restore of a non-admin backup.
    Create(CreateArgs),

    /// List non-admin restores.
    Get(GetArgs),

    /// Show details of non-admin restores, including what was restored.
    Describe(DescribeArgs),

    /// Print the log of a non-admin restore.
    Logs(LogsArgs),

    /// Delete non-admin restores. The restored resources are left alone.
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Name of the restore.
    pub name: String,

    /// Non-admin backup to restore from.
    #[arg(long, value_name = "BACKUP")]
    pub from_backup: String,

    #[command(flatten)]
    pub options: RestoreOptions,

    #[command(flatten)]
    pub metadata: MetadataFlags,

    #[command(flatten)]
    pub wait: WaitFlags,
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Restores to show, all restores of the namespace if empty.
    pub names: Vec<String>,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Restores to describe.
    #[arg(required = true)]
    pub names: Vec<String>,

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

pub async fn run(command: NonAdminRestoreCommand, session: &Session) -> Result<()> {
    match command {
        NonAdminRestoreCommand::Create(args) => create(args, session).await,
        NonAdminRestoreCommand::Get(args) => get(args, session).await,
        NonAdminRestoreCommand::Describe(args) => describe(args, session).await,
        NonAdminRestoreCommand::Logs(args) => logs(args, session).await,
        NonAdminRestoreCommand::Delete(args) => delete(args, session).await,
    }
}

fn is_finished(restore: &NonAdminRestore) -> bool {
    restore
        .velero_status()
        .and_then(|status| status.phase)
        .is_some_and(RestorePhase::is_terminal)
}

async fn create(args: CreateArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.namespace;
    let spec = args
        .options
        .build(&RestoreSource::Backup(args.from_backup.clone()))
        .context(BuildRestoreSnafu)?;
    let restore = non_admin_restore(&args.name, namespace, &args.metadata, spec);

    let api: Api<NonAdminRestore> = session.user_api();
    ResourceStore::create(&api, &restore)
        .await
        .context(CreateRestoreSnafu { name: &args.name })?;
    info!(name = %args.name, %namespace, "created non-admin restore");
    println!("Non-admin restore {:?} submitted successfully.", args.name);

    if !args.wait.wait {
        println!(
            "Run `kubectl oadp nonadmin restore describe {name}` or `kubectl oadp nonadmin restore logs {name}` for more details.",
            name = args.name
        );
        return Ok(());
    }

    let finished = wait_until_finished(api, KIND, &args.name, is_finished)
        .await
        .context(WaitForRestoreSnafu { name: &args.name })?;
    if let Some(restore) = finished {
        println!(
            "Restore completed with status: {}.",
            format_optional(restore.velero_status().and_then(|status| status.phase))
        );
    }
    Ok(())
}

async fn get(args: GetArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.namespace;
    let api: Api<NonAdminRestore> = session.user_api();
    let restores = lookup::get_or_list(&api, KIND, &args.names, None, namespace)
        .await
        .context(ReadRestoresSnafu)?;

    print_objects(args.output.output, &restores, namespace, restore_table).context(PrintSnafu)
}

fn restore_table(restores: &[NonAdminRestore]) -> Table {
    let mut table = Table::new(["NAME", "REQUEST PHASE", "VELERO PHASE", "CREATED"]);
    for restore in restores {
        table.row([
            restore.metadata.name.clone().unwrap_or_default(),
            request_phase_cell(restore.status.as_ref().and_then(|status| status.phase)),
            velero_phase_cell(restore.velero_status().and_then(|status| status.phase)),
            created_cell(&restore.metadata),
        ]);
    }
    table
}

async fn describe(args: DescribeArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.namespace;
    let api: Api<NonAdminRestore> = session.user_api();
    let restores = lookup::get_or_list(&api, KIND, &args.names, None, namespace)
        .await
        .context(ReadRestoresSnafu)?;

    if print_serialized(args.output.output, &restores).context(PrintSnafu)? {
        return Ok(());
    }

    let downloader = session
        .non_admin_downloader(args.download)
        .context(CreateDownloaderSnafu)?;
    for (index, restore) in restores.iter().enumerate() {
        let name = restore.metadata.name.as_deref().unwrap_or_default();
        let sections = downloader.describe_sections(name, &DESCRIBE_SECTIONS).await;

        if index > 0 {
            println!();
        }
        print!("{}", describe_non_admin_restore(restore, &sections, now()));
    }
    Ok(())
}

async fn logs(args: LogsArgs, session: &Session) -> Result<()> {
    let downloader = session
        .non_admin_downloader(args.download)
        .context(CreateDownloaderSnafu)?;
    let log = downloader
        .fetch_artifact(DownloadTargetKind::RestoreLog, &args.name)
        .await
        .context(FetchLogsSnafu { name: &args.name })?;
    print!("{log}");
    Ok(())
}

async fn delete(args: DeleteArgs, session: &Session) -> Result<()> {
    let namespace = &session.context.namespace;
    let api: Api<NonAdminRestore> = session.user_api();

    for name in &args.names {
        lookup::get_existing::<NonAdminRestore, _>(&api, KIND, name, namespace)
            .await
            .context(ReadRestoresSnafu)?;

        if !args.confirm
            && !prompt::confirm(&format!(
                "Are you sure you want to delete non-admin restore {name:?}?"
            ))
            .context(ConfirmSnafu)?
        {
            println!("Skipping non-admin restore {name:?}.");
            continue;
        }

        ResourceStore::delete(&api, name)
            .await
            .context(DeleteRestoreSnafu { name })?;
        info!(%name, %namespace, "deleted non-admin restore");
        println!("Non-admin restore {name:?} deleted.");
    }
    Ok(())
}
