//! The command tree. Every command module owns its clap definitions, its
//! error type and a `run` function.

use std::{fmt::Debug, time::Duration};

use kube::{Api, Resource, core::NamespaceResourceScope, runtime::watcher};
use oadp_client::{
    client::{self, Client, ResourceStore},
    config::{self, ClientConfig},
    context::RequestContext,
    correlation::{MatchRule, belongs_to},
    crd::{nonadmin::NonAdminDownloadRequest, velero::DownloadRequest},
    download::{Downloader, HttpFetcher, fetch},
    wait::{self, WaitOutcome},
};
use serde::{Serialize, de::DeserializeOwned};
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::cli::{Command, GlobalOptions};

pub mod backup;
pub mod client_config;
pub mod lookup;
pub mod nabsl_request;
pub mod nonadmin;
pub mod restore;
pub mod version;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(transparent)]
    Session { source: SessionError },

    #[snafu(transparent)]
    Backup { source: backup::Error },

    #[snafu(transparent)]
    Restore { source: restore::Error },

    #[snafu(transparent)]
    Version { source: version::Error },

    #[snafu(transparent)]
    NonAdmin { source: nonadmin::Error },

    #[snafu(transparent)]
    Request { source: nabsl_request::Error },

    #[snafu(transparent)]
    ClientConfig { source: client_config::Error },
}

pub async fn run(command: Command, global: &GlobalOptions) -> Result<(), Error> {
    match command {
        Command::Backup(command) => {
            let session = Session::connect(global).await?;
            backup::run(command, &session).await?;
        }
        Command::Restore(command) => {
            let session = Session::connect(global).await?;
            restore::run(command, &session).await?;
        }
        Command::Version(args) => version::run(&args, global).await?,
        Command::Nonadmin(command) => {
            let session = Session::connect(global).await?;
            nonadmin::run(command, &session).await?;
        }
        Command::NabslRequest(command) => {
            let session = Session::connect(global).await?;
            nabsl_request::run(command, &session).await?;
        }
        Command::Client(command) => client_config::run(command)?,
    }
    Ok(())
}

/// Deadline of a single artifact download from object storage.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// How often a dot is printed while waiting.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

pub type VeleroDownloader = Downloader<DownloadRequest, Api<DownloadRequest>, HttpFetcher>;

pub type NonAdminDownloader =
    Downloader<NonAdminDownloadRequest, Api<NonAdminDownloadRequest>, HttpFetcher>;

/// `--wait` of the create commands.
#[derive(clap::Args, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaitFlags {
    /// Wait until the operation has finished. Ctrl-C stops waiting, not the
    /// operation.
    #[arg(long)]
    pub wait: bool,
}

/// Flags of commands that download artifacts from object storage.
#[derive(clap::Args, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DownloadFlags {
    /// Don't verify the TLS certificate of the object storage server.
    #[arg(long)]
    pub insecure_skip_tls_verify: bool,
}

#[derive(Debug, Snafu)]
pub enum SessionError {
    #[snafu(display("failed to connect to the cluster"))]
    Connect { source: client::Error },

    #[snafu(display("failed to load the client config"))]
    LoadConfig { source: config::Error },
}

/// A connected client together with the namespaces of this invocation.
pub struct Session {
    pub client: Client,
    pub context: RequestContext,
}

impl Session {
    pub async fn connect(global: &GlobalOptions) -> Result<Self, SessionError> {
        let config_path = config::default_path().context(LoadConfigSnafu)?;
        let config = ClientConfig::load(&config_path).context(LoadConfigSnafu)?;
        let client = Client::connect(&global.kubeconfig)
            .await
            .context(ConnectSnafu)?;

        let context = RequestContext::resolve(
            client.default_namespace(),
            global.namespace.as_deref(),
            &config,
        );
        debug!(
            namespace = %context.namespace,
            admin_namespace = %context.admin_namespace,
            "resolved namespaces"
        );

        Ok(Self { client, context })
    }

    /// Objects in the namespace of the OADP installation.
    pub fn admin_api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        self.client.namespaced_api(&self.context.admin_namespace)
    }

    /// Objects in the namespace of the current kubeconfig context.
    pub fn user_api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        self.client.namespaced_api(&self.context.namespace)
    }

    /// Downloads artifacts of admin backups and restores.
    pub fn velero_downloader(&self, flags: DownloadFlags) -> Result<VeleroDownloader, fetch::Error> {
        let fetcher = HttpFetcher::new(flags.insecure_skip_tls_verify, HTTP_TIMEOUT)?;
        Ok(Downloader::new(
            self.admin_api(),
            fetcher,
            self.context.admin_namespace.clone(),
        ))
    }

    /// Downloads artifacts of non-admin backups and restores in the namespace
    /// of the user.
    pub fn non_admin_downloader(
        &self,
        flags: DownloadFlags,
    ) -> Result<NonAdminDownloader, fetch::Error> {
        let fetcher = HttpFetcher::new(flags.insecure_skip_tls_verify, HTTP_TIMEOUT)?;
        Ok(Downloader::new(
            self.user_api(),
            fetcher,
            self.context.namespace.clone(),
        ))
    }
}

/// Lists the objects in the admin namespace that belong to the backup or
/// restore `name`, like its data uploads or pod volume backups.
pub async fn related_records<K>(
    session: &Session,
    name: &str,
    rules: &[MatchRule],
) -> Result<Vec<K>, client::Error>
where
    K: Resource<Scope = NamespaceResourceScope>
        + Clone
        + DeserializeOwned
        + Serialize
        + Debug
        + Send
        + Sync
        + 'static,
    K::DynamicType: Default,
{
    let api: Api<K> = session.admin_api();
    let mut records = ResourceStore::list(&api, None).await?;
    records.retain(|record| belongs_to(record, name, rules));
    Ok(records)
}

/// Follows the object `name` until `is_finished` holds for it, printing a dot
/// every second. Returns `None` if it was deleted or the user stopped waiting.
pub async fn wait_until_finished<K>(
    api: Api<K>,
    kind: &str,
    name: &str,
    is_finished: impl Fn(&K) -> bool,
) -> Result<Option<K>, wait::Error>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + 'static,
{
    eprintln!(
        "Waiting for {kind} {name:?} to complete. You may safely press Ctrl-C to stop waiting, \
         the {kind} continues in the background."
    );

    let outcome = wait::wait_for_completion(
        name,
        watcher::watch_object(api, name),
        is_finished,
        wait::ctrl_c(),
        PROGRESS_INTERVAL,
        |_| eprint!("."),
    )
    .await;
    eprintln!();

    match outcome? {
        WaitOutcome::Finished(object) => Ok(Some(object)),
        WaitOutcome::Deleted => {
            eprintln!("The {kind} {name:?} was deleted while waiting.");
            Ok(None)
        }
        WaitOutcome::Interrupted => {
            eprintln!("Stopped waiting, the {kind} {name:?} is still in progress.");
            Ok(None)
        }
    }
}

/// The current time, for ages and relative timestamps.
pub fn now() -> k8s_openapi::jiff::Timestamp {
    k8s_openapi::jiff::Timestamp::now()
}
