//! The download request protocol.
//!
//! Velero only hands out backup artifacts (logs, results, resource lists, ...)
//! through signed object storage URLs. To get one, a short lived request object
//! naming the artifact is created, polled until the server has processed it and
//! deleted afterwards. The [`Downloader`] runs this protocol for both the
//! Velero [`DownloadRequest`](crate::crd::velero::DownloadRequest) and the
//! [`NonAdminDownloadRequest`](crate::crd::nonadmin::NonAdminDownloadRequest).

use std::marker::PhantomData;

use rand::{Rng, distr::Alphanumeric};
use snafu::{ResultExt, Snafu};
use tracing::{instrument, warn};

use crate::client::ResourceStore;

pub mod fetch;
mod kind;
pub mod poll;
pub mod transient;

pub use fetch::{ArtifactFetcher, HttpFetcher, decode_body};
pub use kind::{DownloadPolicy, DownloadTargetKind};
pub use poll::{Observation, Observe, PollSchedule, PollState, poll_until_terminal};
pub use transient::{CLEANUP_TIMEOUT, SUBMIT_TIMEOUT, TransientRequest};

/// Length of the random suffix of generated request names.
const SUFFIX_LENGTH: usize = 5;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to request the {kind} of {target:?}"))]
    Submit {
        source: transient::Error,
        kind: DownloadTargetKind,
        target: String,
    },

    #[snafu(display("failed to wait for the {kind} of {target:?}"))]
    Poll {
        source: poll::Error,
        kind: DownloadTargetKind,
        target: String,
    },

    #[snafu(display("failed to download the {kind} of {target:?}"))]
    Fetch {
        source: fetch::Error,
        kind: DownloadTargetKind,
        target: String,
    },
}

impl Error {
    /// Returns `true` if the server did not process the request in time.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Poll {
                source: poll::Error::TimedOut { .. },
                ..
            }
        )
    }
}

/// Request objects the [`Downloader`] can drive.
pub trait DownloadRequestObject: Observe<Output = String> + Clone + Send + Sync + 'static {
    /// Builds a new request named `name` for the artifact `kind` of `target`.
    fn for_target(name: &str, namespace: &str, kind: DownloadTargetKind, target: &str) -> Self;
}

/// One artifact rendered by `describe`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub kind: DownloadTargetKind,
    pub content: String,
}

/// Generates the name of a request for the artifact `kind` of `target`, in the
/// form `<target>-<kind>-<suffix>`.
pub fn request_name(target: &str, kind: DownloadTargetKind) -> String {
    format!(
        "{target}-{kind}-{suffix}",
        kind = kind.name_fragment(),
        suffix = random_suffix()
    )
}

/// Random lowercase alphanumeric suffix that keeps generated names unique.
pub fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LENGTH)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}

/// Runs the download request protocol with request objects of kind `K` in
/// one namespace.
pub struct Downloader<K, S, F> {
    store: S,
    fetcher: F,
    namespace: String,
    _kind: PhantomData<fn() -> K>,
}

impl<K, S, F> Downloader<K, S, F>
where
    K: DownloadRequestObject,
    S: ResourceStore<K> + Clone + 'static,
    F: ArtifactFetcher,
{
    pub fn new(store: S, fetcher: F, namespace: impl Into<String>) -> Self {
        Self {
            store,
            fetcher,
            namespace: namespace.into(),
            _kind: PhantomData,
        }
    }

    /// Fetches the artifact `kind` of the backup or restore `target`.
    ///
    /// The request object is deleted on every path out of this function,
    /// including errors and timeouts. Failing to delete it is not an error.
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn fetch_artifact(&self, kind: DownloadTargetKind, target: &str) -> Result<String> {
        let name = request_name(target, kind);
        let request = K::for_target(&name, &self.namespace, kind, target);

        let guard = TransientRequest::submit(self.store.clone(), &name, &request)
            .await
            .context(SubmitSnafu { kind, target })?;

        let result = self.wait_and_fetch(&guard, kind, target).await;
        guard.release().await;
        result
    }

    async fn wait_and_fetch(
        &self,
        guard: &TransientRequest<K, S>,
        kind: DownloadTargetKind,
        target: &str,
    ) -> Result<String> {
        let policy = kind.policy();
        let schedule = PollSchedule {
            timeout: policy.timeout,
            interval: policy.interval,
        };

        let url = poll_until_terminal::<K, S>(guard.store(), guard.name(), schedule)
            .await
            .context(PollSnafu { kind, target })?;

        self.fetcher
            .fetch(&url, policy.assume_gzip)
            .await
            .context(FetchSnafu { kind, target })
    }

    /// Fetches several artifacts of `target` one after the other. Artifacts
    /// that can't be fetched are left out, the others keep the order of
    /// `kinds`.
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn describe_sections(
        &self,
        target: &str,
        kinds: &[DownloadTargetKind],
    ) -> Vec<Section> {
        let mut sections = Vec::with_capacity(kinds.len());

        for &kind in kinds {
            match self.fetch_artifact(kind, target).await {
                Ok(content) => sections.push(Section { kind, content }),
                Err(error) if error.is_timeout() => warn!(
                    %kind,
                    timeout = ?kind.policy().timeout,
                    "leaving out section the server did not prepare in time"
                ),
                Err(error) => warn!(
                    %kind,
                    error = &error as &dyn std::error::Error,
                    "leaving out unavailable section"
                ),
            }
        }

        sections
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        crd::{
            nonadmin::{
                Condition, ConditionStatus, NonAdminDownloadRequest,
                NonAdminDownloadRequestStatus, VeleroDownloadRequest, VeleroDownloadRequestStatus,
            },
            velero::{DownloadRequest, DownloadRequestPhase, DownloadRequestStatus},
        },
        testing::FakeStore,
    };

    /// Returns the URL it was asked for as the artifact content.
    #[derive(Clone, Default)]
    struct EchoFetcher {
        urls: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl ArtifactFetcher for EchoFetcher {
        async fn fetch(&self, url: &str, _assume_gzip: bool) -> Result<String, fetch::Error> {
            self.urls.lock().unwrap().push(url.to_owned());
            if self.fail {
                return Err(fetch::Error::HttpStatus {
                    status: 403,
                    body: "AccessDenied".to_owned(),
                });
            }
            Ok(format!("content of {url}"))
        }
    }

    fn process(request: &mut DownloadRequest) {
        let url = format!("https://s3/{}", request.spec.target.kind);
        request.status = Some(DownloadRequestStatus {
            phase: Some(DownloadRequestPhase::Processed),
            download_url: Some(url),
            expiration: None,
        });
    }

    fn downloader(
        store: &FakeStore<DownloadRequest>,
        fetcher: &EchoFetcher,
    ) -> Downloader<DownloadRequest, FakeStore<DownloadRequest>, EchoFetcher> {
        Downloader::new(store.clone(), fetcher.clone(), "openshift-adp")
    }

    #[test]
    fn request_names_follow_target_and_kind() {
        let name = request_name("nightly", DownloadTargetKind::BackupResults);

        let suffix = name.strip_prefix("nightly-backupresults-").unwrap();
        assert_eq!(suffix.len(), SUFFIX_LENGTH);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
            "{name}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn success_deletes_the_request_once() {
        let store = FakeStore::default()
            .with_reconciler(|request: &mut DownloadRequest, _| process(request));
        let fetcher = EchoFetcher::default();

        let content = downloader(&store, &fetcher)
            .fetch_artifact(DownloadTargetKind::BackupResults, "nightly")
            .await
            .unwrap();

        assert_eq!(content, "content of https://s3/BackupResults");
        assert_eq!(store.creates(), 1);
        assert_eq!(store.deletes(), 1);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_deletes_the_request_once() {
        let store = FakeStore::<DownloadRequest>::default();
        let fetcher = EchoFetcher::default();
        let start = tokio::time::Instant::now();

        let err = downloader(&store, &fetcher)
            .fetch_artifact(DownloadTargetKind::BackupLog, "nightly")
            .await
            .unwrap_err();

        assert!(err.is_timeout(), "{err:?}");
        assert!(err.to_string().contains("BackupLog"), "{err}");
        assert!(start.elapsed() >= Duration::from_secs(120));
        assert_eq!(store.deletes(), 1);
        assert!(fetcher.urls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn error_condition_deletes_the_request_once() {
        let store = FakeStore::default().with_reconciler(
            |request: &mut NonAdminDownloadRequest, _| {
                request.status = Some(NonAdminDownloadRequestStatus {
                    conditions: vec![Condition {
                        type_: "Accepted".to_owned(),
                        status: ConditionStatus::True,
                        reason: Some("Error".to_owned()),
                        message: Some("NonAdminBackup nightly not found".to_owned()),
                        last_transition_time: None,
                    }],
                    ..NonAdminDownloadRequestStatus::default()
                });
            },
        );
        let fetcher = EchoFetcher::default();

        let err = Downloader::<NonAdminDownloadRequest, _, _>::new(store.clone(), fetcher, "team-a")
            .fetch_artifact(DownloadTargetKind::BackupResults, "nightly")
            .await
            .unwrap_err();

        match err {
            Error::Poll {
                source:
                    poll::Error::ConditionFailed {
                        condition_type,
                        message,
                        ..
                    },
                ..
            } => {
                assert_eq!(condition_type, "Accepted");
                assert_eq!(message, "NonAdminBackup nightly not found");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(store.deletes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn http_failure_deletes_the_request_once() {
        let store = FakeStore::default().with_reconciler(
            |request: &mut NonAdminDownloadRequest, _| {
                request.status = Some(NonAdminDownloadRequestStatus {
                    velero: Some(VeleroDownloadRequest {
                        status: Some(VeleroDownloadRequestStatus {
                            phase: Some(DownloadRequestPhase::Processed),
                            download_url: Some("https://s3/expired".to_owned()),
                            expiration: None,
                        }),
                    }),
                    conditions: vec![Condition {
                        type_: "Processed".to_owned(),
                        status: ConditionStatus::True,
                        ..Condition::default()
                    }],
                    ..NonAdminDownloadRequestStatus::default()
                });
            },
        );
        let fetcher = EchoFetcher {
            fail: true,
            ..EchoFetcher::default()
        };

        let err = Downloader::<NonAdminDownloadRequest, _, _>::new(store.clone(), fetcher, "team-a")
            .fetch_artifact(DownloadTargetKind::BackupLog, "nightly")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Fetch { .. }), "{err:?}");
        assert_eq!(store.deletes(), 1);
    }

    #[tokio::test]
    async fn failed_create_is_returned_without_polling() {
        let store = FakeStore::<DownloadRequest>::default().failing_create();
        let fetcher = EchoFetcher::default();

        let err = downloader(&store, &fetcher)
            .fetch_artifact(DownloadTargetKind::BackupResults, "nightly")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Submit { .. }), "{err:?}");
        assert_eq!(store.gets(), 0);
        assert_eq!(store.deletes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_create_ends_at_the_submit_deadline() {
        let store = FakeStore::<DownloadRequest>::default().stalled();
        let fetcher = EchoFetcher::default();
        let start = tokio::time::Instant::now();

        let err = tokio::time::timeout(
            Duration::from_secs(3600),
            downloader(&store, &fetcher).fetch_artifact(DownloadTargetKind::BackupResults, "nightly"),
        )
        .await
        .expect("fetch_artifact must not outlive its deadlines")
        .unwrap_err();

        assert!(
            matches!(
                err,
                Error::Submit {
                    source: transient::Error::SubmitTimedOut { .. },
                    ..
                }
            ),
            "{err:?}"
        );
        assert!(start.elapsed() <= SUBMIT_TIMEOUT + CLEANUP_TIMEOUT);
        assert_eq!(store.gets(), 0);
        assert_eq!(store.deletes(), 1);
        assert!(fetcher.urls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn describe_leaves_out_unavailable_sections() {
        let store = FakeStore::default().with_reconciler(|request: &mut DownloadRequest, _| {
            if matches!(
                request.spec.target.kind,
                DownloadTargetKind::BackupResults | DownloadTargetKind::BackupItemOperations
            ) {
                process(request);
            }
        });
        let fetcher = EchoFetcher::default();
        let kinds = [
            DownloadTargetKind::BackupResults,
            DownloadTargetKind::BackupResourceList,
            DownloadTargetKind::BackupItemOperations,
            DownloadTargetKind::BackupVolumeInfos,
        ];

        let sections = downloader(&store, &fetcher)
            .describe_sections("nightly", &kinds)
            .await;

        assert_eq!(sections, vec![
            Section {
                kind: DownloadTargetKind::BackupResults,
                content: "content of https://s3/BackupResults".to_owned(),
            },
            Section {
                kind: DownloadTargetKind::BackupItemOperations,
                content: "content of https://s3/BackupItemOperations".to_owned(),
            },
        ]);
        assert_eq!(store.creates(), 4);
        assert_eq!(store.deletes(), 4);
    }
}
