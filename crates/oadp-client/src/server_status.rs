//! Asks the Velero server for its version.

use std::time::Duration;

use snafu::{ResultExt, Snafu};
use tracing::instrument;

use crate::{
    client::ResourceStore,
    crd::velero::{ServerStatus, ServerStatusRequest},
    download::{
        PollSchedule, TransientRequest, poll, poll_until_terminal, random_suffix, transient,
    },
};

const NAME_PREFIX: &str = "kubectl-oadp-version-";

const SCHEDULE: PollSchedule = PollSchedule {
    timeout: Duration::from_secs(10),
    interval: Duration::from_secs(1),
};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to request the server status"))]
    Submit { source: transient::Error },

    #[snafu(display("failed to get the server status"))]
    Poll { source: poll::Error },
}

/// Creates a [`ServerStatusRequest`] in `namespace`, waits until Velero has
/// processed it and deletes it again.
#[instrument(skip(store))]
pub async fn fetch_server_status<S>(store: S, namespace: &str) -> Result<ServerStatus, Error>
where
    S: ResourceStore<ServerStatusRequest> + Clone + 'static,
{
    let name = format!("{NAME_PREFIX}{}", random_suffix());
    let request = ServerStatusRequest::with_name(&name, namespace);

    let guard = TransientRequest::submit(store, &name, &request)
        .await
        .context(SubmitSnafu)?;

    let result =
        poll_until_terminal::<ServerStatusRequest, S>(guard.store(), guard.name(), SCHEDULE)
            .await
            .context(PollSnafu);
    guard.release().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crd::velero::{PluginInfo, ServerStatusRequestStatus},
        download::SUBMIT_TIMEOUT,
        testing::{Call, FakeStore},
    };

    #[tokio::test(start_paused = true)]
    async fn reports_version_and_cleans_up() {
        let store = FakeStore::default().with_reconciler(|request: &mut ServerStatusRequest, reads| {
            if reads >= 2 {
                request.status = Some(ServerStatusRequestStatus {
                    phase: Some("Processed".to_owned()),
                    server_version: Some("v1.16.0".to_owned()),
                    plugins: vec![PluginInfo {
                        name: "velero.io/aws".to_owned(),
                        kind: "ObjectStore".to_owned(),
                    }],
                    ..ServerStatusRequestStatus::default()
                });
            }
        });

        let status = fetch_server_status(store.clone(), "openshift-adp").await.unwrap();

        assert_eq!(status.server_version, "v1.16.0");
        assert_eq!(status.plugins.len(), 1);
        let calls = store.calls();
        let Some(Call::Create(name)) = calls.first() else {
            panic!("unexpected calls {calls:?}");
        };
        assert!(name.starts_with(NAME_PREFIX), "{name}");
        assert_eq!(calls.last(), Some(&Call::Delete(name.clone())));
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_server_times_out() {
        let store = FakeStore::<ServerStatusRequest>::default();

        let err = fetch_server_status(store.clone(), "openshift-adp").await.unwrap_err();

        assert!(matches!(err, Error::Poll { source: poll::Error::TimedOut { .. } }), "{err:?}");
        assert_eq!(store.deletes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_create_is_bounded() {
        let store = FakeStore::<ServerStatusRequest>::default().stalled();
        let start = tokio::time::Instant::now();

        let err = fetch_server_status(store.clone(), "openshift-adp").await.unwrap_err();

        assert!(
            matches!(err, Error::Submit { source: transient::Error::SubmitTimedOut { .. } }),
            "{err:?}"
        );
        assert!(start.elapsed() >= SUBMIT_TIMEOUT);
        assert_eq!(store.gets(), 0);
    }
}
