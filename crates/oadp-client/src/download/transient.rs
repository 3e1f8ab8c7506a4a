//! Scoped ownership of request objects that only live for one operation.

use std::{marker::PhantomData, time::Duration};

use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::client::{self, ResourceStore};

/// Deadline of the create call.
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Deadline of the cleanup delete, independent of any polling deadline.
pub const CLEANUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to submit request {name:?}"))]
    Submit { source: client::Error, name: String },

    #[snafu(display("request {name:?} was not accepted within {SUBMIT_TIMEOUT:?}"))]
    SubmitTimedOut { name: String },
}

/// A request object created for the duration of one operation.
///
/// Call [`TransientRequest::release`] on every exit path. If the guard is
/// dropped without being released (the future was cancelled, for example) the
/// delete is spawned onto the current runtime instead. The object is deleted
/// exactly once either way, and delete failures are only logged.
pub struct TransientRequest<K, S>
where
    K: Send + Sync + 'static,
    S: ResourceStore<K> + Clone + 'static,
{
    store: S,
    name: String,
    released: bool,
    _kind: PhantomData<fn() -> K>,
}

impl<K, S> TransientRequest<K, S>
where
    K: Send + Sync + 'static,
    S: ResourceStore<K> + Clone + 'static,
{
    /// Creates `object` named `name`, waiting at most [`SUBMIT_TIMEOUT`].
    ///
    /// A rejected create is returned as is, there is nothing to clean up in
    /// that case. A create that times out may still have reached the server,
    /// so the object is deleted before returning.
    pub async fn submit(store: S, name: &str, object: &K) -> Result<Self, Error> {
        match tokio::time::timeout(SUBMIT_TIMEOUT, store.create(object)).await {
            Ok(created) => {
                created.context(SubmitSnafu { name })?;
            }
            Err(_elapsed) => {
                delete_with_deadline::<K, S>(&store, name).await;
                return SubmitTimedOutSnafu { name }.fail();
            }
        }
        info!(name, "submitted request");

        Ok(Self {
            store,
            name: name.to_owned(),
            released: false,
            _kind: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Deletes the request object, waiting at most [`CLEANUP_TIMEOUT`].
    pub async fn release(mut self) {
        self.released = true;
        delete_with_deadline::<K, S>(&self.store, &self.name).await;
    }
}

impl<K, S> Drop for TransientRequest<K, S>
where
    K: Send + Sync + 'static,
    S: ResourceStore<K> + Clone + 'static,
{
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(name = %self.name, "no runtime left to delete request");
            return;
        };

        let store = self.store.clone();
        let name = std::mem::take(&mut self.name);
        runtime.spawn(async move {
            delete_with_deadline::<K, S>(&store, &name).await;
        });
    }
}

async fn delete_with_deadline<K, S>(store: &S, name: &str)
where
    K: Send + Sync + 'static,
    S: ResourceStore<K>,
{
    match tokio::time::timeout(CLEANUP_TIMEOUT, store.delete(name)).await {
        Ok(Ok(())) => debug!(name, "deleted request"),
        Ok(Err(error)) => debug!(name, %error, "failed to delete request"),
        Err(_elapsed) => debug!(name, "timed out deleting request"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        crd::velero::DownloadRequest,
        download::{DownloadRequestObject, DownloadTargetKind},
        testing::{Call, FakeStore},
    };

    fn request() -> DownloadRequest {
        DownloadRequest::for_target("r", "ns", DownloadTargetKind::BackupLog, "nightly")
    }

    #[tokio::test]
    async fn release_deletes_once() {
        let store = FakeStore::default();

        let guard = TransientRequest::submit(store.clone(), "r", &request())
            .await
            .unwrap();
        guard.release().await;

        assert_eq!(store.calls(), vec![
            Call::Create("r".to_owned()),
            Call::Delete("r".to_owned())
        ]);
        assert!(store.object("r").is_none());
    }

    #[tokio::test]
    async fn drop_without_release_still_deletes() {
        let store = FakeStore::default();

        let guard = TransientRequest::submit(store.clone(), "r", &request())
            .await
            .unwrap();
        drop(guard);
        tokio::task::yield_now().await;

        assert_eq!(store.deletes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_delete_is_abandoned_after_cleanup_timeout() {
        let store = FakeStore::default().with_delete_delay(Duration::from_secs(60));
        let start = tokio::time::Instant::now();

        let guard = TransientRequest::submit(store.clone(), "r", &request())
            .await
            .unwrap();
        guard.release().await;

        assert_eq!(start.elapsed(), CLEANUP_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_create_gives_up_after_submit_timeout() {
        let store = FakeStore::default().stalled();
        let start = tokio::time::Instant::now();

        let result = TransientRequest::submit(store.clone(), "r", &request()).await;

        assert!(matches!(result, Err(Error::SubmitTimedOut { .. })));
        assert!(start.elapsed() >= SUBMIT_TIMEOUT);
        assert!(start.elapsed() <= SUBMIT_TIMEOUT + CLEANUP_TIMEOUT);
        assert_eq!(store.deletes(), 1);
    }

    #[tokio::test]
    async fn failed_submit_has_nothing_to_clean_up() {
        let store = FakeStore::default().failing_create();

        let result = TransientRequest::submit(store.clone(), "r", &request()).await;

        assert!(matches!(result, Err(Error::Submit { .. })));
        assert_eq!(store.deletes(), 0);
    }
}
