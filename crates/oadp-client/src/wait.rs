//! Waiting for a backup or restore to finish, for `create --wait`.
//!
//! The object is followed through a watch stream, see
//! [`kube::runtime::watcher::watch_object`]. Dropping the stream ends the
//! watch, which happens on every return from [`wait_for_completion`].

use std::{future::Future, pin::pin, time::Duration};

use futures::{Stream, StreamExt};
use kube::runtime::watcher;
use snafu::Snafu;
use tokio::time::MissedTickBehavior;
use tracing::{debug, instrument};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to watch {name:?}"))]
    Watch {
        source: watcher::Error,
        name: String,
    },

    #[snafu(display("the watch of {name:?} ended unexpectedly"))]
    StreamEnded { name: String },
}

/// How waiting ended.
#[derive(Clone, Debug, PartialEq)]
pub enum WaitOutcome<K> {
    /// The object reached a terminal state.
    Finished(K),

    /// The object was deleted while waiting.
    Deleted,

    /// The user interrupted the wait. The object itself is left alone.
    Interrupted,
}

/// Follows `events` until `is_finished` holds for the object, it is deleted,
/// or `interrupt` completes.
///
/// `on_progress` is called every `progress_interval` with the latest state
/// seen so far.
#[instrument(skip_all, fields(name = %name))]
pub async fn wait_for_completion<K, St, I>(
    name: &str,
    events: St,
    is_finished: impl Fn(&K) -> bool,
    interrupt: I,
    progress_interval: Duration,
    mut on_progress: impl FnMut(Option<&K>),
) -> Result<WaitOutcome<K>>
where
    St: Stream<Item = Result<Option<K>, watcher::Error>>,
    I: Future<Output = ()>,
{
    let mut events = pin!(events);
    let mut interrupt = pin!(interrupt);

    let mut ticker = tokio::time::interval(progress_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    let mut latest = None;
    loop {
        tokio::select! {
            biased;

            () = &mut interrupt => {
                debug!("wait interrupted");
                return Ok(WaitOutcome::Interrupted);
            }
            event = events.next() => match event {
                Some(Ok(Some(object))) => {
                    if is_finished(&object) {
                        return Ok(WaitOutcome::Finished(object));
                    }
                    latest = Some(object);
                }
                Some(Ok(None)) => return Ok(WaitOutcome::Deleted),
                Some(Err(source)) => {
                    return Err(Error::Watch {
                        source,
                        name: name.to_owned(),
                    });
                }
                None => return StreamEndedSnafu { name }.fail(),
            },
            _ = ticker.tick() => on_progress(latest.as_ref()),
        }
    }
}

/// Completes on Ctrl-C. If the signal handler can't be installed, it never
/// completes.
pub async fn ctrl_c() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        debug!(
            error = &error as &dyn std::error::Error,
            "failed to listen for Ctrl-C"
        );
        std::future::pending::<()>().await;
    }
}
