//! Polls a request object until the server has processed it.
//!
//! The decision logic is the pure [`PollState::advance`] function, the loop in
//! [`poll_until_terminal`] only drives it with a timer.

use std::time::Duration;

use snafu::{OptionExt, ResultExt, Snafu};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::client::{self, ResourceStore};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read the status of {name:?}"))]
    ReadStatus { source: client::Error, name: String },

    #[snafu(display("{name:?} disappeared before it was processed"))]
    Vanished { name: String },

    #[snafu(display("{name:?} failed with condition {condition_type}: {message}"))]
    ConditionFailed {
        name: String,
        condition_type: String,
        message: String,
    },

    #[snafu(display("{name:?} was not processed within {timeout:?}"))]
    TimedOut { name: String, timeout: Duration },
}

/// What a single status read of a request object tells us.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Observation<T> {
    /// Not processed yet.
    Pending,

    /// Processed, carrying the result.
    Processed(T),

    /// The server reported an error condition.
    Failed {
        condition_type: String,
        message: String,
    },
}

/// Request objects whose status can be interpreted as an [`Observation`].
pub trait Observe {
    type Output;

    fn observe(&self) -> Observation<Self::Output>;
}

/// States of the poll loop. Everything but [`PollState::Pending`] is terminal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollState<T> {
    Pending,
    Processed(T),
    Failed {
        condition_type: String,
        message: String,
    },
    TimedOut,
}

impl<T> PollState<T> {
    /// Computes the next state from the latest observation. A terminal
    /// observation wins over the deadline, so a result that arrives on the last
    /// tick is not thrown away.
    pub fn advance(observation: Observation<T>, now: Instant, deadline: Instant) -> Self {
        match observation {
            Observation::Processed(output) => Self::Processed(output),
            Observation::Failed {
                condition_type,
                message,
            } => Self::Failed {
                condition_type,
                message,
            },
            Observation::Pending if now >= deadline => Self::TimedOut,
            Observation::Pending => Self::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// How long and how often to poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSchedule {
    pub timeout: Duration,
    pub interval: Duration,
}

/// Reads the object `name` on every tick of `schedule.interval` until it is
/// processed, reports an error condition or the deadline passes.
///
/// The first read happens immediately. A timeout is reported no earlier than
/// the deadline and no later than one interval after it.
pub async fn poll_until_terminal<K, S>(
    store: &S,
    name: &str,
    schedule: PollSchedule,
) -> Result<K::Output>
where
    K: Observe + Send + Sync + 'static,
    S: ResourceStore<K> + ?Sized,
{
    let deadline = Instant::now() + schedule.timeout;
    let mut ticker = tokio::time::interval(schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut reads = 0_u32;

    loop {
        ticker.tick().await;
        reads += 1;

        let state = match tokio::time::timeout_at(deadline, store.get_opt(name)).await {
            Ok(object) => {
                let object = object
                    .context(ReadStatusSnafu { name })?
                    .context(VanishedSnafu { name })?;
                PollState::advance(object.observe(), Instant::now(), deadline)
            }
            Err(_elapsed) => PollState::TimedOut,
        };

        match state {
            PollState::Pending => debug!(name, reads, "request not processed yet"),
            PollState::Processed(output) => {
                debug!(name, reads, "request processed");
                return Ok(output);
            }
            PollState::Failed {
                condition_type,
                message,
            } => {
                return ConditionFailedSnafu {
                    name,
                    condition_type,
                    message,
                }
                .fail();
            }
            PollState::TimedOut => {
                return TimedOutSnafu {
                    name,
                    timeout: schedule.timeout,
                }
                .fail();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{
        crd::velero::{DownloadRequest, DownloadRequestPhase, DownloadRequestStatus},
        download::{DownloadRequestObject, DownloadTargetKind},
        testing::FakeStore,
    };

    const SCHEDULE: PollSchedule = PollSchedule {
        timeout: Duration::from_secs(10),
        interval: Duration::from_secs(1),
    };

    fn request(name: &str) -> DownloadRequest {
        DownloadRequest::for_target(name, "ns", DownloadTargetKind::BackupResults, "nightly")
    }

    fn process(request: &mut DownloadRequest) {
        request.status = Some(DownloadRequestStatus {
            phase: Some(DownloadRequestPhase::Processed),
            download_url: Some("https://s3/results".to_owned()),
            expiration: None,
        });
    }

    #[rstest]
    #[case(Observation::Pending, 5, PollState::Pending)]
    #[case(Observation::Pending, 10, PollState::TimedOut)]
    #[case(Observation::Pending, 11, PollState::TimedOut)]
    #[case(Observation::Processed(1), 10, PollState::Processed(1))]
    #[case(
        Observation::Failed { condition_type: "Accepted".into(), message: "boom".into() },
        3,
        PollState::Failed { condition_type: "Accepted".into(), message: "boom".into() }
    )]
    fn advance(
        #[case] observation: Observation<u8>,
        #[case] elapsed_secs: u64,
        #[case] expected: PollState<u8>,
    ) {
        let start = Instant::now();
        let deadline = start + Duration::from_secs(10);
        let now = start + Duration::from_secs(elapsed_secs);

        assert_eq!(PollState::advance(observation, now, deadline), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_once_processed() {
        let store = FakeStore::default()
            .with_object(request("r"))
            .with_reconciler(|request: &mut DownloadRequest, reads| {
                if reads >= 3 {
                    process(request);
                }
            });

        let url = poll_until_terminal(&store, "r", SCHEDULE).await.unwrap();

        assert_eq!(url, "https://s3/results");
        assert_eq!(store.gets(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_within_one_interval_of_the_deadline() {
        let store = FakeStore::default().with_object(request("r"));
        let start = Instant::now();

        let err = poll_until_terminal(&store, "r", SCHEDULE).await.unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, Error::TimedOut { .. }), "{err:?}");
        assert!(elapsed >= SCHEDULE.timeout, "{elapsed:?}");
        assert!(elapsed <= SCHEDULE.timeout + SCHEDULE.interval, "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_request_is_an_error() {
        let store = FakeStore::<DownloadRequest>::default();

        let err = poll_until_terminal(&store, "gone", SCHEDULE)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Vanished { .. }), "{err:?}");
    }
}
