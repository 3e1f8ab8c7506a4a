//! Approval of storage location requests made by non-admin users.
//!
//! Every [`NonAdminBackupStorageLocationRequest`] lives in the admin namespace
//! under a generated name. Admins can refer to it either by that name or by
//! the name of the [`NonAdminBackupStorageLocation`] it was created for.
//!
//! [`NonAdminBackupStorageLocation`]: crate::crd::nonadmin::NonAdminBackupStorageLocation

use std::time::Duration;

use snafu::{OptionExt, ResultExt, Snafu};
use tracing::{debug, info, instrument};

use crate::{
    client::{self, ResourceStore},
    crd::nonadmin::{ApprovalDecision, NonAdminBackupStorageLocationRequest},
};

/// Annotation holding the reason given for an approval.
pub const APPROVAL_REASON_ANNOTATION: &str = "oadp.openshift.io/approval-reason";

/// Annotation holding the reason given for a rejection.
pub const REJECTION_REASON_ANNOTATION: &str = "oadp.openshift.io/rejection-reason";

/// Deadline of every API call made by the [`ApprovalHelper`].
pub const CALL_TIMEOUT: Duration = Duration::from_secs(30);

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to get request {name:?}"))]
    GetRequest { source: client::Error, name: String },

    #[snafu(display("failed to list requests in namespace {namespace:?}"))]
    ListRequests {
        source: client::Error,
        namespace: String,
    },

    #[snafu(display(
        "no storage location request {identifier:?} found in namespace {namespace:?}"
    ))]
    RequestNotFound {
        identifier: String,
        namespace: String,
    },

    #[snafu(display(
        "{identifier:?} names storage locations in several namespaces, use one of the request names: {candidates}"
    ))]
    AmbiguousIdentifier {
        identifier: String,
        candidates: String,
    },

    #[snafu(display("failed to {decision} request {name:?}"))]
    UpdateRequest {
        source: client::Error,
        name: String,
        decision: Decision,
    },

    #[snafu(display("{operation} of {target:?} got no answer within {CALL_TIMEOUT:?}"))]
    CallTimedOut {
        operation: &'static str,
        target: String,
    },
}

/// Runs one API call, giving up after [`CALL_TIMEOUT`].
async fn with_deadline<T>(
    operation: &'static str,
    target: &str,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(CALL_TIMEOUT, call)
        .await
        .ok()
        .context(CallTimedOutSnafu { operation, target })?
}

/// The decision an admin can take from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    fn stored(self) -> ApprovalDecision {
        match self {
            Self::Approve => ApprovalDecision::Approve,
            Self::Reject => ApprovalDecision::Reject,
        }
    }

    /// The annotation the reason of this decision is stored under.
    pub fn reason_annotation(self) -> &'static str {
        match self {
            Self::Approve => APPROVAL_REASON_ANNOTATION,
            Self::Reject => REJECTION_REASON_ANNOTATION,
        }
    }

    /// Past tense, as in "the request is already approved".
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Approve => "approved",
            Self::Reject => "rejected",
        }
    }
}

/// What [`ApprovalHelper::set_decision`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// The decision was stored.
    Applied,

    /// The decision was already in place, only the reason was replaced.
    ReasonUpdated,

    /// The decision was already in place and nothing was written.
    AlreadyInState,
}

/// Looks up and decides storage location requests in the admin namespace.
pub struct ApprovalHelper<S> {
    store: S,
    namespace: String,
}

impl<S> ApprovalHelper<S>
where
    S: ResourceStore<NonAdminBackupStorageLocationRequest>,
{
    pub fn new(store: S, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Returns the name of the request identified by `identifier`, which is
    /// either the request name itself or the name of the source storage
    /// location.
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn resolve_request_name(&self, identifier: &str) -> Result<String> {
        let direct = with_deadline("get", identifier, async {
            self.store
                .get_opt(identifier)
                .await
                .context(GetRequestSnafu { name: identifier })
        })
        .await?;
        if direct.is_some() {
            return Ok(identifier.to_owned());
        }

        let mut candidates: Vec<String> = self
            .list()
            .await?
            .into_iter()
            .filter(|request| request.source().is_some_and(|source| source.name == identifier))
            .filter_map(|request| request.metadata.name)
            .collect();

        let name = match candidates.len() {
            0 => {
                return RequestNotFoundSnafu {
                    identifier,
                    namespace: &self.namespace,
                }
                .fail();
            }
            1 => candidates.remove(0),
            _ => {
                candidates.sort();
                return AmbiguousIdentifierSnafu {
                    identifier,
                    candidates: candidates.join(", "),
                }
                .fail();
            }
        };

        debug!(identifier, %name, "resolved request by source name");
        Ok(name)
    }

    /// All requests in the admin namespace.
    pub async fn list(&self) -> Result<Vec<NonAdminBackupStorageLocationRequest>> {
        with_deadline("list", &self.namespace, async {
            self.store.list(None).await.context(ListRequestsSnafu {
                namespace: &self.namespace,
            })
        })
        .await
    }

    /// Resolves `identifier` and returns the request.
    pub async fn get(&self, identifier: &str) -> Result<NonAdminBackupStorageLocationRequest> {
        let name = self.resolve_request_name(identifier).await?;
        self.fetch(&name).await
    }

    /// Stores `decision` on the request `name`.
    ///
    /// A non-empty `reason` is stored in the annotation of the decision.
    /// Repeating the stored decision writes nothing, unless a new reason is
    /// given. Concurrent updates fail with a conflict and are not retried.
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn set_decision(
        &self,
        name: &str,
        decision: Decision,
        reason: &str,
    ) -> Result<DecisionOutcome> {
        let mut request = self.fetch(name).await?;
        let reason = reason.trim();
        let already_decided = request.decision() == decision.stored();

        if already_decided && reason.is_empty() {
            info!(name, %decision, "request already in the requested state");
            return Ok(DecisionOutcome::AlreadyInState);
        }

        if !already_decided {
            request.spec.approval_decision = Some(decision.stored());
        }
        if !reason.is_empty() {
            request
                .metadata
                .annotations
                .get_or_insert_with(Default::default)
                .insert(decision.reason_annotation().to_owned(), reason.to_owned());
        }

        with_deadline("update", name, async {
            self.store
                .replace(name, &request)
                .await
                .context(UpdateRequestSnafu { name, decision })
        })
        .await?;

        if already_decided {
            info!(name, %decision, "updated decision reason");
            Ok(DecisionOutcome::ReasonUpdated)
        } else {
            info!(name, %decision, "stored decision");
            Ok(DecisionOutcome::Applied)
        }
    }

    async fn fetch(&self, name: &str) -> Result<NonAdminBackupStorageLocationRequest> {
        with_deadline("get", name, async {
            self.store.get_opt(name).await.context(GetRequestSnafu { name })
        })
        .await?
        .context(RequestNotFoundSnafu {
            identifier: name,
            namespace: &self.namespace,
        })
    }
}
