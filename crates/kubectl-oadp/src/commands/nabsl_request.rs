//! `kubectl oadp nabsl-request`, approval of the storage locations requested
//! by non-admin users.
//!
//! Requests can be named by their generated name or by the name of the
//! non-admin storage location they were created for.

use clap::{Args, Subcommand};
use kube::Api;
use oadp_client::{
    approval::{self, ApprovalHelper, Decision, DecisionOutcome},
    crd::nonadmin::NonAdminBackupStorageLocationRequest,
    describe::{describe_request, table::Table},
};
use snafu::{ResultExt, Snafu};

use super::{Session, now};
use crate::output::{self, OutputFlags, print_objects, print_serialized};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read storage location requests"))]
    ReadRequests { source: approval::Error },

    #[snafu(display("failed to {decision} storage location request {identifier:?}"))]
    Decide {
        source: approval::Error,
        identifier: String,
        decision: Decision,
    },

    #[snafu(display("failed to print storage location requests"))]
    Print { source: output::Error },
}

#[derive(Debug, Subcommand)]
pub enum RequestCommand {
    /// List storage location requests.
    Get(GetArgs),

    /// Show a storage location request and the location it asks for.
    Describe(DescribeArgs),

    /// Approve a storage location request.
    Approve(DecisionArgs),

    /// Reject a storage location request.
    Reject(DecisionArgs),
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Requests to show, by request or location name. All requests if empty.
    pub names: Vec<String>,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Request or location name.
    pub name: String,

    #[command(flatten)]
    pub output: OutputFlags,
}

#[derive(Debug, Args)]
pub struct DecisionArgs {
    /// Request or location name.
    pub name: String,

    /// Why the decision was taken, stored on the request.
    #[arg(long, default_value = "")]
    pub reason: String,
}

pub async fn run(command: RequestCommand, session: &Session) -> Result<()> {
    let api: Api<NonAdminBackupStorageLocationRequest> = session.admin_api();
    let helper = ApprovalHelper::new(api, session.context.admin_namespace.clone());

    match command {
        RequestCommand::Get(args) => get(args, &helper, session).await,
        RequestCommand::Describe(args) => describe(args, &helper).await,
        RequestCommand::Approve(args) => decide(args, Decision::Approve, &helper).await,
        RequestCommand::Reject(args) => decide(args, Decision::Reject, &helper).await,
    }
}

type Helper = ApprovalHelper<Api<NonAdminBackupStorageLocationRequest>>;

async fn get(args: GetArgs, helper: &Helper, session: &Session) -> Result<()> {
    let requests = if args.names.is_empty() {
        helper.list().await.context(ReadRequestsSnafu)?
    } else {
        let mut requests = Vec::with_capacity(args.names.len());
        for name in &args.names {
            requests.push(helper.get(name).await.context(ReadRequestsSnafu)?);
        }
        requests
    };

    print_objects(
        args.output.output,
        &requests,
        &session.context.admin_namespace,
        request_table,
    )
    .context(PrintSnafu)
}

fn request_table(requests: &[NonAdminBackupStorageLocationRequest]) -> Table {
    let mut table = Table::new(["NAME", "NAMESPACE", "NABSL", "DECISION", "PHASE"]);
    for request in requests {
        let source = request.source();
        table.row([
            request.metadata.name.clone().unwrap_or_default(),
            source.map(|source| source.namespace.clone()).unwrap_or_default(),
            source.map(|source| source.name.clone()).unwrap_or_default(),
            request.decision().to_string(),
            request
                .status
                .as_ref()
                .and_then(|status| status.phase)
                .map(|phase| phase.to_string())
                .unwrap_or_default(),
        ]);
    }
    table
}

async fn describe(args: DescribeArgs, helper: &Helper) -> Result<()> {
    let request = helper.get(&args.name).await.context(ReadRequestsSnafu)?;

    if !print_serialized(args.output.output, std::slice::from_ref(&request)).context(PrintSnafu)? {
        print!("{}", describe_request(&request, now()));
    }
    Ok(())
}

async fn decide(args: DecisionArgs, decision: Decision, helper: &Helper) -> Result<()> {
    let context = DecideSnafu {
        identifier: &args.name,
        decision,
    };
    let name = helper
        .resolve_request_name(&args.name)
        .await
        .context(context)?;
    let outcome = helper
        .set_decision(&name, decision, &args.reason)
        .await
        .context(context)?;

    println!("{}", decision_message(&name, decision, outcome));
    Ok(())
}

fn decision_message(name: &str, decision: Decision, outcome: DecisionOutcome) -> String {
    let decided = decision.past_tense();
    match outcome {
        DecisionOutcome::Applied => format!("Storage location request {name:?} {decided}."),
        DecisionOutcome::ReasonUpdated => {
            format!("Storage location request {name:?} is already {decided}, updated the reason.")
        }
        DecisionOutcome::AlreadyInState => {
            format!("Storage location request {name:?} is already {decided}.")
        }
    }
}

#[cfg(test)]
mod tests {
    use oadp_client::crd::nonadmin::{
        ApprovalDecision, ApprovalPhase, NonAdminBackupStorageLocationRequestSpec,
        NonAdminBackupStorageLocationRequestStatus, SourceNonAdminBsl,
    };
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Decision::Approve, DecisionOutcome::Applied, r#"Storage location request "req-1" approved."#)]
    #[case(
        Decision::Reject,
        DecisionOutcome::AlreadyInState,
        r#"Storage location request "req-1" is already rejected."#
    )]
    #[case(
        Decision::Approve,
        DecisionOutcome::ReasonUpdated,
        r#"Storage location request "req-1" is already approved, updated the reason."#
    )]
    fn decision_messages(
        #[case] decision: Decision,
        #[case] outcome: DecisionOutcome,
        #[case] expected: &str,
    ) {
        assert_eq!(decision_message("req-1", decision, outcome), expected);
    }

    #[test]
    fn table_shows_the_source_location() {
        let mut request = NonAdminBackupStorageLocationRequest::new(
            "team-a-aws-bsl-5f0c2b8e",
            NonAdminBackupStorageLocationRequestSpec {
                approval_decision: Some(ApprovalDecision::Approve),
            },
        );
        request.status = Some(NonAdminBackupStorageLocationRequestStatus {
            phase: Some(ApprovalPhase::Approved),
            source_non_admin_bsl: Some(SourceNonAdminBsl {
                name: "aws-bsl".to_owned(),
                namespace: "team-a".to_owned(),
                ..SourceNonAdminBsl::default()
            }),
        });

        let rendered = request_table(&[request]).render();
        let row: Vec<&str> = rendered.lines().nth(1).unwrap().split_whitespace().collect();

        assert_eq!(
            row,
            ["team-a-aws-bsl-5f0c2b8e", "team-a", "aws-bsl", "approve", "Approved"]
        );
    }
}
