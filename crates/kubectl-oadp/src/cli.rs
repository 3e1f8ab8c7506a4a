use clap::{Args, Parser, Subcommand};
use oadp_client::client::KubeconfigOptions;
use oadp_telemetry::tracing::TelemetryOptions;

use crate::commands::{
    backup::BackupCommand, client_config::ClientCommand, nabsl_request::RequestCommand,
    nonadmin::NonAdminCommand, restore::RestoreCommand, version::VersionArgs,
};

/// Manage OADP backups and restores.
///
/// Admin commands work on the Velero objects in the OADP namespace. The
/// `nonadmin` commands work in the namespace of the current kubeconfig context
/// and need no cluster wide permissions.
#[derive(Debug, Parser)]
#[command(name = "kubectl-oadp", bin_name = "kubectl oadp", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    // IMPORTANT: All (flattened) sub structs should be placed at the end to ensure the help
    // headings are correct.
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(flatten)]
    pub telemetry: TelemetryOptions,
}

/// Options every command understands.
#[derive(Args, Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    /// Namespace of the OADP installation. Defaults to the client config, then
    /// `openshift-adp`.
    #[arg(short = 'n', long, value_name = "NAMESPACE", global = true)]
    pub namespace: Option<String>,

    #[command(flatten)]
    pub kubeconfig: KubeconfigOptions,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Work with Velero backups.
    #[command(subcommand)]
    Backup(BackupCommand),

    /// Work with Velero restores.
    #[command(subcommand)]
    Restore(RestoreCommand),

    /// Print the client and server versions.
    Version(VersionArgs),

    /// Work with backups, restores and storage locations in your own namespace.
    #[command(subcommand, alias = "na")]
    Nonadmin(NonAdminCommand),

    /// Review storage location requests of non-admin users.
    #[command(subcommand, name = "nabsl-request")]
    NabslRequest(RequestCommand),

    /// Work with the client configuration.
    #[command(subcommand)]
    Client(ClientCommand),
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use rstest::rstest;

    use super::*;
    use crate::commands::nonadmin::{NonAdminCommand, backup::NonAdminBackupCommand};

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(&["kubectl-oadp", "nonadmin", "backup", "get"])]
    #[case(&["kubectl-oadp", "nonadmin", "b", "get"])]
    #[case(&["kubectl-oadp", "na", "b", "get"])]
    fn nonadmin_backup_alias(#[case] args: &[&str]) {
        let cli = Cli::try_parse_from(args).unwrap();

        assert!(matches!(
            cli.command,
            Command::Nonadmin(NonAdminCommand::Backup(NonAdminBackupCommand::Get(_)))
        ));
    }

    #[test]
    fn namespace_is_global() {
        let cli =
            Cli::try_parse_from(["kubectl-oadp", "backup", "get", "-n", "velero"]).unwrap();

        assert_eq!(cli.global.namespace.as_deref(), Some("velero"));
    }

    #[test]
    fn verbosity_after_the_subcommand() {
        let cli = Cli::try_parse_from(["kubectl-oadp", "version", "-vv"]).unwrap();

        assert_eq!(cli.telemetry.verbose, 2);
    }

    #[test]
    fn restore_needs_a_source_flag_value() {
        assert!(Cli::try_parse_from(["kubectl-oadp", "restore", "create", "--from-backup"]).is_err());
    }

    #[test]
    fn approve_takes_a_reason() {
        let cli = Cli::try_parse_from([
            "kubectl-oadp",
            "nabsl-request",
            "approve",
            "aws-bsl",
            "--reason",
            "bucket is owned by team a",
        ])
        .unwrap();

        let Command::NabslRequest(RequestCommand::Approve(args)) = cli.command else {
            panic!("expected nabsl-request approve");
        };
        assert_eq!(args.name, "aws-bsl");
        assert_eq!(args.reason, "bucket is owned by team a");
    }

    #[test]
    fn nonadmin_restore_needs_a_backup() {
        assert!(Cli::try_parse_from(["kubectl-oadp", "nonadmin", "restore", "create", "shop"]).is_err());
        assert!(
            Cli::try_parse_from([
                "kubectl-oadp",
                "nonadmin",
                "restore",
                "create",
                "shop",
                "--from-backup",
                "nightly"
            ])
            .is_ok()
        );
    }
}
