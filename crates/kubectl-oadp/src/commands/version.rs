//! `kubectl oadp version`.

use clap::Args;
use kube::Api;
use oadp_client::{
    crd::velero::{ServerStatus, ServerStatusRequest},
    describe::table::Table,
    server_status::{self, fetch_server_status},
};
use snafu::{ResultExt, Snafu};

use super::Session;
use crate::cli::GlobalOptions;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(transparent)]
    Session { source: super::SessionError },

    #[snafu(display("failed to get the Velero server version"))]
    ServerStatus { source: server_status::Error },
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Only print the plugin version, don't contact the cluster.
    #[arg(long)]
    pub client_only: bool,
}

pub async fn run(args: &VersionArgs, global: &GlobalOptions) -> Result<(), Error> {
    println!("Client:");
    println!("\tVersion: {}", env!("CARGO_PKG_VERSION"));

    if args.client_only {
        return Ok(());
    }

    let session = Session::connect(global).await?;
    let api: Api<ServerStatusRequest> = session.admin_api();
    let status = fetch_server_status(api, &session.context.admin_namespace)
        .await
        .context(ServerStatusSnafu)?;
    print!("{}", render_server_status(&status));
    Ok(())
}

fn render_server_status(status: &ServerStatus) -> String {
    let mut plugins = Table::new(["NAME", "KIND"]);
    for plugin in &status.plugins {
        plugins.row([plugin.name.as_str(), plugin.kind.as_str()]);
    }

    let mut out = format!("\nServer:\n\tVersion: {}\n", status.server_version);
    if !plugins.is_empty() {
        out.push_str("\nPlugins:\n");
        out.push_str(&plugins.render());
    }
    out
}

#[cfg(test)]
mod tests {
    use oadp_client::crd::velero::PluginInfo;

    use super::*;

    #[test]
    fn server_version_with_plugins() {
        let status = ServerStatus {
            server_version: "v1.14.0".to_owned(),
            plugins: vec![
                PluginInfo {
                    name: "velero.io/aws".to_owned(),
                    kind: "ObjectStore".to_owned(),
                },
                PluginInfo {
                    name: "velero.io/pod".to_owned(),
                    kind: "BackupItemAction".to_owned(),
                },
            ],
        };

        assert_eq!(
            render_server_status(&status),
            concat!(
                "\nServer:\n",
                "\tVersion: v1.14.0\n",
                "\nPlugins:\n",
                "NAME            KIND\n",
                "velero.io/aws   ObjectStore\n",
                "velero.io/pod   BackupItemAction\n",
            )
        );
    }

    #[test]
    fn server_version_without_plugins() {
        let status = ServerStatus {
            server_version: "v1.14.0".to_owned(),
            plugins: Vec::new(),
        };

        assert_eq!(
            render_server_status(&status),
            "\nServer:\n\tVersion: v1.14.0\n"
        );
    }
}
