//! `kubectl oadp client config`, the local client config file.

use std::path::Path;

use clap::{Args, Subcommand};
use oadp_client::config::{self, ClientConfig, ConfigKey};
use snafu::{ResultExt, Snafu};
use tracing::info;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read the client config"))]
    Load { source: config::Error },

    #[snafu(display("invalid config key"))]
    Key { source: config::Error },

    #[snafu(display("failed to save the client config"))]
    Save { source: config::Error },
}

#[derive(Debug, Subcommand)]
pub enum ClientCommand {
    /// Show or change the client config.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the value of a key, or of all keys.
    Get(GetArgs),

    /// Set a key, as `KEY=VALUE`. An empty value removes the key.
    Set(SetArgs),
}

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Key to print.
    pub key: Option<String>,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Assignment like `namespace=openshift-adp`.
    #[arg(value_name = "KEY=VALUE")]
    pub assignment: String,
}

pub fn run(command: ClientCommand) -> Result<()> {
    let path = config::default_path().context(LoadSnafu)?;
    let ClientCommand::Config(command) = command;

    match command {
        ConfigCommand::Get(args) => {
            let config = ClientConfig::load(&path).context(LoadSnafu)?;
            print!("{}", render_get(&config, args.key.as_deref())?);
            Ok(())
        }
        ConfigCommand::Set(args) => set(&path, &args.assignment),
    }
}

fn render_get(config: &ClientConfig, key: Option<&str>) -> Result<String> {
    let entries = match key {
        Some(key) => {
            let key = ConfigKey::parse(key).context(KeySnafu)?;
            vec![(key, config.get(key))]
        }
        None => config.entries(),
    };

    Ok(entries
        .into_iter()
        .map(|(key, value)| format!("{key}: {}\n", value.unwrap_or("<NOT SET>")))
        .collect())
}

fn set(path: &Path, assignment: &str) -> Result<()> {
    let mut config = ClientConfig::load(path).context(LoadSnafu)?;
    let key = config.apply_assignment(assignment).context(KeySnafu)?;
    config.save(path).context(SaveSnafu)?;
    info!(%key, ?path, "updated client config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_prints_unset_keys() {
        let config = ClientConfig::default();

        assert_eq!(render_get(&config, None).unwrap(), "namespace: <NOT SET>\n");
    }

    #[test]
    fn get_single_key() {
        let config = ClientConfig {
            namespace: Some("velero".to_owned()),
            ..ClientConfig::default()
        };

        assert_eq!(
            render_get(&config, Some("namespace")).unwrap(),
            "namespace: velero\n"
        );
    }

    #[test]
    fn get_unknown_key_fails() {
        let error = render_get(&ClientConfig::default(), Some("bucket")).unwrap_err();

        assert!(matches!(error, Error::Key { .. }));
    }

    #[test]
    fn set_writes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("velero/config.json");

        set(&path, "namespace=velero").unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.get(ConfigKey::Namespace), Some("velero"));
    }
}
