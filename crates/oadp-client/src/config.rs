//! The client configuration file shared with the `velero` CLI.
//!
//! It lives at `$XDG_CONFIG_HOME/velero/config.json`, or
//! `$HOME/.config/velero/config.json` if `XDG_CONFIG_HOME` is not set. Keys
//! this plugin doesn't know are kept as they are when the file is written.

use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt, Snafu};
use strum::IntoEnumIterator;
use tracing::debug;

const CONFIG_DIR: &str = "velero";
const CONFIG_FILE: &str = "config.json";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("cannot locate the config directory, neither XDG_CONFIG_HOME nor HOME is set"))]
    LocateConfigDir,

    #[snafu(display("failed to read client config from {path:?}"))]
    ReadConfig {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse client config {path:?}"))]
    ParseConfig {
        source: serde_json::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to serialize client config"))]
    SerializeConfig { source: serde_json::Error },

    #[snafu(display("failed to create config directory {path:?}"))]
    CreateConfigDir {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to write client config to {path:?}"))]
    WriteConfig {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("unknown config key {key:?}, valid keys are: {valid}"))]
    UnknownKey { key: String, valid: String },

    #[snafu(display("expected KEY=VALUE, got {input:?}"))]
    InvalidAssignment { input: String },
}

/// The keys `client config set` accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumIter, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ConfigKey {
    /// Namespace of the OADP installation, used by the admin commands.
    Namespace,
}

impl ConfigKey {
    /// Parses a key, naming the valid keys on failure.
    pub fn parse(key: &str) -> Result<Self> {
        Self::from_str(key).ok().context(UnknownKeySnafu {
            key,
            valid: Self::iter()
                .map(|key| key.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// Contents of the client config file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

impl ClientConfig {
    /// Reads the config at `path`. A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(?path, "no client config file, using defaults");
                return Ok(Self::default());
            }
            Err(error) => return Err(error).context(ReadConfigSnafu { path }),
        };

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&contents).context(ParseConfigSnafu { path })
    }

    /// Writes the config to `path`, creating the parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context(CreateConfigDirSnafu { path: parent })?;
        }

        let contents = serde_json::to_string_pretty(self).context(SerializeConfigSnafu)?;
        fs::write(path, contents).context(WriteConfigSnafu { path })
    }

    pub fn get(&self, key: ConfigKey) -> Option<&str> {
        match key {
            ConfigKey::Namespace => self.namespace.as_deref(),
        }
    }

    /// Sets `key` to `value`. An empty value removes the key.
    pub fn set(&mut self, key: ConfigKey, value: &str) {
        let value = (!value.is_empty()).then(|| value.to_owned());
        match key {
            ConfigKey::Namespace => self.namespace = value,
        }
    }

    /// Applies a `KEY=VALUE` assignment as given to `client config set`.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<ConfigKey> {
        let (key, value) = assignment
            .split_once('=')
            .context(InvalidAssignmentSnafu { input: assignment })?;
        let key = ConfigKey::parse(key.trim())?;
        self.set(key, value.trim());
        Ok(key)
    }

    /// All known keys with their values, unset keys included.
    pub fn entries(&self) -> Vec<(ConfigKey, Option<&str>)> {
        ConfigKey::iter().map(|key| (key, self.get(key))).collect()
    }
}

/// Location of the config file for the current user.
pub fn default_path() -> Result<PathBuf> {
    path_from(
        std::env::var_os("XDG_CONFIG_HOME"),
        std::env::var_os("HOME"),
    )
}

fn path_from(xdg_config_home: Option<OsString>, home: Option<OsString>) -> Result<PathBuf> {
    let config_home = match (xdg_config_home, home) {
        (Some(xdg), _) if !xdg.is_empty() => PathBuf::from(xdg),
        (_, Some(home)) if !home.is_empty() => PathBuf::from(home).join(".config"),
        _ => return LocateConfigDirSnafu.fail(),
    };

    Ok(config_home.join(CONFIG_DIR).join(CONFIG_FILE))
}
