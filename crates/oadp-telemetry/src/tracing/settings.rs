//! Per-subscriber settings.

use std::path::PathBuf;

pub use tracing_appender::rolling::Rotation;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Level filter of one subscriber: an environment variable that overrides a
/// default level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelSettings {
    /// Variable holding an `EnvFilter` directive, like `kube=debug,info`.
    pub environment_variable: &'static str,

    /// Used when [`Self::environment_variable`] is unset or unparsable.
    pub default_level: LevelFilter,
}

impl LevelSettings {
    pub fn new(environment_variable: &'static str, default_level: LevelFilter) -> Self {
        Self {
            environment_variable,
            default_level,
        }
    }

    pub(crate) fn env_filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_env_var(self.environment_variable)
            .with_default_directive(self.default_level.into())
            .from_env_lossy()
    }
}

/// Rendering of console log events.
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ConsoleFormat {
    /// Human readable lines. Set `NO_COLOR` to turn off ANSI colors.
    #[default]
    Plain,

    /// One JSON object per event.
    Json,
}

/// The subscriber writing to stderr. Stdout carries command output only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsoleLogSettings {
    pub level: LevelSettings,
    pub format: ConsoleFormat,
}

/// The subscriber writing JSON lines into a directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileLogSettings {
    pub level: LevelSettings,
    pub directory: PathBuf,
    pub rotation: Rotation,
}

/// Maps the number of `-v` flags onto the console default level, starting
/// from `base`.
pub fn raise_level(base: LevelFilter, verbosity: u8) -> LevelFilter {
    const LADDER: [LevelFilter; 6] = [
        LevelFilter::OFF,
        LevelFilter::ERROR,
        LevelFilter::WARN,
        LevelFilter::INFO,
        LevelFilter::DEBUG,
        LevelFilter::TRACE,
    ];

    let start = LADDER
        .iter()
        .position(|level| *level == base)
        .unwrap_or_default();
    LADDER[(start + usize::from(verbosity)).min(LADDER.len() - 1)]
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, LevelFilter::WARN)]
    #[case(1, LevelFilter::INFO)]
    #[case(2, LevelFilter::DEBUG)]
    #[case(3, LevelFilter::TRACE)]
    #[case(9, LevelFilter::TRACE)]
    fn verbosity_raises_from_warn(#[case] verbosity: u8, #[case] expected: LevelFilter) {
        assert_eq!(raise_level(LevelFilter::WARN, verbosity), expected);
    }

    #[test]
    fn format_parses_lowercase() {
        assert_eq!("json".parse::<ConsoleFormat>().unwrap(), ConsoleFormat::Json);
        assert_eq!(ConsoleFormat::Plain.to_string(), "plain");
    }
}
