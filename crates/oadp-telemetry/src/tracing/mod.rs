//! Subscriber setup for the plugin: console logs on stderr and optional
//! rolling JSON log files.
//!
//! | Subscriber | Level variable          | Default level             |
//! | ---------- | ----------------------- | ------------------------- |
//! | Console    | `KUBECTL_OADP_LOG`      | WARN, raised by `-v`      |
//! | File       | `KUBECTL_OADP_FILE_LOG` | DEBUG                     |

use std::path::PathBuf;

use snafu::{ResultExt as _, Snafu};
use tracing::{level_filters::LevelFilter, subscriber::SetGlobalDefaultError};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{InitError, RollingFileAppender},
};
use tracing_subscriber::{Layer, Registry, layer::SubscriberExt};

pub use crate::tracing::settings::*;

pub mod settings;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to create the log file in {directory:?}"))]
    InitRollingFileAppender {
        source: InitError,
        directory: PathBuf,
    },

    #[snafu(display("unable to set the global default subscriber"))]
    SetGlobalDefaultSubscriber { source: SetGlobalDefaultError },
}

/// The subscribers of one plugin run.
///
/// ```no_run
/// # use oadp_telemetry::tracing::{Tracing, TelemetryOptions};
/// let _tracing_guard = Tracing::from_options("kubectl-oadp", TelemetryOptions::default())
///     .init()
///     .unwrap();
/// tracing::info!("visible with -v");
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct Tracing {
    app_name: &'static str,
    console: Option<ConsoleLogSettings>,
    file: Option<FileLogSettings>,
}

/// Flushes buffered file log events when dropped. Keep it alive until the
/// command has finished, `let _ = ...` drops it immediately.
#[must_use = "dropping the guard stops file logging"]
pub struct TracingGuard {
    _file_writer: Option<WorkerGuard>,
}

impl Tracing {
    pub const CONSOLE_LOG_LEVEL: &str = "KUBECTL_OADP_LOG";
    pub const FILE_LOG_LEVEL: &str = "KUBECTL_OADP_FILE_LOG";
    pub const FILE_LOG_SUFFIX: &str = "log.json";

    pub fn from_options(app_name: &'static str, options: TelemetryOptions) -> Self {
        let TelemetryOptions {
            verbose,
            log_format,
            console_log_disabled,
            file_log_directory,
            file_log_rotation_period,
        } = options;

        let console = (!console_log_disabled).then(|| ConsoleLogSettings {
            level: LevelSettings::new(
                Self::CONSOLE_LOG_LEVEL,
                raise_level(LevelFilter::WARN, verbose),
            ),
            format: log_format,
        });
        let file = file_log_directory.map(|directory| FileLogSettings {
            level: LevelSettings::new(Self::FILE_LOG_LEVEL, LevelFilter::DEBUG),
            directory,
            rotation: file_log_rotation_period.unwrap_or_default().into(),
        });

        Self {
            app_name,
            console,
            file,
        }
    }

    /// Installs the configured subscribers as the global default.
    pub fn init(self) -> Result<TracingGuard> {
        let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
        let mut file_writer = None;

        if let Some(console) = &self.console {
            let filter = console.level.env_filter();
            let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            layers.push(match console.format {
                ConsoleFormat::Plain => layer.with_filter(filter).boxed(),
                ConsoleFormat::Json => layer.json().with_filter(filter).boxed(),
            });
        }

        if let Some(file) = &self.file {
            let appender = RollingFileAppender::builder()
                .rotation(file.rotation.clone())
                .filename_prefix(self.app_name)
                .filename_suffix(Self::FILE_LOG_SUFFIX)
                .build(&file.directory)
                .context(InitRollingFileAppenderSnafu {
                    directory: &file.directory,
                })?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            file_writer = Some(guard);

            layers.push(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(file.level.env_filter())
                    .boxed(),
            );
        }

        if !layers.is_empty() {
            tracing::subscriber::set_global_default(tracing_subscriber::registry().with(layers))
                .context(SetGlobalDefaultSubscriberSnafu)?;
        }

        Ok(TracingGuard {
            _file_writer: file_writer,
        })
    }
}

/// Logging options, flattened into the root command of the plugin.
#[cfg_attr(feature = "clap", derive(clap::Args))]
#[cfg_attr(feature = "clap", command(next_help_heading = "Logging Options"))]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TelemetryOptions {
    /// Log more on stderr, repeat for more detail (-v info, -vv debug, -vvv trace).
    #[cfg_attr(feature = "clap", arg(short, long, action = clap::ArgAction::Count, global = true))]
    pub verbose: u8,

    /// Format of the logs on stderr.
    #[cfg_attr(
        feature = "clap",
        arg(long, value_enum, default_value_t, env = "KUBECTL_OADP_LOG_FORMAT", global = true)
    )]
    pub log_format: ConsoleFormat,

    /// Disable logs on stderr.
    #[cfg_attr(feature = "clap", arg(long, env = "KUBECTL_OADP_CONSOLE_LOG_DISABLED", global = true))]
    pub console_log_disabled: bool,

    /// Also write JSON logs to files in DIRECTORY.
    #[cfg_attr(
        feature = "clap",
        arg(
            long,
            env = "KUBECTL_OADP_FILE_LOG_DIRECTORY",
            value_name = "DIRECTORY",
            global = true
        )
    )]
    pub file_log_directory: Option<PathBuf>,

    /// How often a new log file is started.
    #[cfg_attr(
        feature = "clap",
        arg(
            long,
            value_enum,
            env = "KUBECTL_OADP_FILE_LOG_ROTATION_PERIOD",
            value_name = "PERIOD",
            global = true
        )
    )]
    pub file_log_rotation_period: Option<RotationPeriod>,
}

#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RotationPeriod {
    Hourly,
    Daily,

    /// One file per plugin run.
    #[default]
    Never,
}

impl From<RotationPeriod> for Rotation {
    fn from(value: RotationPeriod) -> Self {
        match value {
            RotationPeriod::Hourly => Self::HOURLY,
            RotationPeriod::Daily => Self::DAILY,
            RotationPeriod::Never => Self::NEVER,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults_log_warnings_to_the_console_only() {
        let tracing = Tracing::from_options("kubectl-oadp", TelemetryOptions::default());

        assert_eq!(
            tracing.console,
            Some(ConsoleLogSettings {
                level: LevelSettings::new(Tracing::CONSOLE_LOG_LEVEL, LevelFilter::WARN),
                format: ConsoleFormat::Plain,
            })
        );
        assert_eq!(tracing.file, None);
    }

    #[test]
    fn verbose_json_console() {
        let tracing = Tracing::from_options("kubectl-oadp", TelemetryOptions {
            verbose: 2,
            log_format: ConsoleFormat::Json,
            ..TelemetryOptions::default()
        });

        let console = tracing.console.unwrap();
        assert_eq!(console.level.default_level, LevelFilter::DEBUG);
        assert_eq!(console.format, ConsoleFormat::Json);
    }

    #[test]
    fn file_log_only() {
        let tracing = Tracing::from_options("kubectl-oadp", TelemetryOptions {
            console_log_disabled: true,
            file_log_directory: Some(PathBuf::from("/tmp/oadp-logs")),
            file_log_rotation_period: Some(RotationPeriod::Daily),
            ..TelemetryOptions::default()
        });

        assert_eq!(tracing.console, None);
        assert_eq!(
            tracing.file,
            Some(FileLogSettings {
                level: LevelSettings::new(Tracing::FILE_LOG_LEVEL, LevelFilter::DEBUG),
                directory: PathBuf::from("/tmp/oadp-logs"),
                rotation: Rotation::DAILY,
            })
        );
    }

    #[rstest]
    #[case(RotationPeriod::Hourly, Rotation::HOURLY)]
    #[case(RotationPeriod::Daily, Rotation::DAILY)]
    #[case(RotationPeriod::Never, Rotation::NEVER)]
    fn rotation_period_maps(#[case] period: RotationPeriod, #[case] expected: Rotation) {
        assert_eq!(Rotation::from(period), expected);
    }
}
