//! Builders turning command line flags into Velero and non-admin resources.
//!
//! Building never talks to the cluster. The only errors are flag combinations
//! the Velero API rejects, everything else is caught while parsing the flags.
//! Optional booleans that were not given stay unset, so the server default
//! applies.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use snafu::{Snafu, ensure};

pub mod backup;
pub mod bsl;
pub mod flags;
pub mod meta;
pub mod nonadmin;
pub mod restore;
pub mod selector;

pub use meta::{MetadataFlags, ObjectMetaBuilder};
pub use selector::{LabelSelectorExt, OrSelector, Selector, display_selector};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Snafu)]
pub enum Error {
    #[snafu(display(
        "{old_flag} cannot be combined with {new_flag}, use either the old or the new resource filters"
    ))]
    MixedResourceFilters {
        old_flag: &'static str,
        new_flag: &'static str,
    },

    #[snafu(display("--selector and --or-selector cannot be used together"))]
    ConflictingSelectors,

    #[snafu(display("either --from-backup or --from-schedule must be set"))]
    MissingRestoreSource,

    #[snafu(display("--from-backup and --from-schedule cannot be used together"))]
    ConflictingRestoreSources,

    #[snafu(display("--allow-partially-failed can only be used with --from-schedule"))]
    PartiallyFailedWithoutSchedule,
}

/// `--include-namespaces` and `--exclude-namespaces`. Only admins can choose
/// the namespaces, non-admin objects are bound to their own namespace.
#[derive(clap::Args, Clone, Debug, Default, PartialEq, Eq)]
pub struct NamespaceFilterFlags {
    /// Namespaces to include, comma separated. `*` means all namespaces.
    #[arg(long, value_delimiter = ',', value_name = "NAMESPACES")]
    pub include_namespaces: Vec<String>,

    /// Namespaces to exclude, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "NAMESPACES")]
    pub exclude_namespaces: Vec<String>,
}

/// `--selector` and `--or-selector`, which exclude each other.
#[derive(clap::Args, Clone, Debug, Default, PartialEq)]
pub struct SelectorFlags {
    /// Only handle resources matching this label selector.
    #[arg(long, short = 'l', value_name = "SELECTOR")]
    pub selector: Option<Selector>,

    /// Handle resources matching any of these label selectors, separated by
    /// ` or ` (for example `app=a or app=b`).
    #[arg(long, value_name = "SELECTORS")]
    pub or_selector: Option<OrSelector>,
}

impl SelectorFlags {
    /// Returns the label selector and the or-selectors.
    pub fn build(&self) -> Result<(Option<LabelSelector>, Vec<LabelSelector>)> {
        ensure!(
            self.selector.is_none() || self.or_selector.is_none(),
            ConflictingSelectorsSnafu
        );

        Ok((
            self.selector.clone().map(|Selector(selector)| selector),
            self.or_selector
                .clone()
                .map(|OrSelector(selectors)| selectors)
                .unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_and_or_selector_exclude_each_other() {
        let flags = SelectorFlags {
            selector: Some("app=a".parse().unwrap()),
            or_selector: Some("app=b or app=c".parse().unwrap()),
        };
        assert_eq!(flags.build().unwrap_err(), Error::ConflictingSelectors);

        let flags = SelectorFlags {
            or_selector: Some("app=b or app=c".parse().unwrap()),
            ..SelectorFlags::default()
        };
        let (selector, or_selectors) = flags.build().unwrap();
        assert_eq!(selector, None);
        assert_eq!(or_selectors.len(), 2);
    }
}
