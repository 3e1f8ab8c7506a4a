use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The artifacts a download request can point at. The serialized names are
/// the ones the Velero API expects.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Hash,
    JsonSchema,
    PartialEq,
    Eq,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
pub enum DownloadTargetKind {
    BackupLog,
    BackupContents,
    BackupVolumeSnapshots,
    BackupItemOperations,
    BackupResourceList,
    BackupResults,
    BackupVolumeInfos,
    RestoreLog,
    RestoreResults,
    RestoreResourceList,
    RestoreItemOperations,
    RestoreVolumeInfo,

    #[serde(rename = "CSIBackupVolumeSnapshots")]
    #[strum(serialize = "CSIBackupVolumeSnapshots")]
    CsiBackupVolumeSnapshots,

    #[serde(rename = "CSIBackupVolumeSnapshotContents")]
    #[strum(serialize = "CSIBackupVolumeSnapshotContents")]
    CsiBackupVolumeSnapshotContents,
}

/// How long and how often a download request of some kind is polled, and how
/// its content is encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DownloadPolicy {
    /// Deadline for the request to reach a terminal state.
    pub timeout: Duration,

    /// Time between two status reads.
    pub interval: Duration,

    /// The content is gzip compressed even if the response doesn't say so.
    pub assume_gzip: bool,
}

impl DownloadPolicy {
    pub const DEFAULT: Self = Self {
        timeout: Duration::from_secs(10),
        interval: Duration::from_secs(1),
        assume_gzip: true,
    };

    pub const LOGS: Self = Self {
        timeout: Duration::from_secs(120),
        interval: Duration::from_secs(2),
        assume_gzip: true,
    };

    /// Backup contents are a tarball and never decoded as text.
    pub const CONTENTS: Self = Self {
        assume_gzip: false,
        ..Self::DEFAULT
    };
}

impl DownloadTargetKind {
    pub fn policy(self) -> DownloadPolicy {
        match self {
            Self::BackupLog | Self::RestoreLog => DownloadPolicy::LOGS,
            Self::BackupContents => DownloadPolicy::CONTENTS,
            _ => DownloadPolicy::DEFAULT,
        }
    }

    /// Lowercase form used in generated request names.
    pub fn name_fragment(self) -> String {
        self.to_string().to_ascii_lowercase()
    }

    /// Human readable section title used by `describe`.
    pub fn section_title(self) -> &'static str {
        match self {
            Self::BackupLog | Self::RestoreLog => "Logs",
            Self::BackupContents => "Contents",
            Self::BackupVolumeSnapshots => "Native Volume Snapshots",
            Self::BackupItemOperations | Self::RestoreItemOperations => "Item Operations",
            Self::BackupResourceList | Self::RestoreResourceList => "Resource List",
            Self::BackupResults | Self::RestoreResults => "Results",
            Self::BackupVolumeInfos | Self::RestoreVolumeInfo => "Volume Info",
            Self::CsiBackupVolumeSnapshots => "CSI Volume Snapshots",
            Self::CsiBackupVolumeSnapshotContents => "CSI Volume Snapshot Contents",
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;

    #[rstest]
    #[case(DownloadTargetKind::BackupLog, "backuplog")]
    #[case(DownloadTargetKind::RestoreResults, "restoreresults")]
    #[case(DownloadTargetKind::CsiBackupVolumeSnapshots, "csibackupvolumesnapshots")]
    fn name_fragment_is_lowercase_kind(#[case] kind: DownloadTargetKind, #[case] expected: &str) {
        assert_eq!(kind.name_fragment(), expected);
    }

    #[test]
    fn logs_wait_longer() {
        for kind in DownloadTargetKind::iter() {
            let policy = kind.policy();
            match kind {
                DownloadTargetKind::BackupLog | DownloadTargetKind::RestoreLog => {
                    assert_eq!(policy.timeout, Duration::from_secs(120));
                    assert_eq!(policy.interval, Duration::from_secs(2));
                    assert!(policy.assume_gzip);
                }
                _ => {
                    assert_eq!(policy.timeout, Duration::from_secs(10));
                    assert_eq!(policy.interval, Duration::from_secs(1));
                }
            }
        }
    }

    #[test]
    fn serializes_velero_names() {
        assert_eq!(
            serde_json::to_string(&DownloadTargetKind::CsiBackupVolumeSnapshotContents).unwrap(),
            r#""CSIBackupVolumeSnapshotContents""#
        );
        assert_eq!(
            "BackupResults".parse::<DownloadTargetKind>().unwrap(),
            DownloadTargetKind::BackupResults
        );
    }
}
