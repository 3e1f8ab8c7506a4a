//! Finds the data movement and pod volume objects belonging to a backup or
//! restore.
//!
//! Velero labels these objects with the name of their backup or restore, but
//! older objects or other data movers may only carry an annotation or the name
//! in their own name. The matchers are tried in order, any match counts.

use kube::Resource;

/// Label and annotation key naming the backup of an object.
pub const BACKUP_NAME_KEY: &str = "velero.io/backup-name";

/// Label and annotation key naming the restore of an object.
pub const RESTORE_NAME_KEY: &str = "velero.io/restore-name";

/// A single correlation heuristic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchRule {
    /// The label `key` equals the name.
    Label(&'static str),

    /// The annotation `key` equals the name.
    Annotation(&'static str),

    /// The object name contains the name. This also matches `nightly-2` when
    /// looking for `nightly`.
    NameContains,
}

impl MatchRule {
    pub fn matches<K: Resource>(self, object: &K, name: &str) -> bool {
        let meta = object.meta();
        match self {
            Self::Label(key) => meta
                .labels
                .as_ref()
                .and_then(|labels| labels.get(key))
                .is_some_and(|value| value == name),
            Self::Annotation(key) => meta
                .annotations
                .as_ref()
                .and_then(|annotations| annotations.get(key))
                .is_some_and(|value| value == name),
            Self::NameContains => meta
                .name
                .as_deref()
                .is_some_and(|object_name| object_name.contains(name)),
        }
    }
}

/// Matchers for objects created for the backup of the given name.
pub const BACKUP_RULES: [MatchRule; 3] = [
    MatchRule::Label(BACKUP_NAME_KEY),
    MatchRule::Annotation(BACKUP_NAME_KEY),
    MatchRule::NameContains,
];

/// Matchers for objects created for the restore of the given name.
pub const RESTORE_RULES: [MatchRule; 3] = [
    MatchRule::Label(RESTORE_NAME_KEY),
    MatchRule::Annotation(RESTORE_NAME_KEY),
    MatchRule::NameContains,
];

/// Returns `true` if any of the rules matches.
pub fn belongs_to<K: Resource>(object: &K, name: &str, rules: &[MatchRule]) -> bool {
    rules.iter().any(|rule| rule.matches(object, name))
}
