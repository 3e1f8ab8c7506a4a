//! Builders of the non-admin resources, created in the namespace of the user.

use super::{MetadataFlags, ObjectMetaBuilder};
use crate::crd::{
    nonadmin::{
        NonAdminBackup, NonAdminBackupSpec, NonAdminBackupStorageLocation,
        NonAdminBackupStorageLocationSpec, NonAdminRestore, NonAdminRestoreSpec,
    },
    velero::{BackupSpec, BackupStorageLocationSpec, RestoreSpec},
};

pub fn non_admin_backup(
    name: &str,
    namespace: &str,
    metadata: &MetadataFlags,
    backup_spec: BackupSpec,
) -> NonAdminBackup {
    NonAdminBackup {
        metadata: ObjectMetaBuilder::new()
            .name(name)
            .namespace(namespace)
            .with_metadata_flags(metadata)
            .build(),
        spec: NonAdminBackupSpec {
            backup_spec: Some(backup_spec),
            delete_backup: None,
        },
        status: None,
    }
}

pub fn non_admin_restore(
    name: &str,
    namespace: &str,
    metadata: &MetadataFlags,
    restore_spec: RestoreSpec,
) -> NonAdminRestore {
    NonAdminRestore {
        metadata: ObjectMetaBuilder::new()
            .name(name)
            .namespace(namespace)
            .with_metadata_flags(metadata)
            .build(),
        spec: NonAdminRestoreSpec { restore_spec },
        status: None,
    }
}

pub fn non_admin_backup_storage_location(
    name: &str,
    namespace: &str,
    backup_storage_location_spec: BackupStorageLocationSpec,
) -> NonAdminBackupStorageLocation {
    NonAdminBackupStorageLocation {
        metadata: ObjectMetaBuilder::new()
            .name(name)
            .namespace(namespace)
            .build(),
        spec: NonAdminBackupStorageLocationSpec {
            backup_storage_location_spec,
        },
        status: None,
    }
}

/// Merge patch asking the controller to delete a non-admin backup together
/// with the Velero backup and its data.
pub fn delete_backup_patch() -> serde_json::Value {
    serde_json::json!({ "spec": { "deleteBackup": true } })
}
