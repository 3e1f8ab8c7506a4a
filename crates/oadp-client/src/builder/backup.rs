use oadp_shared::time::Duration;
use snafu::ensure;

use super::{
    MetadataFlags, MixedResourceFiltersSnafu, NamespaceFilterFlags, ObjectMetaBuilder, Result,
    SelectorFlags, flags::OrderedResources,
};
use crate::{
    correlation::BACKUP_NAME_KEY,
    crd::velero::{
        Backup, BackupSpec, DeleteBackupRequest, DeleteBackupRequestSpec,
        ResourcePolicyReference, Schedule, UploaderConfigForBackup,
    },
    download::random_suffix,
};

/// Resource filters of a backup. The flags come in two families that can't be
/// mixed: the old ones (`--include-resources`, `--exclude-resources`,
/// `--include-cluster-resources`) and the scoped ones.
#[derive(clap::Args, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceFilterFlags {
    /// Resources to include, comma separated. `*` means all resources.
    #[arg(long, value_delimiter = ',', value_name = "RESOURCES")]
    pub include_resources: Vec<String>,

    /// Resources to exclude, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "RESOURCES")]
    pub exclude_resources: Vec<String>,

    /// Include cluster scoped resources. Unset means auto.
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub include_cluster_resources: Option<bool>,

    /// Cluster scoped resources to include, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "RESOURCES")]
    pub include_cluster_scoped_resources: Vec<String>,

    /// Cluster scoped resources to exclude, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "RESOURCES")]
    pub exclude_cluster_scoped_resources: Vec<String>,

    /// Namespace scoped resources to include, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "RESOURCES")]
    pub include_namespace_scoped_resources: Vec<String>,

    /// Namespace scoped resources to exclude, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "RESOURCES")]
    pub exclude_namespace_scoped_resources: Vec<String>,
}

impl ResourceFilterFlags {
    fn first_old_flag(&self) -> Option<&'static str> {
        if !self.include_resources.is_empty() {
            Some("--include-resources")
        } else if !self.exclude_resources.is_empty() {
            Some("--exclude-resources")
        } else if self.include_cluster_resources.is_some() {
            Some("--include-cluster-resources")
        } else {
            None
        }
    }

    fn first_new_flag(&self) -> Option<&'static str> {
        if !self.include_cluster_scoped_resources.is_empty() {
            Some("--include-cluster-scoped-resources")
        } else if !self.exclude_cluster_scoped_resources.is_empty() {
            Some("--exclude-cluster-scoped-resources")
        } else if !self.include_namespace_scoped_resources.is_empty() {
            Some("--include-namespace-scoped-resources")
        } else if !self.exclude_namespace_scoped_resources.is_empty() {
            Some("--exclude-namespace-scoped-resources")
        } else {
            None
        }
    }

    fn validate(&self) -> Result<()> {
        if let (Some(old_flag), Some(new_flag)) = (self.first_old_flag(), self.first_new_flag()) {
            return MixedResourceFiltersSnafu { old_flag, new_flag }.fail();
        }
        Ok(())
    }

    fn apply(&self, spec: &mut BackupSpec) {
        spec.included_resources.clone_from(&self.include_resources);
        spec.excluded_resources.clone_from(&self.exclude_resources);
        spec.include_cluster_resources = self.include_cluster_resources;
        spec.included_cluster_scoped_resources
            .clone_from(&self.include_cluster_scoped_resources);
        spec.excluded_cluster_scoped_resources
            .clone_from(&self.exclude_cluster_scoped_resources);
        spec.included_namespace_scoped_resources
            .clone_from(&self.include_namespace_scoped_resources);
        spec.excluded_namespace_scoped_resources
            .clone_from(&self.exclude_namespace_scoped_resources);
    }
}

/// Flags shared by `backup create` and `nonadmin backup create`.
#[derive(clap::Args, Clone, Debug, Default, PartialEq)]
pub struct BackupOptions {
    #[command(flatten)]
    pub resources: ResourceFilterFlags,

    #[command(flatten)]
    pub selectors: SelectorFlags,

    /// Take snapshots of persistent volumes. Unset means auto.
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub snapshot_volumes: Option<bool>,

    /// Move snapshot data into the backup storage location. Unset means auto.
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub snapshot_move_data: Option<bool>,

    /// Back up all volumes with the file system backup by default. Unset means
    /// auto.
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub default_volumes_to_fs_backup: Option<bool>,

    /// Backup storage location to store the backup in.
    #[arg(long, value_name = "NAME")]
    pub storage_location: Option<String>,

    /// Volume snapshot locations to use, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub volume_snapshot_locations: Vec<String>,

    /// How long the backup is kept, for example `720h0m0s`.
    #[arg(long, value_name = "DURATION")]
    pub ttl: Option<Duration>,

    /// How long to wait for CSI snapshots to become ready.
    #[arg(long, value_name = "DURATION")]
    pub csi_snapshot_timeout: Option<Duration>,

    /// How long to wait for asynchronous item operations.
    #[arg(long, value_name = "DURATION")]
    pub item_operation_timeout: Option<Duration>,

    /// Resources backed up first, in order, as
    /// `kind=ns/name,ns/name;kind=ns/name`.
    #[arg(long, value_name = "RESOURCES")]
    pub ordered_resources: Option<OrderedResources>,

    /// Data mover used for snapshot data movement.
    #[arg(long, value_name = "NAME")]
    pub data_mover: Option<String>,

    /// Number of files uploaded in parallel by the file system uploader.
    #[arg(long, value_name = "COUNT")]
    pub parallel_files_upload: Option<i32>,

    /// ConfigMap holding the resource policies of the backup.
    #[arg(long, value_name = "NAME")]
    pub resource_policies_configmap: Option<String>,
}

impl BackupOptions {
    /// Builds the backup spec. Fails if resource filter families or selector
    /// flags are mixed.
    pub fn build(&self) -> Result<BackupSpec> {
        let mut spec = BackupSpec::default();
        self.apply(&mut spec)?;
        Ok(spec)
    }

    /// Writes the given flags over `spec`, used to adjust a schedule template.
    pub fn apply(&self, spec: &mut BackupSpec) -> Result<()> {
        self.resources.validate()?;
        let (label_selector, or_label_selectors) = self.selectors.build()?;

        if self.resources.first_old_flag().is_some() || self.resources.first_new_flag().is_some() {
            self.resources.apply(spec);
        }
        if label_selector.is_some() || !or_label_selectors.is_empty() {
            spec.label_selector = label_selector;
            spec.or_label_selectors = or_label_selectors;
        }

        set_if_some(&mut spec.snapshot_volumes, self.snapshot_volumes);
        set_if_some(&mut spec.snapshot_move_data, self.snapshot_move_data);
        set_if_some(
            &mut spec.default_volumes_to_fs_backup,
            self.default_volumes_to_fs_backup,
        );
        set_if_some(&mut spec.storage_location, self.storage_location.clone());
        if !self.volume_snapshot_locations.is_empty() {
            spec.volume_snapshot_locations
                .clone_from(&self.volume_snapshot_locations);
        }
        set_if_some(&mut spec.ttl, self.ttl);
        set_if_some(&mut spec.csi_snapshot_timeout, self.csi_snapshot_timeout);
        set_if_some(&mut spec.item_operation_timeout, self.item_operation_timeout);
        if let Some(OrderedResources(resources)) = &self.ordered_resources {
            spec.ordered_resources.clone_from(resources);
        }
        set_if_some(&mut spec.data_mover, self.data_mover.clone());
        if let Some(parallel_files_upload) = self.parallel_files_upload {
            spec.uploader_config = Some(UploaderConfigForBackup {
                parallel_files_upload: Some(parallel_files_upload),
            });
        }
        if let Some(config_map) = &self.resource_policies_configmap {
            spec.resource_policy = Some(ResourcePolicyReference::config_map(config_map));
        }

        ensure!(
            spec.label_selector.is_none() || spec.or_label_selectors.is_empty(),
            super::ConflictingSelectorsSnafu
        );
        Ok(())
    }
}

impl NamespaceFilterFlags {
    pub fn apply_to_backup(&self, spec: &mut BackupSpec) {
        if !self.include_namespaces.is_empty() {
            spec.included_namespaces.clone_from(&self.include_namespaces);
        }
        if !self.exclude_namespaces.is_empty() {
            spec.excluded_namespaces.clone_from(&self.exclude_namespaces);
        }
    }
}

fn set_if_some<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

/// Builds a Velero [`Backup`] named `name` in the admin namespace.
pub fn backup(name: &str, namespace: &str, metadata: &MetadataFlags, spec: BackupSpec) -> Backup {
    Backup {
        metadata: ObjectMetaBuilder::new()
            .name(name)
            .namespace(namespace)
            .with_metadata_flags(metadata)
            .build(),
        spec,
        status: None,
    }
}

/// Starts from the backup template of `schedule`, labelled with the schedule
/// name like the backups the schedule creates itself.
pub fn backup_from_schedule(
    name: &str,
    namespace: &str,
    metadata: &MetadataFlags,
    schedule: &Schedule,
) -> Backup {
    let schedule_name = schedule.metadata.name.clone().unwrap_or_default();
    let mut backup = backup(name, namespace, metadata, schedule.spec.template.clone());
    backup
        .metadata
        .labels
        .get_or_insert_with(Default::default)
        .insert(SCHEDULE_NAME_LABEL.to_owned(), schedule_name);
    backup
}

/// Label Velero puts on backups created by a schedule.
pub const SCHEDULE_NAME_LABEL: &str = "velero.io/schedule-name";

/// Asks the server to delete `backup_name` and its data. The request is
/// labelled with the backup name, which is how the server finds pending
/// deletions of a backup.
pub fn delete_backup_request(backup_name: &str, namespace: &str) -> DeleteBackupRequest {
    DeleteBackupRequest {
        metadata: ObjectMetaBuilder::new()
            .name(format!("{backup_name}-{}", random_suffix()))
            .namespace(namespace)
            .with_labels([(BACKUP_NAME_KEY.to_owned(), backup_name.to_owned())].into())
            .build(),
        spec: DeleteBackupRequestSpec {
            backup_name: backup_name.to_owned(),
        },
        status: None,
    }
}
