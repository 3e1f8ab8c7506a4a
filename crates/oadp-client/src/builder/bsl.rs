use oadp_shared::time::Duration;

use super::flags::{CredentialFlag, KeyValuePairs, merge_pairs};
use crate::crd::velero::{BackupStorageLocationSpec, ObjectStorageLocation};

/// Config key the `--region` flag is stored under.
pub const REGION_CONFIG_KEY: &str = "region";

/// Flags of `nonadmin bsl create`.
#[derive(clap::Args, Clone, Debug, PartialEq, Eq)]
pub struct BslOptions {
    /// Object storage provider, for example `aws`, `gcp` or `azure`.
    #[arg(long, value_name = "PROVIDER")]
    pub provider: String,

    /// Bucket to store backups in.
    #[arg(long, value_name = "BUCKET")]
    pub bucket: String,

    /// Prefix inside the bucket.
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Region of the bucket, stored as the `region` config entry.
    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// Provider specific configuration, as `key=value,...`.
    #[arg(long, value_name = "KEY=VALUE")]
    pub config: Vec<KeyValuePairs>,

    /// Secret and key holding the object storage credentials, as
    /// `secret-name=key`.
    #[arg(long, value_name = "SECRET=KEY")]
    pub credential: CredentialFlag,

    /// How often Velero syncs backups from object storage.
    #[arg(long, value_name = "DURATION")]
    pub backup_sync_period: Option<Duration>,

    /// How often Velero validates the location.
    #[arg(long, value_name = "DURATION")]
    pub validation_frequency: Option<Duration>,
}

impl BslOptions {
    /// Builds the storage location spec. `--region` wins over a `region` entry
    /// in `--config`.
    pub fn build(&self) -> BackupStorageLocationSpec {
        let mut config = merge_pairs(&self.config);
        if let Some(region) = &self.region {
            config.insert(REGION_CONFIG_KEY.to_owned(), region.clone());
        }

        let CredentialFlag(credential) = &self.credential;

        BackupStorageLocationSpec {
            provider: self.provider.clone(),
            object_storage: ObjectStorageLocation {
                bucket: self.bucket.clone(),
                prefix: self.prefix.clone(),
                ca_cert: None,
            },
            config,
            credential: Some(credential.clone()),
            backup_sync_period: self.backup_sync_period,
            validation_frequency: self.validation_frequency,
            ..BackupStorageLocationSpec::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_is_folded_into_config() {
        let options = BslOptions {
            provider: "aws".to_owned(),
            bucket: "team-a-backups".to_owned(),
            prefix: Some("velero".to_owned()),
            region: Some("eu-west-1".to_owned()),
            config: vec!["region=us-east-1,profile=default".parse().unwrap()],
            credential: "cloud-credentials=cloud".parse().unwrap(),
            backup_sync_period: None,
            validation_frequency: Some("1h".parse().unwrap()),
        };

        let json = serde_json::to_value(options.build()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "provider": "aws",
                "objectStorage": { "bucket": "team-a-backups", "prefix": "velero" },
                "config": { "profile": "default", "region": "eu-west-1" },
                "credential": { "name": "cloud-credentials", "key": "cloud" },
                "validationFrequency": "1h0m0s",
            })
        );
    }
}
