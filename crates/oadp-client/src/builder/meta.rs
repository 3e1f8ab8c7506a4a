use std::collections::BTreeMap;

use kube::api::ObjectMeta;

use super::flags::{KeyValuePairs, merge_pairs};

/// A builder to build [`ObjectMeta`] objects.
#[derive(Clone, Debug, Default)]
pub struct ObjectMetaBuilder {
    name: Option<String>,
    namespace: Option<String>,
    labels: Option<BTreeMap<String, String>>,
    annotations: Option<BTreeMap<String, String>>,
}

impl ObjectMetaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    pub fn namespace(&mut self, namespace: impl Into<String>) -> &mut Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// This adds multiple labels to the existing labels.
    /// Any existing label with a key that is contained in `labels` will be overwritten.
    pub fn with_labels(&mut self, labels: BTreeMap<String, String>) -> &mut Self {
        if !labels.is_empty() {
            self.labels.get_or_insert_with(BTreeMap::new).extend(labels);
        }
        self
    }

    /// This adds multiple annotations to the existing annotations.
    /// Any existing annotation with a key that is contained in `annotations` will be overwritten.
    pub fn with_annotations(&mut self, annotations: BTreeMap<String, String>) -> &mut Self {
        if !annotations.is_empty() {
            self.annotations
                .get_or_insert_with(BTreeMap::new)
                .extend(annotations);
        }
        self
    }

    /// Adds the labels and annotations given on the command line.
    pub fn with_metadata_flags(&mut self, flags: &MetadataFlags) -> &mut Self {
        self.with_labels(merge_pairs(&flags.labels))
            .with_annotations(merge_pairs(&flags.annotations))
    }

    pub fn build(&self) -> ObjectMeta {
        ObjectMeta {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
            ..ObjectMeta::default()
        }
    }
}

/// `--labels` and `--annotations` of the created object.
#[derive(clap::Args, Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataFlags {
    /// Labels to apply to the created object, as `key=value,...`.
    #[arg(long, value_name = "KEY=VALUE")]
    pub labels: Vec<KeyValuePairs>,

    /// Annotations to apply to the created object, as `key=value,...`.
    #[arg(long, value_name = "KEY=VALUE")]
    pub annotations: Vec<KeyValuePairs>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_flags_leave_maps_unset() {
        let meta = ObjectMetaBuilder::new()
            .name("nightly")
            .namespace("openshift-adp")
            .with_metadata_flags(&MetadataFlags::default())
            .build();

        assert_eq!(meta.name.as_deref(), Some("nightly"));
        assert_eq!(meta.namespace.as_deref(), Some("openshift-adp"));
        assert_eq!(meta.labels, None);
        assert_eq!(meta.annotations, None);
    }

    #[test]
    fn flags_are_merged() {
        let flags = MetadataFlags {
            labels: vec!["app=shop,tier=web".parse().unwrap(), "tier=db".parse().unwrap()],
            annotations: vec!["owner=team-a".parse().unwrap()],
        };

        let meta = ObjectMetaBuilder::new().with_metadata_flags(&flags).build();

        let labels = meta.labels.unwrap();
        assert_eq!(labels.get("tier").map(String::as_str), Some("db"));
        assert_eq!(labels.len(), 2);
        assert_eq!(
            meta.annotations.unwrap().get("owner").map(String::as_str),
            Some("team-a")
        );
    }
}
