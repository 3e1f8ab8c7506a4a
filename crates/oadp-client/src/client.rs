//! Access to the Kubernetes API.
//!
//! Every operation of the plugin talks to the cluster through the
//! [`ResourceStore`] trait. It is implemented for [`kube::Api`], the tests use
//! an in-memory store instead.

use std::{fmt::Debug, path::PathBuf};

use async_trait::async_trait;
use kube::{
    Api, Resource,
    api::{DeleteParams, ListParams, Patch, PatchParams, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
};
use serde::{Serialize, de::DeserializeOwned};
use snafu::{ResultExt, Snafu};
use tracing::debug;

/// The field manager recorded for every object the plugin writes.
pub const FIELD_MANAGER: &str = "kubectl-oadp";

/// The namespace used when the kubeconfig context doesn't name one.
pub const DEFAULT_NAMESPACE: &str = "default";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to get {kind} {name:?}"))]
    GetObject {
        source: kube::Error,
        kind: String,
        name: String,
    },

    #[snafu(display("failed to list {kind} objects"))]
    ListObjects { source: kube::Error, kind: String },

    #[snafu(display("failed to create {kind} {name:?}"))]
    CreateObject {
        source: kube::Error,
        kind: String,
        name: String,
    },

    #[snafu(display("failed to update {kind} {name:?}"))]
    ReplaceObject {
        source: kube::Error,
        kind: String,
        name: String,
    },

    #[snafu(display("failed to patch {kind} {name:?}"))]
    PatchObject {
        source: kube::Error,
        kind: String,
        name: String,
    },

    #[snafu(display("failed to delete {kind} {name:?}"))]
    DeleteObject {
        source: kube::Error,
        kind: String,
        name: String,
    },

    #[snafu(display("failed to read kubeconfig from {path:?}"))]
    ReadKubeconfig {
        source: kube::config::KubeconfigError,
        path: PathBuf,
    },

    #[snafu(display("failed to load kubeconfig"))]
    LoadKubeconfig {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("failed to infer the cluster configuration"))]
    InferConfig {
        source: kube::config::InferConfigError,
    },

    #[snafu(display("failed to create kubernetes client"))]
    CreateKubeClient { source: kube::Error },
}

/// Typed CRUD access to the objects of kind `K` in one namespace.
#[async_trait]
pub trait ResourceStore<K>: Send + Sync
where
    K: Send + Sync + 'static,
{
    /// Returns [`None`] if there is no object with the given name.
    async fn get_opt(&self, name: &str) -> Result<Option<K>>;

    /// Lists all objects, optionally restricted by a label selector query.
    async fn list(&self, label_selector: Option<&str>) -> Result<Vec<K>>;

    async fn create(&self, object: &K) -> Result<K>;

    /// Replaces the object, failing with a conflict if it changed since it
    /// was read.
    async fn replace(&self, name: &str, object: &K) -> Result<K>;

    /// Applies a JSON merge patch.
    async fn merge_patch(&self, name: &str, patch: &serde_json::Value) -> Result<K>;

    async fn delete(&self, name: &str) -> Result<()>;
}

#[async_trait]
impl<K> ResourceStore<K> for Api<K>
where
    K: Resource + Clone + DeserializeOwned + Serialize + Debug + Send + Sync + 'static,
    K::DynamicType: Default,
{
    async fn get_opt(&self, name: &str) -> Result<Option<K>> {
        Api::get_opt(self, name).await.context(GetObjectSnafu {
            kind: kind_of::<K>(),
            name,
        })
    }

    async fn list(&self, label_selector: Option<&str>) -> Result<Vec<K>> {
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }

        let list = Api::list(self, &params).await.context(ListObjectsSnafu {
            kind: kind_of::<K>(),
        })?;
        Ok(list.items)
    }

    async fn create(&self, object: &K) -> Result<K> {
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_owned()),
            ..PostParams::default()
        };
        let name = object_name(object);

        let created = Api::create(self, &params, object)
            .await
            .context(CreateObjectSnafu {
                kind: kind_of::<K>(),
                name: &name,
            })?;
        debug!(kind = %kind_of::<K>(), %name, "created object");
        Ok(created)
    }

    async fn replace(&self, name: &str, object: &K) -> Result<K> {
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_owned()),
            ..PostParams::default()
        };

        Api::replace(self, name, &params, object)
            .await
            .context(ReplaceObjectSnafu {
                kind: kind_of::<K>(),
                name,
            })
    }

    async fn merge_patch(&self, name: &str, patch: &serde_json::Value) -> Result<K> {
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_owned()),
            ..PatchParams::default()
        };

        Api::patch(self, name, &params, &Patch::Merge(patch))
            .await
            .context(PatchObjectSnafu {
                kind: kind_of::<K>(),
                name,
            })
    }

    async fn delete(&self, name: &str) -> Result<()> {
        Api::delete(self, name, &DeleteParams::default())
            .await
            .context(DeleteObjectSnafu {
                kind: kind_of::<K>(),
                name,
            })?;
        debug!(kind = %kind_of::<K>(), name, "deleted object");
        Ok(())
    }
}

fn kind_of<K>() -> String
where
    K: Resource,
    K::DynamicType: Default,
{
    K::kind(&K::DynamicType::default()).into_owned()
}

fn object_name<K: Resource>(object: &K) -> String {
    object.meta().name.clone().unwrap_or_default()
}

/// Selects the kubeconfig file and context the plugin connects with.
#[derive(clap::Args, Clone, Debug, Default, PartialEq, Eq)]
pub struct KubeconfigOptions {
    /// Path to the kubeconfig file to use for CLI requests.
    #[arg(long, value_name = "PATH", global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// The name of the kubeconfig context to use.
    #[arg(long, value_name = "NAME", global = true)]
    pub context: Option<String>,
}

/// This `Client` wraps an underlying [`kube::Client`] together with the
/// namespace of the current kubeconfig context.
#[derive(Clone)]
pub struct Client {
    client: kube::Client,
    default_namespace: String,
}

impl Client {
    pub fn new(client: kube::Client, default_namespace: impl Into<String>) -> Self {
        Self {
            client,
            default_namespace: default_namespace.into(),
        }
    }

    /// Loads the kubeconfig (or the in-cluster configuration) and connects.
    pub async fn connect(options: &KubeconfigOptions) -> Result<Self> {
        let kube_options = KubeConfigOptions {
            context: options.context.clone(),
            ..KubeConfigOptions::default()
        };

        let config = match &options.kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).context(ReadKubeconfigSnafu {
                    path: path.clone(),
                })?;
                kube::Config::from_custom_kubeconfig(kubeconfig, &kube_options)
                    .await
                    .context(LoadKubeconfigSnafu)?
            }
            None if options.context.is_some() => kube::Config::from_kubeconfig(&kube_options)
                .await
                .context(LoadKubeconfigSnafu)?,
            None => kube::Config::infer().await.context(InferConfigSnafu)?,
        };

        let default_namespace = if config.default_namespace.is_empty() {
            DEFAULT_NAMESPACE.to_owned()
        } else {
            config.default_namespace.clone()
        };
        debug!(
            cluster_url = %config.cluster_url,
            namespace = %default_namespace,
            "loaded cluster configuration"
        );

        let client = kube::Client::try_from(config).context(CreateKubeClientSnafu)?;
        Ok(Self::new(client, default_namespace))
    }

    /// The namespace of the current kubeconfig context.
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// Returns an [`Api`] for objects of kind `K` in the given namespace.
    pub fn namespaced_api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = kube::core::NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}
