//! Reading the objects named on the command line.

use oadp_client::client::{self, ResourceStore};
use snafu::{OptionExt, ResultExt, Snafu};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to look up {kind} {name:?}"))]
    Get {
        source: client::Error,
        kind: &'static str,
        name: String,
    },

    #[snafu(display("{kind} {name:?} not found in namespace {namespace:?}"))]
    NotFound {
        kind: &'static str,
        name: String,
        namespace: String,
    },

    #[snafu(display("failed to list {kind} objects in namespace {namespace:?}"))]
    List {
        source: client::Error,
        kind: &'static str,
        namespace: String,
    },
}

/// Fetches the object `name`, failing if it doesn't exist.
pub async fn get_existing<K, S>(
    store: &S,
    kind: &'static str,
    name: &str,
    namespace: &str,
) -> Result<K, Error>
where
    K: Send + Sync + 'static,
    S: ResourceStore<K>,
{
    store
        .get_opt(name)
        .await
        .context(GetSnafu { kind, name })?
        .context(NotFoundSnafu {
            kind,
            name,
            namespace,
        })
}

/// Fetches the named objects in order, or lists all objects matching
/// `selector` if no names are given.
pub async fn get_or_list<K, S>(
    store: &S,
    kind: &'static str,
    names: &[String],
    selector: Option<&str>,
    namespace: &str,
) -> Result<Vec<K>, Error>
where
    K: Send + Sync + 'static,
    S: ResourceStore<K>,
{
    if names.is_empty() {
        return store
            .list(selector)
            .await
            .context(ListSnafu { kind, namespace });
    }

    let mut objects = Vec::with_capacity(names.len());
    for name in names {
        objects.push(get_existing(store, kind, name, namespace).await?);
    }
    Ok(objects)
}
