//! In-memory [`ResourceStore`] used by the unit tests.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use kube::Resource;
use serde::{Serialize, de::DeserializeOwned};

use crate::client::{self, ResourceStore};

/// A call made against a [`FakeStore`], with the object name it targeted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Get(String),
    List,
    Create(String),
    Replace(String),
    Patch(String),
    Delete(String),
}

type Reconciler<K> = Arc<dyn Fn(&mut K, u32) + Send + Sync>;

struct State<K> {
    objects: BTreeMap<String, K>,
    reads: BTreeMap<String, u32>,
    calls: Vec<Call>,
}

/// Stores objects by name and records every call.
///
/// A reconciler can be installed to play the part of the server side
/// controller. It runs on every read of an object, with the number of reads of
/// that object so far.
pub struct FakeStore<K> {
    state: Arc<Mutex<State<K>>>,
    reconciler: Option<Reconciler<K>>,
    delete_delay: Option<Duration>,
    stalled: bool,
    failing_create: bool,
    failing_replace: bool,
}

impl<K> Clone for FakeStore<K> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reconciler: self.reconciler.clone(),
            delete_delay: self.delete_delay,
            stalled: self.stalled,
            failing_create: self.failing_create,
            failing_replace: self.failing_replace,
        }
    }
}

impl<K> Default for FakeStore<K> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                objects: BTreeMap::new(),
                reads: BTreeMap::new(),
                calls: Vec::new(),
            })),
            reconciler: None,
            delete_delay: None,
            stalled: false,
            failing_create: false,
            failing_replace: false,
        }
    }
}

impl<K> FakeStore<K>
where
    K: Resource + Clone,
{
    pub fn with_object(self, object: K) -> Self {
        let name = object.meta().name.clone().unwrap_or_default();
        self.state.lock().unwrap().objects.insert(name, object);
        self
    }

    pub fn with_reconciler(mut self, reconciler: impl Fn(&mut K, u32) + Send + Sync + 'static) -> Self {
        self.reconciler = Some(Arc::new(reconciler));
        self
    }

    pub fn with_delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = Some(delay);
        self
    }

    /// Reads and writes never complete, deletes still do.
    pub fn stalled(mut self) -> Self {
        self.stalled = true;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.failing_create = true;
        self
    }

    pub fn failing_replace(mut self) -> Self {
        self.failing_replace = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn object(&self, name: &str) -> Option<K> {
        self.state.lock().unwrap().objects.get(name).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().objects.is_empty()
    }

    pub fn gets(&self) -> usize {
        self.count(|call| matches!(call, Call::Get(_)))
    }

    pub fn creates(&self) -> usize {
        self.count(|call| matches!(call, Call::Create(_)))
    }

    pub fn replaces(&self) -> usize {
        self.count(|call| matches!(call, Call::Replace(_)))
    }

    pub fn patches(&self) -> usize {
        self.count(|call| matches!(call, Call::Patch(_)))
    }

    pub fn deletes(&self) -> usize {
        self.count(|call| matches!(call, Call::Delete(_)))
    }

    /// Number of calls that wrote to the store.
    pub fn writes(&self) -> usize {
        self.creates() + self.replaces() + self.patches() + self.deletes()
    }

    fn count(&self, filter: impl Fn(&Call) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| filter(call))
            .count()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    async fn stall(&self) {
        if self.stalled {
            std::future::pending::<()>().await;
        }
    }
}

fn injected_failure() -> kube::Error {
    kube::Error::Service("injected failure".into())
}

fn kind_of<K>() -> String
where
    K: Resource,
    K::DynamicType: Default,
{
    K::kind(&K::DynamicType::default()).into_owned()
}

fn matches_selector<K: Resource>(object: &K, selector: &str) -> bool {
    let labels = object.meta().labels.clone().unwrap_or_default();
    selector
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .all(|(key, value)| labels.get(key.trim()).map(String::as_str) == Some(value.trim()))
}

#[async_trait]
impl<K> ResourceStore<K> for FakeStore<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    K::DynamicType: Default,
{
    async fn get_opt(&self, name: &str) -> Result<Option<K>, client::Error> {
        self.record(Call::Get(name.to_owned()));
        self.stall().await;

        let mut state = self.state.lock().unwrap();
        let reads = {
            let reads = state.reads.entry(name.to_owned()).or_default();
            *reads += 1;
            *reads
        };

        let Some(object) = state.objects.get_mut(name) else {
            return Ok(None);
        };
        if let Some(reconciler) = &self.reconciler {
            reconciler(object, reads);
        }
        Ok(Some(object.clone()))
    }

    async fn list(&self, label_selector: Option<&str>) -> Result<Vec<K>, client::Error> {
        self.record(Call::List);
        self.stall().await;

        let state = self.state.lock().unwrap();
        Ok(state
            .objects
            .values()
            .filter(|object| label_selector.is_none_or(|selector| matches_selector(*object, selector)))
            .cloned()
            .collect())
    }

    async fn create(&self, object: &K) -> Result<K, client::Error> {
        let name = object.meta().name.clone().unwrap_or_default();
        self.record(Call::Create(name.clone()));
        self.stall().await;

        let mut state = self.state.lock().unwrap();
        if self.failing_create || state.objects.contains_key(&name) {
            return Err(client::Error::CreateObject {
                source: injected_failure(),
                kind: kind_of::<K>(),
                name,
            });
        }

        state.objects.insert(name, object.clone());
        Ok(object.clone())
    }

    async fn replace(&self, name: &str, object: &K) -> Result<K, client::Error> {
        self.record(Call::Replace(name.to_owned()));
        self.stall().await;

        let mut state = self.state.lock().unwrap();
        if self.failing_replace || !state.objects.contains_key(name) {
            return Err(client::Error::ReplaceObject {
                source: injected_failure(),
                kind: kind_of::<K>(),
                name: name.to_owned(),
            });
        }

        state.objects.insert(name.to_owned(), object.clone());
        Ok(object.clone())
    }

    async fn merge_patch(&self, name: &str, patch: &serde_json::Value) -> Result<K, client::Error> {
        self.record(Call::Patch(name.to_owned()));
        self.stall().await;

        let mut state = self.state.lock().unwrap();
        let Some(object) = state.objects.get_mut(name) else {
            return Err(client::Error::PatchObject {
                source: injected_failure(),
                kind: kind_of::<K>(),
                name: name.to_owned(),
            });
        };

        let mut value = serde_json::to_value(&*object).unwrap();
        json_patch::merge(&mut value, patch);
        *object = serde_json::from_value(value).unwrap();
        Ok(object.clone())
    }

    async fn delete(&self, name: &str) -> Result<(), client::Error> {
        self.record(Call::Delete(name.to_owned()));

        if let Some(delay) = self.delete_delay {
            tokio::time::sleep(delay).await;
        }

        match self.state.lock().unwrap().objects.remove(name) {
            Some(_) => Ok(()),
            None => Err(client::Error::DeleteObject {
                source: injected_failure(),
                kind: kind_of::<K>(),
                name: name.to_owned(),
            }),
        }
    }
}
