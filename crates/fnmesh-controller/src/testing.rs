//! In-memory API server stand-in for reconciler tests
//!
//! Behaves like the API server where the reconcilers can tell the
//! difference: reads return copies, writes bump resourceVersion and reject
//! stale versions, `update` never touches status and `update_status` never
//! touches anything else.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fnmesh_common::kube_utils::{key_of, ResourceClient};
use fnmesh_common::Error;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Client operation, for call accounting and failure injection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Get,
    Create,
    Update,
    UpdateStatus,
    Delete,
}

impl Op {
    fn is_write(&self) -> bool {
        !matches!(self, Op::Get)
    }
}

type Key = (String, String);

pub struct FakeClient<K> {
    objects: Mutex<BTreeMap<Key, K>>,
    calls: Mutex<Vec<(Op, String)>>,
    failures: Mutex<Vec<(Op, String)>>,
    version: AtomicU64,
}

impl<K> FakeClient<K>
where
    K: Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            objects: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            version: AtomicU64::new(1),
        })
    }

    /// Store an object as if another writer had created it
    pub fn seed(&self, mut obj: K) -> K {
        let key = key_of(&obj).expect("seeded objects need a namespace and name");
        self.stamp(&mut obj, &key.1);
        self.objects.lock().unwrap().insert(key, obj.clone());
        obj
    }

    /// Mutate a stored object out of band, bumping its resourceVersion
    pub fn modify(&self, namespace: &str, name: &str, f: impl FnOnce(&mut K)) {
        let mut objects = self.objects.lock().unwrap();
        let obj = objects
            .get_mut(&(namespace.to_string(), name.to_string()))
            .expect("object to modify must exist");
        f(obj);
        obj.meta_mut().resource_version = Some(self.next_version());
    }

    pub fn stored(&self, namespace: &str, name: &str) -> Option<K> {
        self.objects
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Make every future `op` on `name` fail with a retryable error
    pub fn fail_on(&self, op: Op, name: &str) {
        self.failures.lock().unwrap().push((op, name.to_string()));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| *o == op)
            .count()
    }

    pub fn writes(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| o.is_write())
            .count()
    }

    /// Names touched by `op`, in call order
    pub fn calls_to(&self, op: Op) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| *o == op)
            .map(|(_, n)| n.clone())
            .collect()
    }

    fn kind() -> String {
        K::kind(&()).to_string()
    }

    fn next_version(&self) -> String {
        self.version.fetch_add(1, Ordering::SeqCst).to_string()
    }

    fn stamp(&self, obj: &mut K, name: &str) {
        let meta = obj.meta_mut();
        meta.resource_version = Some(self.next_version());
        if meta.uid.is_none() {
            meta.uid = Some(format!("{name}-uid"));
        }
    }

    fn record(&self, op: Op, name: &str) -> Result<(), Error> {
        self.calls.lock().unwrap().push((op, name.to_string()));
        let injected = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .any(|(o, n)| *o == op && n == name);
        if injected {
            return Err(Error::internal_with_context(
                "fake",
                format!("injected {op:?} failure on {name}"),
            ));
        }
        Ok(())
    }

    fn check_version(&self, incoming: &K, stored: &K, name: &str) -> Result<(), Error> {
        let incoming = incoming.meta().resource_version.as_deref();
        let stored = stored.meta().resource_version.as_deref();
        if incoming.is_some() && incoming != stored {
            return Err(Error::conflict(
                Self::kind(),
                name,
                "the object has been modified",
            ));
        }
        Ok(())
    }
}

/// `target` with its status replaced by `source`'s
fn with_status_of<K: Serialize + DeserializeOwned>(target: &K, source: &K) -> Result<K, Error> {
    let mut value = serde_json::to_value(target)?;
    let status = serde_json::to_value(source)?.get("status").cloned();
    if let Some(obj) = value.as_object_mut() {
        match status {
            Some(status) => obj.insert("status".to_string(), status),
            None => obj.remove("status"),
        };
    }
    Ok(serde_json::from_value(value)?)
}

#[async_trait]
impl<K> ResourceClient<K> for FakeClient<K>
where
    K: Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, Error> {
        self.record(Op::Get, name)?;
        Ok(self.stored(namespace, name))
    }

    async fn create(&self, resource: &K) -> Result<K, Error> {
        let key = key_of(resource)?;
        self.record(Op::Create, &key.1)?;
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&key) {
            return Err(Error::already_exists(Self::kind(), &key.1));
        }
        let mut obj = resource.clone();
        self.stamp(&mut obj, &key.1);
        objects.insert(key, obj.clone());
        Ok(obj)
    }

    async fn update(&self, resource: &K) -> Result<K, Error> {
        let key = key_of(resource)?;
        self.record(Op::Update, &key.1)?;
        let mut objects = self.objects.lock().unwrap();
        let stored = objects
            .get(&key)
            .ok_or_else(|| Error::not_found(Self::kind(), &key.1))?;
        self.check_version(resource, stored, &key.1)?;
        let mut obj = with_status_of(resource, stored)?;
        obj.meta_mut().resource_version = Some(self.next_version());
        objects.insert(key, obj.clone());
        Ok(obj)
    }

    // Same as a PUT on the status subresource: the stored status is replaced
    // wholesale and everything outside it is kept
    async fn update_status(&self, resource: &K) -> Result<K, Error> {
        let key = key_of(resource)?;
        self.record(Op::UpdateStatus, &key.1)?;
        let mut objects = self.objects.lock().unwrap();
        let stored = objects
            .get(&key)
            .ok_or_else(|| Error::not_found(Self::kind(), &key.1))?;
        self.check_version(resource, stored, &key.1)?;
        let mut obj = with_status_of(stored, resource)?;
        obj.meta_mut().resource_version = Some(self.next_version());
        objects.insert(key, obj.clone());
        Ok(obj)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), Error> {
        self.record(Op::Delete, name)?;
        self.objects
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| Error::not_found(Self::kind(), name))
    }
}
