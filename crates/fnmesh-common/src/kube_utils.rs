//! Shared Kubernetes utilities using kube-rs
//!
//! [`ResourceClient`] is the single seam the reconcilers talk to the API
//! server through. It is keyed by namespace and name, maps 404 on reads to
//! `Ok(None)`, and classifies write failures into [`Error::NotFound`],
//! [`Error::AlreadyExists`] and [`Error::Conflict`].

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::{Api, DeleteParams, PostParams};
use kube::core::{NamespaceResourceScope, Selector};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::Error;

// =============================================================================
// ResourceClient
// =============================================================================

/// Key-addressed CRUD over one namespaced resource type
///
/// `update` and `update_status` send the resourceVersion carried by the
/// object, so a write based on a stale read fails with [`Error::Conflict`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceClient<K>: Send + Sync
where
    K: Clone + Send + Sync + 'static,
{
    /// Fetch an object, `Ok(None)` when it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, Error>;

    /// Create an object
    async fn create(&self, resource: &K) -> Result<K, Error>;

    /// Replace an object's spec and metadata
    async fn update(&self, resource: &K) -> Result<K, Error>;

    /// Replace an object's status subresource
    async fn update_status(&self, resource: &K) -> Result<K, Error>;

    /// Delete an object
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct KubeResourceClient<K> {
    client: Client,
    _kind: PhantomData<fn() -> K>,
}

impl<K> KubeResourceClient<K> {
    /// Create a new client for `K` wrapping the given kube client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

impl<K> KubeResourceClient<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
{
    fn api(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn kind() -> String {
        K::kind(&()).to_string()
    }
}

#[async_trait]
impl<K> ResourceClient<K> for KubeResourceClient<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, Error> {
        match self.api(namespace).get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(Error::from_kube(&Self::kind(), name, e)),
        }
    }

    async fn create(&self, resource: &K) -> Result<K, Error> {
        let (namespace, name) = key_of(resource)?;
        debug!(kind = %Self::kind(), %namespace, %name, "creating");
        self.api(&namespace)
            .create(&PostParams::default(), resource)
            .await
            .map_err(|e| Error::from_kube(&Self::kind(), &name, e))
    }

    async fn update(&self, resource: &K) -> Result<K, Error> {
        let (namespace, name) = key_of(resource)?;
        debug!(kind = %Self::kind(), %namespace, %name, "updating");
        self.api(&namespace)
            .replace(&name, &PostParams::default(), resource)
            .await
            .map_err(|e| Error::from_kube(&Self::kind(), &name, e))
    }

    async fn update_status(&self, resource: &K) -> Result<K, Error> {
        let (namespace, name) = key_of(resource)?;
        debug!(kind = %Self::kind(), %namespace, %name, "replacing status");
        // PUT on the status subresource: the stored status becomes exactly
        // ours, so map keys dropped in memory are dropped on the server too
        let body = serde_json::to_vec(resource)
            .map_err(|e| Error::serialization_for_kind(Self::kind(), e.to_string()))?;
        self.api(&namespace)
            .replace_status(&name, &PostParams::default(), body)
            .await
            .map_err(|e| Error::from_kube(&Self::kind(), &name, e))
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), Error> {
        debug!(kind = %Self::kind(), %namespace, %name, "deleting");
        self.api(namespace)
            .delete(name, &DeleteParams::background())
            .await
            .map(|_| ())
            .map_err(|e| Error::from_kube(&Self::kind(), name, e))
    }
}

/// Namespace and name of an object, failing if either is missing
pub fn key_of<K: Resource>(resource: &K) -> Result<(String, String), Error> {
    let meta = resource.meta();
    let name = meta
        .name
        .clone()
        .ok_or_else(|| Error::internal_with_context("kube_utils", "object has no name"))?;
    let namespace = meta.namespace.clone().ok_or_else(|| {
        Error::internal_with_context("kube_utils", format!("{name} has no namespace"))
    })?;
    Ok((namespace, name))
}

// =============================================================================
// CreateOrUpdate
// =============================================================================

/// What [`create_or_update`] did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationResult {
    /// The object did not exist and was created
    Created,
    /// The object existed and was written back after mutation
    Updated,
    /// The object existed and mutation changed nothing
    Unchanged,
}

/// Fetch `desired` by key, then create it or write back the mutated live copy.
///
/// `mutate` runs on the object that will be written: the desired object when
/// creating, the live object otherwise. When mutation leaves the live object
/// equal to what was read, no write is issued.
pub async fn create_or_update<K, C, F>(
    client: &C,
    desired: K,
    mutate: F,
) -> Result<OperationResult, Error>
where
    K: Resource + Clone + PartialEq + Send + Sync + 'static,
    C: ResourceClient<K> + ?Sized,
    F: FnOnce(&mut K) + Send,
{
    let (namespace, name) = key_of(&desired)?;
    match client.get(&namespace, &name).await? {
        None => {
            let mut obj = desired;
            mutate(&mut obj);
            client.create(&obj).await?;
            Ok(OperationResult::Created)
        }
        Some(live) => {
            let mut obj = live.clone();
            mutate(&mut obj);
            if obj == live {
                return Ok(OperationResult::Unchanged);
            }
            client.update(&obj).await?;
            Ok(OperationResult::Updated)
        }
    }
}

// =============================================================================
// Label selectors
// =============================================================================

/// Render a label selector in the `k=v,k in (a,b),!k` string form used by
/// the scale subresource's `status.selector`.
///
/// `matchLabels` come first, sorted by key, followed by `matchExpressions`
/// in declaration order. An empty selector renders as "".
pub fn label_selector_string(selector: &LabelSelector) -> Result<String, Error> {
    Selector::try_from(selector.clone())
        .map(|s| s.to_string())
        .map_err(|e| Error::internal_with_context("selector", format!("invalid label selector: {e}")))
}
