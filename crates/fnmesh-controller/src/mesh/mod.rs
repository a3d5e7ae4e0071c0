//! FunctionMesh reconciler
//!
//! Observe records one condition per declared entry, reading each child's
//! own status to decide readiness, and marks status entries no longer in
//! the spec as orphans. Update then upserts every declared child, deletes
//! orphans, and writes the mesh status exactly once whatever happened.

mod observe;
mod update;

use std::sync::Arc;

use fnmesh_common::crd::{Component, Function, FunctionMesh, Sink, Source};
use fnmesh_common::events::{actions, reasons};
use fnmesh_common::kube_utils::{KubeResourceClient, ResourceClient};
use fnmesh_common::{Error, EventPublisher, KubeEventPublisher};
use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use crate::ReconcileConfig;

pub use observe::{observe_collection, observe_mesh};
pub use update::{cleanup_orphans, update_mesh, upsert_children};

/// Clients and settings for reconciling FunctionMeshes
pub struct MeshContext {
    /// Client for FunctionMesh status writes
    pub meshes: Arc<dyn ResourceClient<FunctionMesh>>,
    /// Client for child Functions
    pub functions: Arc<dyn ResourceClient<Function>>,
    /// Client for child Sources
    pub sources: Arc<dyn ResourceClient<Source>>,
    /// Client for child Sinks
    pub sinks: Arc<dyn ResourceClient<Sink>>,
    /// Event publisher for child lifecycle events
    pub events: Arc<dyn EventPublisher>,
    /// Requeue timing
    pub config: ReconcileConfig,
}

impl MeshContext {
    /// Create a context backed by a real Kubernetes client
    pub fn from_client(client: Client, config: ReconcileConfig) -> Self {
        Self {
            meshes: Arc::new(KubeResourceClient::<FunctionMesh>::new(client.clone())),
            functions: Arc::new(KubeResourceClient::<Function>::new(client.clone())),
            sources: Arc::new(KubeResourceClient::<Source>::new(client.clone())),
            sinks: Arc::new(KubeResourceClient::<Sink>::new(client.clone())),
            events: Arc::new(KubeEventPublisher::new(client, "functionmesh-controller")),
            config,
        }
    }

    /// Create a context for testing with a no-op event publisher
    #[cfg(test)]
    pub fn for_testing(
        meshes: Arc<dyn ResourceClient<FunctionMesh>>,
        functions: Arc<dyn ResourceClient<Function>>,
        sources: Arc<dyn ResourceClient<Source>>,
        sinks: Arc<dyn ResourceClient<Sink>>,
    ) -> Self {
        Self {
            meshes,
            functions,
            sources,
            sinks,
            events: Arc::new(fnmesh_common::NoopEventPublisher),
            config: ReconcileConfig::default(),
        }
    }
}

/// A component kind a mesh declares, with its client in [`MeshContext`]
pub trait MeshChild: Component {
    /// The client for this kind
    fn client(ctx: &MeshContext) -> &dyn ResourceClient<Self>;
}

impl MeshChild for Function {
    fn client(ctx: &MeshContext) -> &dyn ResourceClient<Self> {
        ctx.functions.as_ref()
    }
}

impl MeshChild for Source {
    fn client(ctx: &MeshContext) -> &dyn ResourceClient<Self> {
        ctx.sources.as_ref()
    }
}

impl MeshChild for Sink {
    fn client(ctx: &MeshContext) -> &dyn ResourceClient<Self> {
        ctx.sinks.as_ref()
    }
}

/// Reconcile one FunctionMesh
#[instrument(skip(mesh, ctx), fields(mesh = %mesh.name_any()))]
pub async fn reconcile(mesh: Arc<FunctionMesh>, ctx: Arc<MeshContext>) -> Result<Action, Error> {
    info!("reconciling function mesh");

    if let Err(e) = mesh.spec.validate(&mesh.name_any()) {
        warn!(error = %e, "function mesh spec is invalid");
        ctx.events
            .publish(
                &mesh.object_ref(&()),
                EventType::Warning,
                reasons::VALIDATION_FAILED,
                actions::RECONCILE,
                Some(e.to_string()),
            )
            .await;
        return Err(e);
    }

    let mut mesh = (*mesh).clone();
    observe_mesh(&mut mesh, &ctx).await?;
    mesh.status.get_or_insert_with(Default::default).observed_generation = mesh.metadata.generation;
    update_mesh(&mut mesh, &ctx).await?;

    debug!("function mesh reconciled");
    Ok(Action::requeue(ctx.config.resync_interval))
}

/// Requeue retryable failures after the backoff, park the rest until the mesh changes
pub fn error_policy(mesh: Arc<FunctionMesh>, error: &Error, ctx: Arc<MeshContext>) -> Action {
    error!(?error, mesh = %mesh.name_any(), "function mesh reconciliation failed");
    if error.is_retryable() {
        Action::requeue(ctx.config.error_backoff)
    } else {
        Action::await_change()
    }
}
