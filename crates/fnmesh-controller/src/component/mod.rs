//! Component reconciler shared by Function, Source and Sink
//!
//! One pass observes the StatefulSet, headless Service and HPA into the
//! component's status, persists that status, then applies whatever actions
//! the observations recorded. Apply reads only the status written by the
//! same pass, never re-deciding what to do.

mod hpa;
mod service;
mod statefulset;

use std::marker::PhantomData;
use std::sync::Arc;

use fnmesh_common::crd::Component;
use fnmesh_common::events::{actions, reasons};
use fnmesh_common::kube_utils::{KubeResourceClient, ResourceClient};
use fnmesh_common::{Error, EventPublisher, KubeEventPublisher};
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::Service;
use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use crate::ReconcileConfig;

pub use hpa::{apply_hpa, observe_hpa};
pub use service::{apply_service, observe_service};
pub use statefulset::{apply_stateful_set, observe_stateful_set};

// =============================================================================
// Context
// =============================================================================

/// Clients and settings for reconciling components of kind `K`
pub struct ComponentContext<K> {
    /// Client for the component kind itself
    pub components: Arc<dyn ResourceClient<K>>,
    /// Client for StatefulSets
    pub stateful_sets: Arc<dyn ResourceClient<StatefulSet>>,
    /// Client for Services
    pub services: Arc<dyn ResourceClient<Service>>,
    /// Client for HorizontalPodAutoscalers
    pub hpas: Arc<dyn ResourceClient<HorizontalPodAutoscaler>>,
    /// Event publisher for sub-resource lifecycle events
    pub events: Arc<dyn EventPublisher>,
    /// Requeue timing
    pub config: ReconcileConfig,
    _kind: PhantomData<fn() -> K>,
}

impl<K: Component> ComponentContext<K> {
    /// Create a context from explicit clients
    pub fn new(
        components: Arc<dyn ResourceClient<K>>,
        stateful_sets: Arc<dyn ResourceClient<StatefulSet>>,
        services: Arc<dyn ResourceClient<Service>>,
        hpas: Arc<dyn ResourceClient<HorizontalPodAutoscaler>>,
        events: Arc<dyn EventPublisher>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            components,
            stateful_sets,
            services,
            hpas,
            events,
            config,
            _kind: PhantomData,
        }
    }

    /// Create a context backed by a real Kubernetes client
    pub fn from_client(client: Client, config: ReconcileConfig) -> Self {
        let controller = format!("{}-controller", K::KIND.as_str());
        Self::new(
            Arc::new(KubeResourceClient::<K>::new(client.clone())),
            Arc::new(KubeResourceClient::<StatefulSet>::new(client.clone())),
            Arc::new(KubeResourceClient::<Service>::new(client.clone())),
            Arc::new(KubeResourceClient::<HorizontalPodAutoscaler>::new(
                client.clone(),
            )),
            Arc::new(KubeEventPublisher::new(client, &controller)),
            config,
        )
    }

    /// Create a context for testing with a no-op event publisher
    #[cfg(test)]
    pub fn for_testing(
        components: Arc<dyn ResourceClient<K>>,
        stateful_sets: Arc<dyn ResourceClient<StatefulSet>>,
        services: Arc<dyn ResourceClient<Service>>,
        hpas: Arc<dyn ResourceClient<HorizontalPodAutoscaler>>,
    ) -> Self {
        Self::new(
            components,
            stateful_sets,
            services,
            hpas,
            Arc::new(fnmesh_common::NoopEventPublisher),
            ReconcileConfig::default(),
        )
    }
}

// =============================================================================
// Reconcile
// =============================================================================

/// Reconcile one Function, Source or Sink
#[instrument(skip(component, ctx), fields(kind = %K::KIND, component = %component.name_any()))]
pub async fn reconcile<K: Component>(
    component: Arc<K>,
    ctx: Arc<ComponentContext<K>>,
) -> Result<Action, Error> {
    info!("reconciling component");

    if let Err(e) = component.workload().validate(&component.name_any(), "spec") {
        warn!(error = %e, "component spec is invalid");
        ctx.events
            .publish(
                &component.object_ref(&()),
                EventType::Warning,
                reasons::VALIDATION_FAILED,
                actions::RECONCILE,
                Some(e.to_string()),
            )
            .await;
        return Err(e);
    }

    let mut component = (*component).clone();
    observe(&mut component, &ctx).await?;

    component.status_mut().observed_generation = component.meta().generation;
    ctx.components.update_status(&component).await.map_err(|e| {
        error!(error = %e, "failed to update component status");
        e
    })?;

    apply(&component, &ctx).await?;

    debug!("component reconciled");
    Ok(Action::requeue(ctx.config.resync_interval))
}

/// Record the state of every sub-resource in the component's status
pub async fn observe<K: Component>(
    component: &mut K,
    ctx: &ComponentContext<K>,
) -> Result<(), Error> {
    observe_stateful_set(component, ctx.stateful_sets.as_ref()).await?;
    observe_service(component, ctx.services.as_ref()).await?;
    observe_hpa(component, ctx.hpas.as_ref()).await?;
    Ok(())
}

/// Carry out the actions recorded by [`observe`]
pub async fn apply<K: Component>(component: &K, ctx: &ComponentContext<K>) -> Result<(), Error> {
    apply_stateful_set(component, ctx.stateful_sets.as_ref(), ctx.events.as_ref()).await?;
    apply_service(component, ctx.services.as_ref(), ctx.events.as_ref()).await?;
    apply_hpa(component, ctx.hpas.as_ref(), ctx.events.as_ref()).await?;
    Ok(())
}

/// Requeue retryable failures after the backoff, park the rest until the object changes
pub fn error_policy<K: Component>(
    component: Arc<K>,
    error: &Error,
    ctx: Arc<ComponentContext<K>>,
) -> Action {
    error!(
        ?error,
        kind = %K::KIND,
        component = %component.name_any(),
        "component reconciliation failed"
    );
    if error.is_retryable() {
        Action::requeue(ctx.config.error_backoff)
    } else {
        Action::await_change()
    }
}

/// Emit a Normal event about a sub-resource write
pub(crate) async fn sub_resource_event<K: Component>(
    events: &dyn EventPublisher,
    component: &K,
    reason: &str,
    action: &str,
    note: String,
) {
    events
        .publish(
            &component.object_ref(&()),
            EventType::Normal,
            reason,
            action,
            Some(note),
        )
        .await;
}
