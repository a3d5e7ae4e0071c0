//! HorizontalPodAutoscaler observe and apply
//!
//! Only active when the workload sets `maxReplicas`. Once the HPA condition
//! is ready, Observe stops reading the live object; a later edit to the
//! live HPA goes unnoticed until the condition is reset.

use fnmesh_common::crd::{
    Component, ConditionStatus, ConditionType, ReconcileAction, ResourceCondition, SubResource,
    WorkloadSpec,
};
use fnmesh_common::events::{actions, reasons};
use fnmesh_common::kube_utils::ResourceClient;
use fnmesh_common::{Error, EventPublisher};
use fnmesh_workload::{desired_hpa_metrics, make_hpa};
use k8s_openapi::api::autoscaling::v2::{HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec};
use kube::ResourceExt;
use tracing::{debug, error, info};

use super::sub_resource_event;

/// Record whether the live HPA matches the desired bound, metrics and behavior
pub async fn observe_hpa<K: Component>(
    component: &mut K,
    client: &dyn ResourceClient<HorizontalPodAutoscaler>,
) -> Result<(), Error> {
    if !component.workload().autoscaling_enabled() {
        return Ok(());
    }

    let existing = component
        .status()
        .and_then(|s| s.condition(SubResource::Hpa))
        .copied();
    match existing {
        None => {
            component.status_mut().conditions.insert(
                SubResource::Hpa,
                ResourceCondition::pending(ConditionType::HpaReady),
            );
            return Ok(());
        }
        Some(condition) if condition.is_ready() => return Ok(()),
        Some(_) => {}
    }

    let namespace = component.namespace().unwrap_or_default();
    let name = component.name_any();
    let Some(live) = client.get(&namespace, &name).await? else {
        info!(hpa = %name, "hpa not created yet");
        return Ok(());
    };

    let spec = live.spec.unwrap_or_default();
    let condition = if hpa_drifted(&spec, component.workload()) {
        debug!(hpa = %name, "hpa drifted");
        ResourceCondition::new(
            ConditionType::HpaReady,
            ConditionStatus::False,
            ReconcileAction::Update,
        )
    } else {
        ResourceCondition::new(
            ConditionType::HpaReady,
            ConditionStatus::True,
            ReconcileAction::NoAction,
        )
    };
    component
        .status_mut()
        .conditions
        .insert(SubResource::Hpa, condition);
    Ok(())
}

/// Create the HPA, or patch the drifted fields of the live one
pub async fn apply_hpa<K: Component>(
    component: &K,
    client: &dyn ResourceClient<HorizontalPodAutoscaler>,
    events: &dyn EventPublisher,
) -> Result<(), Error> {
    let workload = component.workload();
    let Some(max_replicas) = workload.max_replicas else {
        return Ok(());
    };
    let Some(condition) = component
        .status()
        .and_then(|s| s.condition(SubResource::Hpa))
    else {
        return Ok(());
    };
    if condition.is_ready() {
        return Ok(());
    }

    let name = component.name_any();
    match condition.action {
        ReconcileAction::Create => {
            let Some(hpa) = make_hpa(component) else {
                return Ok(());
            };
            client.create(&hpa).await.map_err(|e| {
                error!(error = %e, hpa = %name, "failed to create hpa");
                e
            })?;
            sub_resource_event(
                events,
                component,
                reasons::SUBRESOURCE_CREATED,
                actions::CREATE,
                format!("Created HorizontalPodAutoscaler {name}"),
            )
            .await;
        }
        ReconcileAction::Update => {
            let namespace = component.namespace().unwrap_or_default();
            let mut live = client
                .get(&namespace, &name)
                .await?
                .ok_or_else(|| Error::not_found("HorizontalPodAutoscaler", &name))
                .map_err(|e| {
                    error!(error = %e, hpa = %name, "cannot update missing hpa");
                    e
                })?;

            let spec = live.spec.get_or_insert_with(Default::default);
            if spec.max_replicas != max_replicas {
                spec.max_replicas = max_replicas;
            }
            let metrics = desired_hpa_metrics(workload);
            if spec.metrics.as_ref() != Some(&metrics) {
                spec.metrics = Some(metrics);
            }
            if let Some(behavior) = &workload.pod.auto_scaling_behavior {
                spec.behavior = Some(behavior.clone());
            }

            // no resourceVersion retry: a concurrent edit surfaces as Conflict
            client.update(&live).await.map_err(|e| {
                error!(error = %e, hpa = %name, "failed to update hpa");
                e
            })?;
            sub_resource_event(
                events,
                component,
                reasons::SUBRESOURCE_UPDATED,
                actions::UPDATE,
                format!("Updated HorizontalPodAutoscaler {name}"),
            )
            .await;
        }
        ReconcileAction::Wait | ReconcileAction::NoAction | ReconcileAction::Delete => {}
    }
    Ok(())
}

fn hpa_drifted(live: &HorizontalPodAutoscalerSpec, workload: &WorkloadSpec) -> bool {
    let max_drifted = Some(live.max_replicas) != workload.max_replicas;
    let metrics_drifted =
        live.metrics.as_deref().unwrap_or_default() != desired_hpa_metrics(workload).as_slice();
    let behavior_drifted = workload
        .pod
        .auto_scaling_behavior
        .as_ref()
        .is_some_and(|desired| live.behavior.as_ref() != Some(desired));
    max_drifted || metrics_drifted || behavior_drifted
}
