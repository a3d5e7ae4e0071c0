//! StatefulSet observe and apply

use fnmesh_common::crd::{
    Component, ConditionStatus, ConditionType, ReconcileAction, ResourceCondition, SubResource,
};
use fnmesh_common::events::{actions, reasons};
use fnmesh_common::kube_utils::{create_or_update, label_selector_string, OperationResult, ResourceClient};
use fnmesh_common::{Error, EventPublisher};
use fnmesh_workload::{make_pod_template, make_stateful_set};
use k8s_openapi::api::apps::v1::StatefulSet;
use kube::ResourceExt;
use tracing::{debug, error};

use super::sub_resource_event;

/// Record the StatefulSet's readiness and drift in the component's status.
///
/// The action is `Create` when the StatefulSet is missing, `Update` when its
/// replica count or pod template differs from the render, `Wait` otherwise.
/// Ready means every desired replica reports ready. Also copies the live
/// replica count and selector into status for the scale subresource.
pub async fn observe_stateful_set<K: Component>(
    component: &mut K,
    client: &dyn ResourceClient<StatefulSet>,
) -> Result<(), Error> {
    let namespace = component.namespace().unwrap_or_default();
    let name = component.name_any();
    let mut condition = ResourceCondition::new(
        ConditionType::StatefulSetReady,
        ConditionStatus::False,
        ReconcileAction::NoAction,
    );

    let live = match client.get(&namespace, &name).await {
        Ok(Some(sts)) => sts,
        Ok(None) => {
            condition.action = ReconcileAction::Create;
            component
                .status_mut()
                .conditions
                .insert(SubResource::StatefulSet, condition);
            return Ok(());
        }
        Err(e) => {
            error!(error = %e, statefulset = %name, "failed to fetch statefulset");
            component
                .status_mut()
                .conditions
                .insert(SubResource::StatefulSet, condition);
            return Err(e);
        }
    };

    let desired_replicas = component.workload().replicas;
    let desired_template = make_pod_template(component);
    let spec = live.spec.as_ref();

    condition.action = ReconcileAction::Wait;
    let replicas_drifted = spec.and_then(|s| s.replicas) != Some(desired_replicas);
    let template_drifted = spec.map(|s| &s.template) != Some(&desired_template);
    if replicas_drifted || template_drifted {
        debug!(replicas_drifted, template_drifted, "statefulset drifted");
        condition.action = ReconcileAction::Update;
    }

    let live_status = live.status.as_ref();
    if live_status.and_then(|s| s.ready_replicas).unwrap_or(0) == desired_replicas {
        condition.status = ConditionStatus::True;
    }

    let status = component.status_mut();
    status.replicas = live_status.map(|s| s.replicas).unwrap_or(0);
    status.conditions.insert(SubResource::StatefulSet, condition);

    if let Some(spec) = spec {
        status.selector = label_selector_string(&spec.selector).map_err(|e| {
            error!(error = %e, statefulset = %name, "failed to render statefulset selector");
            e
        })?;
    }
    Ok(())
}

/// Upsert the StatefulSet by name, replacing the live spec with the render.
///
/// Runs on every pass regardless of the recorded action; an unchanged
/// render issues no write.
pub async fn apply_stateful_set<K: Component>(
    component: &K,
    client: &dyn ResourceClient<StatefulSet>,
    events: &dyn EventPublisher,
) -> Result<(), Error> {
    let desired = make_stateful_set(component);
    let desired_spec = desired.spec.clone();
    let result = create_or_update(client, desired, move |sts| sts.spec = desired_spec)
        .await
        .map_err(|e| {
            error!(error = %e, statefulset = %component.name_any(), "failed to create or update statefulset");
            e
        })?;

    match result {
        OperationResult::Created => {
            sub_resource_event(
                events,
                component,
                reasons::SUBRESOURCE_CREATED,
                actions::CREATE,
                format!("Created StatefulSet {}", component.name_any()),
            )
            .await
        }
        OperationResult::Updated => {
            sub_resource_event(
                events,
                component,
                reasons::SUBRESOURCE_UPDATED,
                actions::UPDATE,
                format!("Updated StatefulSet {}", component.name_any()),
            )
            .await
        }
        OperationResult::Unchanged => {}
    }
    Ok(())
}
