//! Headless Service observe and apply
//!
//! A Service has no readiness of its own, so existing counts as ready. Once
//! created it is never updated: drift between the live object and a fresh
//! render is not reconciled.

use fnmesh_common::crd::{
    Component, ConditionStatus, ConditionType, ReconcileAction, ResourceCondition, SubResource,
};
use fnmesh_common::events::{actions, reasons};
use fnmesh_common::kube_utils::ResourceClient;
use fnmesh_common::{Error, EventPublisher};
use fnmesh_workload::{make_headless_service_name, make_service};
use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;
use tracing::{error, info};

use super::sub_resource_event;

/// Record whether the headless Service exists
pub async fn observe_service<K: Component>(
    component: &mut K,
    client: &dyn ResourceClient<Service>,
) -> Result<(), Error> {
    let namespace = component.namespace().unwrap_or_default();
    let service_name = make_headless_service_name(&component.name_any());
    let mut condition = ResourceCondition::new(
        ConditionType::ServiceReady,
        ConditionStatus::False,
        ReconcileAction::NoAction,
    );

    match client.get(&namespace, &service_name).await {
        Ok(Some(_)) => condition.status = ConditionStatus::True,
        Ok(None) => {
            info!(service = %service_name, "headless service not created yet");
            condition.action = ReconcileAction::Create;
        }
        Err(e) => {
            component
                .status_mut()
                .conditions
                .insert(SubResource::Service, condition);
            return Err(e);
        }
    }

    component
        .status_mut()
        .conditions
        .insert(SubResource::Service, condition);
    Ok(())
}

/// Create the headless Service when the recorded action is `Create`
pub async fn apply_service<K: Component>(
    component: &K,
    client: &dyn ResourceClient<Service>,
    events: &dyn EventPublisher,
) -> Result<(), Error> {
    let Some(condition) = component
        .status()
        .and_then(|s| s.condition(SubResource::Service))
    else {
        return Ok(());
    };
    if condition.is_ready() {
        return Ok(());
    }

    match condition.action {
        ReconcileAction::Create => {
            let service = make_service(component);
            client.create(&service).await.map_err(|e| {
                error!(error = %e, component = %component.name_any(), "failed to create headless service");
                e
            })?;
            sub_resource_event(
                events,
                component,
                reasons::SUBRESOURCE_CREATED,
                actions::CREATE,
                format!("Created Service {}", service.name_any()),
            )
            .await;
        }
        ReconcileAction::Update
        | ReconcileAction::Wait
        | ReconcileAction::NoAction
        | ReconcileAction::Delete => {}
    }
    Ok(())
}
