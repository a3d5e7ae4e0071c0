//! Controller runner - builds one controller future per watched kind

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::Service;
use kube::core::NamespaceResourceScope;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, Resource};

use fnmesh_common::crd::{Component, Function, FunctionMesh, Sink, Source};
use fnmesh_controller::component::{self, ComponentContext};
use fnmesh_controller::mesh::{self, MeshContext};
use fnmesh_controller::ReconcileConfig;

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// A running controller
pub type ControllerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

fn watcher_config() -> WatcherConfig {
    WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS)
}

fn api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Build the FunctionMesh controller, woken by changes to its children
pub fn build_mesh_controller(
    client: Client,
    namespace: Option<&str>,
    config: ReconcileConfig,
) -> ControllerFuture {
    let ctx = Arc::new(MeshContext::from_client(client.clone(), config));
    tracing::info!("- FunctionMesh controller");

    Box::pin(
        Controller::new(api::<FunctionMesh>(&client, namespace), watcher_config())
            .owns(api::<Function>(&client, namespace), watcher_config())
            .owns(api::<Source>(&client, namespace), watcher_config())
            .owns(api::<Sink>(&client, namespace), watcher_config())
            .shutdown_on_signal()
            .run(mesh::reconcile, mesh::error_policy, ctx)
            .for_each(log_reconcile_result("FunctionMesh")),
    )
}

/// Build the controller for one component kind, woken by changes to its sub-resources
pub fn build_component_controller<K: Component>(
    client: Client,
    namespace: Option<&str>,
    config: ReconcileConfig,
) -> ControllerFuture {
    let ctx = Arc::new(ComponentContext::<K>::from_client(client.clone(), config));
    tracing::info!("- {} controller", K::KIND);

    Box::pin(
        Controller::new(api::<K>(&client, namespace), watcher_config())
            .owns(api::<StatefulSet>(&client, namespace), watcher_config())
            .owns(api::<Service>(&client, namespace), watcher_config())
            .owns(
                api::<HorizontalPodAutoscaler>(&client, namespace),
                watcher_config(),
            )
            .shutdown_on_signal()
            .run(component::reconcile::<K>, component::error_policy::<K>, ctx)
            .for_each(log_reconcile_result(K::KIND.as_str())),
    )
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
