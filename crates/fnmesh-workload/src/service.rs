//! Headless Service rendering

use fnmesh_common::crd::Component;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use crate::meta::{make_headless_service_name, make_labels, make_object_meta_named};
use crate::{METRICS_PORT, METRICS_PORT_NAME};

/// Render the headless Service giving each instance a stable DNS name
pub fn make_service<K: Component>(component: &K) -> Service {
    let name = component.name_any();
    let namespace = component.namespace().unwrap_or_default();

    Service {
        metadata: make_object_meta_named(component, make_headless_service_name(&name)),
        spec: Some(ServiceSpec {
            cluster_ip: Some("None".to_string()),
            selector: Some(make_labels(K::KIND, &name, &namespace)),
            ports: Some(vec![ServicePort {
                name: Some(METRICS_PORT_NAME.to_string()),
                port: METRICS_PORT,
                target_port: Some(IntOrString::String(METRICS_PORT_NAME.to_string())),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statefulset::tests::sample_function;
    use crate::make_stateful_set;

    #[test]
    fn service_is_headless_and_named_with_suffix() {
        let f = sample_function();
        let svc = make_service(&f);
        assert_eq!(svc.metadata.name.as_deref(), Some("mesh-f1-headless"));
        assert_eq!(
            svc.metadata.owner_references.as_ref().map(|o| o[0].name.as_str()),
            Some("mesh-f1")
        );
        let spec = svc.spec.expect("spec");
        assert_eq!(spec.cluster_ip.as_deref(), Some("None"));
        assert_eq!(spec.ports.expect("ports")[0].port, METRICS_PORT);
    }

    #[test]
    fn service_selects_the_stateful_set_pods() {
        let f = sample_function();
        let selector = make_service(&f).spec.and_then(|s| s.selector);
        let sts_selector = make_stateful_set(&f)
            .spec
            .and_then(|s| s.selector.match_labels);
        assert_eq!(selector, sts_selector);
    }
}
