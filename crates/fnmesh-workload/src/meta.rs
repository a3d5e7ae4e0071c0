//! Names, labels and metadata for rendered objects

use std::collections::BTreeMap;

use fnmesh_common::crd::{Component, ComponentKind};
use fnmesh_common::{APP_NAME, LABEL_APP, LABEL_COMPONENT, LABEL_NAME, LABEL_NAMESPACE};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};

/// Name of the headless Service fronting a component's pods
pub fn make_headless_service_name(name: &str) -> String {
    format!("{}-headless", name)
}

/// Labels identifying a component's pods; also its StatefulSet selector
pub fn make_labels(kind: ComponentKind, name: &str, namespace: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_APP.to_string(), APP_NAME.to_string()),
        (LABEL_COMPONENT.to_string(), kind.as_str().to_string()),
        (LABEL_NAME.to_string(), name.to_string()),
        (LABEL_NAMESPACE.to_string(), namespace.to_string()),
    ])
}

/// Metadata for an object named after and owned by the component
pub fn make_object_meta<K: Component>(component: &K) -> ObjectMeta {
    make_object_meta_named(component, component.name_any())
}

pub(crate) fn make_object_meta_named<K: Component>(component: &K, name: String) -> ObjectMeta {
    let namespace = component.namespace().unwrap_or_default();
    ObjectMeta {
        labels: Some(make_labels(
            K::KIND,
            &component.name_any(),
            &namespace,
        )),
        name: Some(name),
        namespace: Some(namespace),
        owner_references: component.controller_owner_ref(&()).map(|r| vec![r]),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statefulset::tests::sample_function;

    #[test]
    fn headless_name_appends_suffix() {
        assert_eq!(make_headless_service_name("mesh-f1"), "mesh-f1-headless");
    }

    #[test]
    fn object_meta_is_owned_by_the_component() {
        let f = sample_function();
        let meta = make_object_meta(&f);
        assert_eq!(meta.name.as_deref(), Some("mesh-f1"));
        assert_eq!(meta.namespace.as_deref(), Some("pulsar"));

        let owners = meta.owner_references.expect("owner refs");
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "Function");
        assert_eq!(owners[0].controller, Some(true));

        let labels = meta.labels.expect("labels");
        assert_eq!(labels["component"], "function");
        assert_eq!(labels["app"], "function-mesh");
    }
}
