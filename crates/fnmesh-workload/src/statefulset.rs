//! StatefulSet rendering

use std::collections::BTreeMap;

use fnmesh_common::crd::{Component, ComponentSpec};
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapEnvSource, Container, ContainerPort, EnvFromSource, EnvVar, EnvVarSource,
    ObjectFieldSelector, PodSpec, PodTemplateSpec, SecretEnvSource, SecretVolumeSource, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::ResourceExt;

use crate::command::make_command;
use crate::meta::{make_headless_service_name, make_labels, make_object_meta};
use crate::{METRICS_PORT, METRICS_PORT_NAME, TLS_MOUNT_PATH};

const TLS_VOLUME: &str = "pulsar-tls";

/// Render the StatefulSet running a component's instances
pub fn make_stateful_set<K: Component>(component: &K) -> StatefulSet {
    let name = component.name_any();
    let namespace = component.namespace().unwrap_or_default();
    let workload = component.workload();

    StatefulSet {
        metadata: make_object_meta(component),
        spec: Some(StatefulSetSpec {
            replicas: Some(workload.replicas),
            selector: LabelSelector {
                match_labels: Some(make_labels(K::KIND, &name, &namespace)),
                match_expressions: None,
            },
            service_name: Some(make_headless_service_name(&name)),
            pod_management_policy: Some("Parallel".to_string()),
            template: make_pod_template(component),
            ..Default::default()
        }),
        status: None,
    }
}

/// Render the pod template; Observe diffs the live template against this
pub fn make_pod_template<K: Component>(component: &K) -> PodTemplateSpec {
    let name = component.name_any();
    let namespace = component.namespace().unwrap_or_default();
    let workload = component.spec().workload();
    let pod = &workload.pod;

    let mut labels = make_labels(K::KIND, &name, &namespace);
    labels.extend(pod.labels.clone());

    let tls = workload.pulsar.tls_secret.as_ref();

    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(labels),
            annotations: non_empty(&pod.annotations),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            containers: vec![make_container(component)],
            node_selector: non_empty(&pod.node_selector),
            termination_grace_period_seconds: pod.termination_grace_period_seconds,
            service_account_name: pod.service_account_name.clone(),
            volumes: tls.map(|secret| {
                vec![Volume {
                    name: TLS_VOLUME.to_string(),
                    secret: Some(SecretVolumeSource {
                        secret_name: Some(secret.clone()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]
            }),
            ..Default::default()
        }),
    }
}

fn make_container<K: Component>(component: &K) -> Container {
    let workload = component.spec().workload();
    let pulsar = &workload.pulsar;

    let mut env_from = vec![EnvFromSource {
        config_map_ref: Some(ConfigMapEnvSource {
            name: pulsar.pulsar_config.clone(),
            optional: None,
        }),
        ..Default::default()
    }];
    if let Some(secret) = &pulsar.auth_secret {
        env_from.push(EnvFromSource {
            secret_ref: Some(SecretEnvSource {
                name: secret.clone(),
                optional: None,
            }),
            ..Default::default()
        });
    }

    Container {
        name: K::KIND.as_str().to_string(),
        image: Some(workload.image.clone()),
        image_pull_policy: workload.image_pull_policy.clone(),
        command: Some(make_command(component)),
        env: Some(vec![EnvVar {
            name: "POD_NAME".to_string(),
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path: "metadata.name".to_string(),
                    api_version: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]),
        env_from: Some(env_from),
        ports: Some(vec![ContainerPort {
            name: Some(METRICS_PORT_NAME.to_string()),
            container_port: METRICS_PORT,
            ..Default::default()
        }]),
        resources: workload.resources.clone(),
        volume_mounts: pulsar.tls_secret.as_ref().map(|_| {
            vec![VolumeMount {
                name: TLS_VOLUME.to_string(),
                mount_path: TLS_MOUNT_PATH.to_string(),
                read_only: Some(true),
                ..Default::default()
            }]
        }),
        ..Default::default()
    }
}

fn non_empty(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    if map.is_empty() {
        None
    } else {
        Some(map.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use fnmesh_common::crd::{Function, FunctionSpec, JavaRuntime, PulsarMessaging, Runtime, WorkloadSpec};

    /// A Function as the mesh controller would have created it
    pub(crate) fn sample_function() -> Function {
        let mut f = Function::new(
            "mesh-f1",
            FunctionSpec {
                workload: WorkloadSpec {
                    name: "f1".to_string(),
                    replicas: 3,
                    image: "streamnative/pulsar-functions-java-runner:3.1".to_string(),
                    runtime: Runtime {
                        java: Some(JavaRuntime {
                            jar: "/pulsar/examples/api-examples.jar".to_string(),
                            jar_location: None,
                        }),
                        ..Default::default()
                    },
                    pulsar: PulsarMessaging {
                        pulsar_config: "mesh-pulsar".to_string(),
                        ..Default::default()
                    },
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        f.metadata.namespace = Some("pulsar".to_string());
        f.metadata.uid = Some("f1-uid".to_string());
        f
    }

    #[test]
    fn stateful_set_runs_desired_replicas_behind_headless_service() {
        let f = sample_function();
        let sts = make_stateful_set(&f);
        let spec = sts.spec.expect("spec");

        assert_eq!(sts.metadata.name.as_deref(), Some("mesh-f1"));
        assert_eq!(spec.replicas, Some(3));
        assert_eq!(spec.service_name.as_deref(), Some("mesh-f1-headless"));
        assert_eq!(spec.pod_management_policy.as_deref(), Some("Parallel"));

        let selector = spec.selector.match_labels.expect("selector");
        let pod_labels = spec
            .template
            .metadata
            .and_then(|m| m.labels)
            .expect("pod labels");
        for (k, v) in &selector {
            assert_eq!(pod_labels.get(k), Some(v), "pod labels must match selector");
        }
    }

    #[test]
    fn container_reads_pulsar_config_from_config_map() {
        let f = sample_function();
        let template = make_pod_template(&f);
        let container = &template.spec.expect("pod spec").containers[0];

        assert_eq!(container.name, "function");
        let env_from = container.env_from.as_ref().expect("env_from");
        assert_eq!(
            env_from[0].config_map_ref.as_ref().map(|c| c.name.as_str()),
            Some("mesh-pulsar")
        );
        assert!(container.volume_mounts.is_none());
    }

    #[test]
    fn tls_and_auth_secrets_are_wired_in() {
        let mut f = sample_function();
        f.spec.workload.pulsar.tls_secret = Some("pulsar-ca".to_string());
        f.spec.workload.pulsar.auth_secret = Some("pulsar-token".to_string());

        let pod = make_pod_template(&f).spec.expect("pod spec");
        let volumes = pod.volumes.expect("volumes");
        assert_eq!(volumes[0].name, TLS_VOLUME);

        let container = &pod.containers[0];
        assert_eq!(
            container.volume_mounts.as_ref().map(|m| m[0].mount_path.as_str()),
            Some(TLS_MOUNT_PATH)
        );
        let env_from = container.env_from.as_ref().expect("env_from");
        assert_eq!(env_from.len(), 2);
        assert_eq!(
            env_from[1].secret_ref.as_ref().map(|s| s.name.as_str()),
            Some("pulsar-token")
        );
    }

    #[test]
    fn pod_policy_labels_and_annotations_reach_the_template() {
        let mut f = sample_function();
        f.spec
            .workload
            .pod
            .labels
            .insert("team".to_string(), "data".to_string());
        f.spec
            .workload
            .pod
            .annotations
            .insert("prometheus.io/scrape".to_string(), "true".to_string());

        let meta = make_pod_template(&f).metadata.expect("metadata");
        assert_eq!(meta.labels.expect("labels")["team"], "data");
        assert_eq!(
            meta.annotations.expect("annotations")["prometheus.io/scrape"],
            "true"
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let f = sample_function();
        assert_eq!(make_stateful_set(&f), make_stateful_set(&f));
        assert_eq!(make_pod_template(&f), make_pod_template(&f.clone()));
    }

    #[test]
    fn replica_changes_do_not_touch_unrelated_template_fields() {
        let f = sample_function();
        let mut scaled = f.clone();
        scaled.spec.workload.replicas = 5;
        let a = make_pod_template(&f).spec.expect("spec");
        let b = make_pod_template(&scaled).spec.expect("spec");
        assert_eq!(a.containers[0].image, b.containers[0].image);
        assert_eq!(a.containers[0].env_from, b.containers[0].env_from);
    }
}
