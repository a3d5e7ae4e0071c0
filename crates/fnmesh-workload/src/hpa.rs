//! HorizontalPodAutoscaler rendering
//!
//! Metrics resolve in a fixed order: builtin rules when any are set, else
//! the explicit metric list, else CPU at 80% average utilization. Observe
//! and Apply use [`desired_hpa_metrics`] so both agree on what "desired" is.

use std::collections::HashSet;

use fnmesh_common::crd::{BuiltinHpaRule, Component, WorkloadSpec};
use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec, MetricSpec,
    MetricTarget, ResourceMetricSource,
};
use kube::ResourceExt;

use crate::meta::make_object_meta;

/// Render the HPA for a component, `None` when autoscaling is disabled
pub fn make_hpa<K: Component>(component: &K) -> Option<HorizontalPodAutoscaler> {
    let workload = component.workload();
    let max_replicas = workload.max_replicas?;

    Some(HorizontalPodAutoscaler {
        metadata: make_object_meta(component),
        spec: Some(HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some("apps/v1".to_string()),
                kind: "StatefulSet".to_string(),
                name: component.name_any(),
            },
            min_replicas: Some(workload.replicas),
            max_replicas,
            metrics: Some(desired_hpa_metrics(workload)),
            behavior: workload.pod.auto_scaling_behavior.clone(),
        }),
        status: None,
    })
}

/// Metrics the HPA of this workload should carry
pub fn desired_hpa_metrics(workload: &WorkloadSpec) -> Vec<MetricSpec> {
    let pod = &workload.pod;
    if !pod.builtin_autoscaler.is_empty() {
        make_metrics_from_builtin_rules(&pod.builtin_autoscaler)
    } else if !pod.auto_scaling_metrics.is_empty() {
        pod.auto_scaling_metrics.clone()
    } else {
        default_hpa_metrics()
    }
}

/// Expand builtin rules into resource metrics, keeping order and dropping repeats
pub fn make_metrics_from_builtin_rules(rules: &[BuiltinHpaRule]) -> Vec<MetricSpec> {
    let mut seen = HashSet::new();
    rules
        .iter()
        .filter(|rule| seen.insert(**rule))
        .map(|rule| utilization_metric(rule.resource(), rule.target_percent()))
        .collect()
}

/// CPU at 80% average utilization
pub fn default_hpa_metrics() -> Vec<MetricSpec> {
    vec![utilization_metric("cpu", 80)]
}

fn utilization_metric(resource: &str, percent: i32) -> MetricSpec {
    MetricSpec {
        type_: "Resource".to_string(),
        resource: Some(ResourceMetricSource {
            name: resource.to_string(),
            target: MetricTarget {
                type_: "Utilization".to_string(),
                average_utilization: Some(percent),
                ..Default::default()
            },
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statefulset::tests::sample_function;
    use k8s_openapi::api::autoscaling::v2::{HPAScalingRules, HorizontalPodAutoscalerBehavior};

    fn resource_of(metric: &MetricSpec) -> (&str, Option<i32>) {
        let r = metric.resource.as_ref().expect("resource metric");
        (r.name.as_str(), r.target.average_utilization)
    }

    #[test]
    fn no_hpa_without_max_replicas() {
        assert!(make_hpa(&sample_function()).is_none());
    }

    #[test]
    fn hpa_targets_the_stateful_set_between_replicas_and_max() {
        let mut f = sample_function();
        f.spec.workload.max_replicas = Some(10);
        let hpa = make_hpa(&f).expect("hpa");
        let spec = hpa.spec.expect("spec");

        assert_eq!(hpa.metadata.name.as_deref(), Some("mesh-f1"));
        assert_eq!(spec.scale_target_ref.kind, "StatefulSet");
        assert_eq!(spec.scale_target_ref.name, "mesh-f1");
        assert_eq!(spec.min_replicas, Some(3));
        assert_eq!(spec.max_replicas, 10);
        assert_eq!(spec.metrics, Some(default_hpa_metrics()));
    }

    #[test]
    fn builtin_rules_expand_in_order_without_duplicates() {
        let metrics = make_metrics_from_builtin_rules(&[
            BuiltinHpaRule::AverageUtilizationMemoryPercent50,
            BuiltinHpaRule::AverageUtilizationCpuPercent20,
            BuiltinHpaRule::AverageUtilizationMemoryPercent50,
        ]);
        assert_eq!(metrics.len(), 2);
        assert_eq!(resource_of(&metrics[0]), ("memory", Some(50)));
        assert_eq!(resource_of(&metrics[1]), ("cpu", Some(20)));
    }

    #[test]
    fn builtin_rules_take_precedence_over_explicit_metrics() {
        let mut f = sample_function();
        f.spec.workload.pod.auto_scaling_metrics = vec![utilization_metric("memory", 70)];
        assert_eq!(
            resource_of(&desired_hpa_metrics(&f.spec.workload)[0]),
            ("memory", Some(70))
        );

        f.spec.workload.pod.builtin_autoscaler =
            vec![BuiltinHpaRule::AverageUtilizationCpuPercent50];
        assert_eq!(
            resource_of(&desired_hpa_metrics(&f.spec.workload)[0]),
            ("cpu", Some(50))
        );
    }

    #[test]
    fn behavior_is_copied_from_pod_policy() {
        let mut f = sample_function();
        f.spec.workload.max_replicas = Some(4);
        let behavior = HorizontalPodAutoscalerBehavior {
            scale_down: Some(HPAScalingRules {
                stabilization_window_seconds: Some(120),
                ..Default::default()
            }),
            scale_up: None,
        };
        f.spec.workload.pod.auto_scaling_behavior = Some(behavior.clone());
        let spec = make_hpa(&f).and_then(|h| h.spec).expect("spec");
        assert_eq!(spec.behavior, Some(behavior));
    }
}
