//! Workload settings shared by Function, Source and Sink specs
//!
//! Each component spec flattens a [`WorkloadSpec`] so the three CRDs expose
//! the same top-level fields for naming, sizing, pod shape, runtime and
//! Pulsar connectivity.

use std::collections::BTreeMap;

use k8s_openapi::api::autoscaling::v2::{HorizontalPodAutoscalerBehavior, MetricSpec};
use k8s_openapi::api::core::v1::ResourceRequirements;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

// =============================================================================
// Autoscaling rules
// =============================================================================

/// Canned autoscaling rules, each expanding to one resource-utilization metric
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum BuiltinHpaRule {
    /// Average CPU utilization of 80%
    #[serde(rename = "AverageUtilizationCPUPercent80")]
    AverageUtilizationCpuPercent80,
    /// Average CPU utilization of 50%
    #[serde(rename = "AverageUtilizationCPUPercent50")]
    AverageUtilizationCpuPercent50,
    /// Average CPU utilization of 20%
    #[serde(rename = "AverageUtilizationCPUPercent20")]
    AverageUtilizationCpuPercent20,
    /// Average memory utilization of 80%
    AverageUtilizationMemoryPercent80,
    /// Average memory utilization of 50%
    AverageUtilizationMemoryPercent50,
    /// Average memory utilization of 20%
    AverageUtilizationMemoryPercent20,
}

impl BuiltinHpaRule {
    /// Resource name the rule scales on ("cpu" or "memory")
    pub fn resource(&self) -> &'static str {
        match self {
            Self::AverageUtilizationCpuPercent80
            | Self::AverageUtilizationCpuPercent50
            | Self::AverageUtilizationCpuPercent20 => "cpu",
            Self::AverageUtilizationMemoryPercent80
            | Self::AverageUtilizationMemoryPercent50
            | Self::AverageUtilizationMemoryPercent20 => "memory",
        }
    }

    /// Target average utilization percentage
    pub fn target_percent(&self) -> i32 {
        match self {
            Self::AverageUtilizationCpuPercent80 | Self::AverageUtilizationMemoryPercent80 => 80,
            Self::AverageUtilizationCpuPercent50 | Self::AverageUtilizationMemoryPercent50 => 50,
            Self::AverageUtilizationCpuPercent20 | Self::AverageUtilizationMemoryPercent20 => 20,
        }
    }
}

// =============================================================================
// Pod policy
// =============================================================================

/// Pod-level settings applied to the rendered StatefulSet and HPA
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodPolicy {
    /// Extra labels added to every pod
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Annotations added to every pod
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Node selector for pod placement
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// Grace period before a terminating pod is killed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_grace_period_seconds: Option<i64>,

    /// Service account the pods run as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_name: Option<String>,

    /// Explicit HPA metrics, used when no builtin rule is set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auto_scaling_metrics: Vec<MetricSpec>,

    /// HPA scaling behavior
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scaling_behavior: Option<HorizontalPodAutoscalerBehavior>,

    /// Canned rules expanded into HPA metrics; take precedence over explicit metrics
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub builtin_autoscaler: Vec<BuiltinHpaRule>,
}

// =============================================================================
// Runtime
// =============================================================================

/// Java runtime: a jar run by the Pulsar Java instance
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JavaRuntime {
    /// Path of the jar inside the image
    pub jar: String,
    /// Package URL the jar is downloaded from, if not baked into the image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jar_location: Option<String>,
}

/// Python runtime: a module or archive run by the Pulsar Python instance
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PythonRuntime {
    /// Path of the .py, .zip or .whl inside the image
    pub py: String,
    /// Package URL the file is downloaded from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub py_location: Option<String>,
}

/// Go runtime: a compiled binary
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoRuntime {
    /// Path of the binary inside the image
    pub go: String,
    /// Package URL the binary is downloaded from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub go_location: Option<String>,
}

/// Runtime selection; exactly one must be set
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Runtime {
    /// Java runtime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub java: Option<JavaRuntime>,
    /// Python runtime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<PythonRuntime>,
    /// Go runtime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub golang: Option<GoRuntime>,
}

impl Runtime {
    /// Number of runtimes configured
    pub fn configured(&self) -> usize {
        [
            self.java.is_some(),
            self.python.is_some(),
            self.golang.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

// =============================================================================
// Messaging
// =============================================================================

/// How pods reach the Pulsar cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PulsarMessaging {
    /// ConfigMap holding `webServiceURL` and `brokerServiceURL`
    #[serde(default)]
    pub pulsar_config: String,
    /// Secret holding `clientAuthenticationPlugin` and `clientAuthenticationParameters`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_secret: Option<String>,
    /// Secret holding the TLS trust certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_secret: Option<String>,
}

/// Topics a function or sink consumes
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InputConf {
    /// Input topics
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    /// Regex subscribing to every matching topic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_pattern: Option<String>,
    /// Java class of the input messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_class_name: Option<String>,
}

/// Topic a function or source produces to
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutputConf {
    /// Output topic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Java class of the output messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_class_name: Option<String>,
}

// =============================================================================
// WorkloadSpec
// =============================================================================

fn default_replicas() -> i32 {
    1
}

/// Settings shared by every component kind
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSpec {
    /// Entry name, unique within its mesh collection
    pub name: String,

    /// Fully qualified class implementing the function, source or sink
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    /// Pulsar tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,

    /// Pulsar namespace (not the Kubernetes namespace)
    #[serde(default, rename = "namespace", skip_serializing_if = "Option::is_none")]
    pub pulsar_namespace: Option<String>,

    /// Desired instance count
    #[serde(default = "default_replicas")]
    pub replicas: i32,

    /// Upper bound for autoscaling; setting it enables the HPA
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,

    /// Container image
    pub image: String,

    /// Image pull policy (Always, IfNotPresent, Never)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,

    /// Container resource requests and limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Pod-level settings
    #[serde(default)]
    pub pod: PodPolicy,

    /// Runtime running the user code
    #[serde(default)]
    pub runtime: Runtime,

    /// Pulsar connectivity
    #[serde(default)]
    pub pulsar: PulsarMessaging,

    /// User configuration passed to the instance
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
}

impl Default for WorkloadSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            class_name: None,
            tenant: None,
            pulsar_namespace: None,
            replicas: default_replicas(),
            max_replicas: None,
            image: String::new(),
            image_pull_policy: None,
            resources: None,
            pod: PodPolicy::default(),
            runtime: Runtime::default(),
            pulsar: PulsarMessaging::default(),
            config: BTreeMap::new(),
        }
    }
}

impl WorkloadSpec {
    /// True when an HPA should exist for this workload
    pub fn autoscaling_enabled(&self) -> bool {
        self.max_replicas.is_some()
    }

    /// Validate the workload settings.
    ///
    /// `path` is the field path reported in errors, e.g. `spec.functions[0]`.
    pub fn validate(&self, resource: &str, path: &str) -> Result<(), Error> {
        validate_dns_label(&self.name)
            .map_err(|msg| Error::validation_for_field(resource, format!("{path}.name"), msg))?;

        if self.replicas < 1 {
            return Err(Error::validation_for_field(
                resource,
                format!("{path}.replicas"),
                format!("replicas must be at least 1, got {}", self.replicas),
            ));
        }

        if let Some(max) = self.max_replicas {
            if max < self.replicas {
                return Err(Error::validation_for_field(
                    resource,
                    format!("{path}.maxReplicas"),
                    format!(
                        "maxReplicas ({max}) must not be below replicas ({})",
                        self.replicas
                    ),
                ));
            }
        }

        if self.image.trim().is_empty() {
            return Err(Error::validation_for_field(
                resource,
                format!("{path}.image"),
                "image is required",
            ));
        }

        if self.runtime.configured() != 1 {
            return Err(Error::validation_for_field(
                resource,
                format!("{path}.runtime"),
                "exactly one of java, python or golang must be set",
            ));
        }

        Ok(())
    }
}

/// Validate an RFC 1123 DNS label (lowercase alphanumeric and hyphens,
/// starting and ending alphanumeric, at most 63 characters).
pub(crate) fn validate_dns_label(s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err("name cannot be empty".to_string());
    }
    if s.len() > 63 {
        return Err(format!("name must be at most 63 characters: {}", s));
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(format!(
            "name must be lowercase alphanumeric with hyphens: {}",
            s
        ));
    }
    if s.starts_with('-') || s.ends_with('-') {
        return Err(format!("name cannot start or end with a hyphen: {}", s));
    }
    Ok(())
}
