//! Function CRD
//!
//! A Pulsar Function consumes input topics, runs user code per message and
//! publishes to an output topic.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::component::ComponentStatus;
use super::workload::{InputConf, OutputConf, WorkloadSpec};

/// A Pulsar Function running as a StatefulSet
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "compute.functionmesh.io",
    version = "v1alpha1",
    kind = "Function",
    plural = "functions",
    shortname = "fn",
    namespaced,
    status = "ComponentStatus",
    derive = "PartialEq",
    scale = r#"{"specReplicasPath":".spec.replicas","statusReplicasPath":".status.replicas","labelSelectorPath":".status.selector"}"#,
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".status.replicas"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    /// Shared workload settings
    #[serde(flatten)]
    pub workload: WorkloadSpec,

    /// Topics consumed
    #[serde(default)]
    pub input: InputConf,

    /// Topic produced to
    #[serde(default)]
    pub output: OutputConf,

    /// Topic receiving the function's log output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_topic: Option<String>,
}
