//! Sink CRD

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::component::ComponentStatus;
use super::workload::{InputConf, WorkloadSpec};

/// A Pulsar IO sink connector exporting topic data to an external system
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "compute.functionmesh.io",
    version = "v1alpha1",
    kind = "Sink",
    plural = "sinks",
    namespaced,
    status = "ComponentStatus",
    derive = "PartialEq",
    scale = r#"{"specReplicasPath":".spec.replicas","statusReplicasPath":".status.replicas","labelSelectorPath":".status.selector"}"#,
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".status.replicas"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SinkSpec {
    /// Shared workload settings
    #[serde(flatten)]
    pub workload: WorkloadSpec,

    /// Topics exported
    #[serde(default)]
    pub input: InputConf,
}
