//! Source CRD

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::component::ComponentStatus;
use super::workload::{OutputConf, WorkloadSpec};

/// A Pulsar IO source connector importing external data into a topic
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "compute.functionmesh.io",
    version = "v1alpha1",
    kind = "Source",
    plural = "sources",
    shortname = "src",
    namespaced,
    status = "ComponentStatus",
    derive = "PartialEq",
    scale = r#"{"specReplicasPath":".spec.replicas","statusReplicasPath":".status.replicas","labelSelectorPath":".status.selector"}"#,
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".status.replicas"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpec {
    /// Shared workload settings
    #[serde(flatten)]
    pub workload: WorkloadSpec,

    /// Topic the imported records are written to
    #[serde(default)]
    pub output: OutputConf,
}
