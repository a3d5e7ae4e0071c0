//! FunctionMesh CRD types
//!
//! A `FunctionMesh` declares a pipeline of Functions, Sources and Sinks.
//! Each entry becomes an owned child resource named `<mesh>-<entry>`; the
//! mesh status tracks one condition per entry name.

use std::collections::{BTreeMap, HashSet};

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::component::{ComponentKind, ComponentSpec};
use super::types::ResourceCondition;
use super::{FunctionSpec, SinkSpec, SourceSpec};
use crate::Error;

/// Specification for a FunctionMesh
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "compute.functionmesh.io",
    version = "v1alpha1",
    kind = "FunctionMesh",
    plural = "functionmeshes",
    shortname = "fm",
    namespaced,
    status = "FunctionMeshStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct FunctionMeshSpec {
    /// Functions in the mesh, reconciled first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionSpec>,

    /// Sources in the mesh, reconciled after functions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceSpec>,

    /// Sinks in the mesh, reconciled last
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sinks: Vec<SinkSpec>,
}

impl FunctionMeshSpec {
    /// Validate every entry and reject duplicate names within a collection.
    ///
    /// Duplicate names would derive the same child name, so two entries
    /// would fight over one object.
    pub fn validate(&self, mesh: &str) -> Result<(), Error> {
        validate_collection(mesh, "functions", &self.functions)?;
        validate_collection(mesh, "sources", &self.sources)?;
        validate_collection(mesh, "sinks", &self.sinks)?;
        Ok(())
    }
}

fn validate_collection<S: ComponentSpec>(
    mesh: &str,
    collection: &str,
    entries: &[S],
) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for (i, entry) in entries.iter().enumerate() {
        let path = format!("spec.{collection}[{i}]");
        entry.workload().validate(mesh, &path)?;
        if !seen.insert(entry.name()) {
            return Err(Error::validation_for_field(
                mesh,
                format!("{path}.name"),
                format!("duplicate {} name '{}'", collection, entry.name()),
            ));
        }
    }
    Ok(())
}

/// Status of a FunctionMesh
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FunctionMeshStatus {
    /// Condition per function entry name
    #[serde(default)]
    pub function_conditions: BTreeMap<String, ResourceCondition>,

    /// Condition per source entry name
    #[serde(default)]
    pub source_conditions: BTreeMap<String, ResourceCondition>,

    /// Condition per sink entry name
    #[serde(default)]
    pub sink_conditions: BTreeMap<String, ResourceCondition>,

    /// Generation of the spec last reconciled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl FunctionMeshStatus {
    /// Conditions of the given collection
    pub fn conditions(&self, kind: ComponentKind) -> &BTreeMap<String, ResourceCondition> {
        match kind {
            ComponentKind::Function => &self.function_conditions,
            ComponentKind::Source => &self.source_conditions,
            ComponentKind::Sink => &self.sink_conditions,
        }
    }

    /// Mutable conditions of the given collection
    pub fn conditions_mut(
        &mut self,
        kind: ComponentKind,
    ) -> &mut BTreeMap<String, ResourceCondition> {
        match kind {
            ComponentKind::Function => &mut self.function_conditions,
            ComponentKind::Source => &mut self.source_conditions,
            ComponentKind::Sink => &mut self.sink_conditions,
        }
    }
}

/// Name of the child resource for a mesh entry
pub fn make_component_name(mesh: &str, entry: &str) -> String {
    format!("{}-{}", mesh, entry)
}
