//! The component abstraction shared by Function, Source and Sink
//!
//! The three child kinds differ only in their spec's messaging fields. The
//! [`Component`] trait lets the mesh and component reconcilers run one
//! implementation for all of them.

use std::collections::BTreeMap;
use std::fmt::Debug;

use kube::core::NamespaceResourceScope;
use kube::Resource;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::mesh::FunctionMeshSpec;
use super::types::{ConditionType, ResourceCondition, SubResource};
use super::workload::{InputConf, OutputConf, WorkloadSpec};

// =============================================================================
// Kind
// =============================================================================

/// The three kinds of mesh children
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Pulsar Function
    Function,
    /// Pulsar IO source connector
    Source,
    /// Pulsar IO sink connector
    Sink,
}

impl ComponentKind {
    /// Lowercase name used in labels, container names and command lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Source => "source",
            Self::Sink => "sink",
        }
    }

    /// Condition type a mesh reports for entries of this kind
    pub fn ready_condition(&self) -> ConditionType {
        match self {
            Self::Function => ConditionType::FunctionReady,
            Self::Source => ConditionType::SourceReady,
            Self::Sink => ConditionType::SinkReady,
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function => write!(f, "Function"),
            Self::Source => write!(f, "Source"),
            Self::Sink => write!(f, "Sink"),
        }
    }
}

// =============================================================================
// Status
// =============================================================================

/// Status shared by Function, Source and Sink
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    /// One condition per owned sub-resource
    #[serde(default)]
    pub conditions: BTreeMap<SubResource, ResourceCondition>,

    /// Replica count last observed on the StatefulSet
    #[serde(default)]
    pub replicas: i32,

    /// Label selector of the StatefulSet, used by the scale subresource
    #[serde(default)]
    pub selector: String,

    /// Generation of the spec last reconciled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl ComponentStatus {
    /// Condition recorded for a sub-resource, if any
    pub fn condition(&self, sub: SubResource) -> Option<&ResourceCondition> {
        self.conditions.get(&sub)
    }

    /// True when the sub-resource's condition exists and is ready
    pub fn is_ready(&self, sub: SubResource) -> bool {
        self.condition(sub).is_some_and(|c| c.is_ready())
    }
}

// =============================================================================
// Traits
// =============================================================================

/// Spec of a mesh child
pub trait ComponentSpec:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The shared workload settings
    fn workload(&self) -> &WorkloadSpec;

    /// Topics consumed, for kinds that consume
    fn input(&self) -> Option<&InputConf> {
        None
    }

    /// Topic produced to, for kinds that produce
    fn output(&self) -> Option<&OutputConf> {
        None
    }

    /// Entry name within the mesh collection
    fn name(&self) -> &str {
        &self.workload().name
    }
}

impl ComponentSpec for super::FunctionSpec {
    fn workload(&self) -> &WorkloadSpec {
        &self.workload
    }

    fn input(&self) -> Option<&InputConf> {
        Some(&self.input)
    }

    fn output(&self) -> Option<&OutputConf> {
        Some(&self.output)
    }
}

impl ComponentSpec for super::SourceSpec {
    fn workload(&self) -> &WorkloadSpec {
        &self.workload
    }

    fn output(&self) -> Option<&OutputConf> {
        Some(&self.output)
    }
}

impl ComponentSpec for super::SinkSpec {
    fn workload(&self) -> &WorkloadSpec {
        &self.workload
    }

    fn input(&self) -> Option<&InputConf> {
        Some(&self.input)
    }
}

/// A Function, Source or Sink custom resource
pub trait Component:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + PartialEq
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Spec type of this kind
    type Spec: ComponentSpec;

    /// Which kind this is
    const KIND: ComponentKind;

    /// Build an object with empty status
    fn from_spec(name: &str, spec: Self::Spec) -> Self;

    /// Desired spec
    fn spec(&self) -> &Self::Spec;

    /// Mutable desired spec
    fn spec_mut(&mut self) -> &mut Self::Spec;

    /// Status, if the object has one yet
    fn status(&self) -> Option<&ComponentStatus>;

    /// Status, created empty when absent
    fn status_mut(&mut self) -> &mut ComponentStatus;

    /// Entries of this kind declared by a mesh
    fn entries(mesh: &FunctionMeshSpec) -> &[Self::Spec];

    /// Shortcut for `self.spec().workload()`
    fn workload(&self) -> &WorkloadSpec {
        self.spec().workload()
    }
}

macro_rules! impl_component {
    ($kind:ident, $spec:ty, $field:ident) => {
        impl Component for super::$kind {
            type Spec = $spec;

            const KIND: ComponentKind = ComponentKind::$kind;

            fn from_spec(name: &str, spec: Self::Spec) -> Self {
                super::$kind::new(name, spec)
            }

            fn spec(&self) -> &Self::Spec {
                &self.spec
            }

            fn spec_mut(&mut self) -> &mut Self::Spec {
                &mut self.spec
            }

            fn status(&self) -> Option<&ComponentStatus> {
                self.status.as_ref()
            }

            fn status_mut(&mut self) -> &mut ComponentStatus {
                self.status.get_or_insert_with(ComponentStatus::default)
            }

            fn entries(mesh: &FunctionMeshSpec) -> &[Self::Spec] {
                &mesh.$field
            }
        }
    };
}

impl_component!(Function, super::FunctionSpec, functions);
impl_component!(Source, super::SourceSpec, sources);
impl_component!(Sink, super::SinkSpec, sinks);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        ConditionStatus, Function, FunctionSpec, ReconcileAction, Sink, SinkSpec, Source,
    };

    fn spec(name: &str) -> FunctionSpec {
        FunctionSpec {
            workload: WorkloadSpec {
                name: name.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn kinds_map_to_mesh_condition_types() {
        assert_eq!(Function::KIND.ready_condition(), ConditionType::FunctionReady);
        assert_eq!(Source::KIND.ready_condition(), ConditionType::SourceReady);
        assert_eq!(Sink::KIND.ready_condition(), ConditionType::SinkReady);
        assert_eq!(Sink::KIND.as_str(), "sink");
    }

    #[test]
    fn status_mut_creates_empty_status() {
        let mut f = Function::from_spec("mesh-f1", spec("f1"));
        assert!(Component::status(&f).is_none());
        f.status_mut().replicas = 2;
        assert_eq!(Component::status(&f).map(|s| s.replicas), Some(2));
    }

    #[test]
    fn entries_select_the_matching_collection() {
        let mesh = FunctionMeshSpec {
            functions: vec![spec("f1"), spec("f2")],
            sinks: vec![SinkSpec {
                workload: WorkloadSpec {
                    name: "s1".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            }],
            ..Default::default()
        };
        let names: Vec<&str> = Function::entries(&mesh).iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["f1", "f2"]);
        assert_eq!(Sink::entries(&mesh).len(), 1);
        assert!(Source::entries(&mesh).is_empty());
    }

    #[test]
    fn readiness_requires_a_true_condition() {
        let mut status = ComponentStatus::default();
        assert!(!status.is_ready(SubResource::Service));
        status.conditions.insert(
            SubResource::Service,
            ResourceCondition::new(
                ConditionType::ServiceReady,
                ConditionStatus::True,
                ReconcileAction::NoAction,
            ),
        );
        assert!(status.is_ready(SubResource::Service));
        assert!(!status.is_ready(SubResource::StatefulSet));
    }
}
