//! Custom Resource Definitions for Function Mesh
//!
//! This module contains all CRD definitions used by the operator: the
//! `FunctionMesh` aggregate and its three child kinds.

mod component;
mod function;
mod mesh;
mod sink;
mod source;
mod types;
mod workload;

pub use component::{Component, ComponentKind, ComponentSpec, ComponentStatus};
pub use function::{Function, FunctionSpec};
pub use mesh::{make_component_name, FunctionMesh, FunctionMeshSpec, FunctionMeshStatus};
pub use sink::{Sink, SinkSpec};
pub use source::{Source, SourceSpec};
pub use types::{ConditionStatus, ConditionType, ReconcileAction, ResourceCondition, SubResource};
pub use workload::{
    BuiltinHpaRule, GoRuntime, InputConf, JavaRuntime, OutputConf, PodPolicy, PulsarMessaging,
    PythonRuntime, Runtime, WorkloadSpec,
};
