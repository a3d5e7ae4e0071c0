//! Shared status vocabulary for Function Mesh CRDs
//!
//! Every reconciled entity (a mesh entry, or a sub-resource of a component)
//! carries one [`ResourceCondition`]: what kind of readiness it reports,
//! whether it is ready, and which action the next Apply must take.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of a condition
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// What a condition reports on
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionType {
    /// A mesh Function entry
    FunctionReady,
    /// A mesh Source entry
    SourceReady,
    /// A mesh Sink entry
    SinkReady,
    /// A component's StatefulSet
    StatefulSetReady,
    /// A component's headless Service
    ServiceReady,
    /// A component's HorizontalPodAutoscaler
    #[serde(rename = "HPAReady")]
    HpaReady,
    /// A mesh entry that left the spec and awaits deletion
    Orphaned,
}

impl std::fmt::Display for ConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FunctionReady => write!(f, "FunctionReady"),
            Self::SourceReady => write!(f, "SourceReady"),
            Self::SinkReady => write!(f, "SinkReady"),
            Self::StatefulSetReady => write!(f, "StatefulSetReady"),
            Self::ServiceReady => write!(f, "ServiceReady"),
            Self::HpaReady => write!(f, "HPAReady"),
            Self::Orphaned => write!(f, "Orphaned"),
        }
    }
}

/// The action the next Apply must take for an entity
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Create the object
    Create,
    /// Delete the object
    Delete,
    /// Bring the live object back to its desired shape
    Update,
    /// Object exists, waiting for it to become ready
    Wait,
    /// Nothing to do
    #[default]
    NoAction,
}

impl std::fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "Create"),
            Self::Delete => write!(f, "Delete"),
            Self::Update => write!(f, "Update"),
            Self::Wait => write!(f, "Wait"),
            Self::NoAction => write!(f, "NoAction"),
        }
    }
}

/// Observed state of one reconciled entity
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ResourceCondition {
    /// What this condition reports on
    pub condition: ConditionType,
    /// Whether the entity is ready
    pub status: ConditionStatus,
    /// Action the next Apply must take
    pub action: ReconcileAction,
}

impl ResourceCondition {
    /// Build a condition from its parts
    pub fn new(condition: ConditionType, status: ConditionStatus, action: ReconcileAction) -> Self {
        Self {
            condition,
            status,
            action,
        }
    }

    /// A not-yet-ready condition waiting for creation
    pub fn pending(condition: ConditionType) -> Self {
        Self::new(condition, ConditionStatus::False, ReconcileAction::Create)
    }

    /// Marker for a mesh entry that left the spec.
    ///
    /// `True` here means observation finished and deletion is due, not health.
    pub fn orphaned() -> Self {
        Self::new(
            ConditionType::Orphaned,
            ConditionStatus::True,
            ReconcileAction::Delete,
        )
    }

    /// True when the status is `True`
    pub fn is_ready(&self) -> bool {
        self.status == ConditionStatus::True
    }

    /// True when this entry is an orphan awaiting deletion
    pub fn is_orphaned(&self) -> bool {
        self.condition == ConditionType::Orphaned
    }
}

/// Sub-resources a component owns, used as status map keys
#[derive(
    Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum SubResource {
    /// The apps/v1 StatefulSet running the component's pods
    StatefulSet,
    /// The headless v1 Service in front of the pods
    Service,
    /// The optional autoscaling/v2 HorizontalPodAutoscaler
    #[serde(rename = "HPA")]
    Hpa,
}

impl SubResource {
    /// Condition type reported for this sub-resource
    pub fn ready_condition(&self) -> ConditionType {
        match self {
            Self::StatefulSet => ConditionType::StatefulSetReady,
            Self::Service => ConditionType::ServiceReady,
            Self::Hpa => ConditionType::HpaReady,
        }
    }
}

impl std::fmt::Display for SubResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StatefulSet => write!(f, "StatefulSet"),
            Self::Service => write!(f, "Service"),
            Self::Hpa => write!(f, "HPA"),
        }
    }
}
