//! Kubernetes Events emitted by the reconcilers
//!
//! Publishing never fails from the caller's side: an event the API server
//! rejects is logged and dropped, and reconciliation carries on.

use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

/// Destination for Events about reconciled objects
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an Event about `regarding`.
    ///
    /// `reason` is a value from [`reasons`], `action` one from [`actions`].
    async fn publish(
        &self,
        regarding: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// Publishes through the kube-runtime [`Recorder`]
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Create a publisher reporting as `controller_name`
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        regarding: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, regarding).await {
            warn!(
                reason,
                object = regarding.name.as_deref().unwrap_or_default(),
                error = %e,
                "dropping kubernetes event"
            );
        }
    }
}

/// Drops every event
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        _regarding: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
    }
}

/// One event kept by [`RecordingEventPublisher`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Name of the object the event is about
    pub object: String,
    /// True for Warning events
    pub warning: bool,
    /// Event reason
    pub reason: String,
    /// Event action
    pub action: String,
    /// Human-readable note
    pub note: Option<String>,
}

/// Keeps events in memory so tests can assert on them
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEventPublisher {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event published so far, oldest first
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Reasons of every event published so far, oldest first
    pub fn reasons(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.reason).collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(
        &self,
        regarding: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = RecordedEvent {
            object: regarding.name.clone().unwrap_or_default(),
            warning: matches!(type_, EventType::Warning),
            reason: reason.to_string(),
            action: action.to_string(),
            note,
        };
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

/// Event reasons
pub mod reasons {
    /// A mesh child (Function, Source, Sink) was created
    pub const CHILD_CREATED: &str = "ChildCreated";
    /// An orphaned mesh child was deleted
    pub const ORPHAN_DELETED: &str = "OrphanDeleted";
    /// A sub-resource (StatefulSet, Service, HPA) was created
    pub const SUBRESOURCE_CREATED: &str = "SubResourceCreated";
    /// A sub-resource was brought back to its desired shape
    pub const SUBRESOURCE_UPDATED: &str = "SubResourceUpdated";
    /// Spec validation failed
    pub const VALIDATION_FAILED: &str = "ValidationFailed";
}

/// Event actions
pub mod actions {
    /// Object creation
    pub const CREATE: &str = "Create";
    /// Object update
    pub const UPDATE: &str = "Update";
    /// Object deletion
    pub const DELETE: &str = "Delete";
    /// Standard reconciliation loop
    pub const RECONCILE: &str = "Reconcile";
}
