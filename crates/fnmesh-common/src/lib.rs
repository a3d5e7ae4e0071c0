//! Common types for the Function Mesh operator: CRDs, errors, and client utilities

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod events;
pub mod kube_utils;

pub use error::Error;
pub use events::{
    EventPublisher, KubeEventPublisher, NoopEventPublisher, RecordedEvent, RecordingEventPublisher,
};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group shared by every Function Mesh CRD
pub const API_GROUP: &str = "compute.functionmesh.io";

/// Label key identifying the application that owns a rendered object
pub const LABEL_APP: &str = "app";

/// Label value written under [`LABEL_APP`] on every rendered object
pub const APP_NAME: &str = "function-mesh";

/// Label key carrying the component kind (function, source, sink)
pub const LABEL_COMPONENT: &str = "component";

/// Label key carrying the owning component's name
pub const LABEL_NAME: &str = "name";

/// Label key carrying the owning component's namespace
pub const LABEL_NAMESPACE: &str = "namespace";

/// Field manager used for server-side apply and reported on Events
pub const FIELD_MANAGER: &str = "function-mesh-controller";
