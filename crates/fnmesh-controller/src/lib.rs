//! FunctionMesh and component controllers
//!
//! Two independent reconcilers share one Observe → Apply shape:
//!
//! - [`mesh`] drives a `FunctionMesh` toward its declared Function, Source
//!   and Sink children and garbage-collects children removed from the spec.
//! - [`component`] drives one Function, Source or Sink toward its
//!   StatefulSet, headless Service and optional HPA.
//!
//! Each pass works on a private clone of the object and relies on
//! resourceVersion checks in the API server for cross-pass consistency.

use std::time::Duration;

pub mod component;
pub mod mesh;

#[cfg(test)]
mod testing;

pub use fnmesh_common::Error;

/// Requeue timing shared by all controllers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Delay before a successful object is reconciled again
    pub resync_interval: Duration,
    /// Delay before a retryable failure is reconciled again
    pub error_backoff: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            resync_interval: Duration::from_secs(60),
            error_backoff: Duration::from_secs(30),
        }
    }
}
