//! Manifest rendering for Function Mesh components
//!
//! Turns a `Function`, `Source` or `Sink` into the Kubernetes objects that
//! run it (StatefulSet, headless Service, optional HPA), and turns a
//! `FunctionMesh` entry into its child component. Every function here is
//! pure and deterministic: the reconcilers diff live objects against fresh
//! renders, so identical inputs must always render identical objects.
//!
//! # Usage
//!
//! ```rust,ignore
//! let sts = make_stateful_set(&function);
//! let svc = make_service(&function);
//! let hpa = make_hpa(&function); // None unless maxReplicas is set
//! let child: Function = make_component(&mesh, &mesh.spec.functions[0]);
//! ```

mod command;
mod component;
mod hpa;
mod meta;
mod service;
mod statefulset;

pub use command::make_command;
pub use component::{make_component, LABEL_MESH};
pub use hpa::{default_hpa_metrics, desired_hpa_metrics, make_hpa, make_metrics_from_builtin_rules};
pub use meta::{make_headless_service_name, make_labels, make_object_meta};
pub use service::make_service;
pub use statefulset::{make_pod_template, make_stateful_set};

/// Port the instance serves metrics and health checks on
pub const METRICS_PORT: i32 = 9093;

/// Name of the metrics port on the container and the Service
pub const METRICS_PORT_NAME: &str = "metrics";

/// Mount path of the Pulsar TLS trust certificate
pub const TLS_MOUNT_PATH: &str = "/etc/tls/pulsar-functions";
