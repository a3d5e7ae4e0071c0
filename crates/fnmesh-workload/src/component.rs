//! Mesh child rendering

use std::collections::BTreeMap;

use fnmesh_common::crd::{make_component_name, Component, ComponentSpec, FunctionMesh};
use fnmesh_common::{APP_NAME, LABEL_APP, LABEL_COMPONENT};
use kube::{Resource, ResourceExt};

/// Label key carrying the owning mesh's name on child components
pub const LABEL_MESH: &str = "functionmesh";

/// Render the child component for one mesh entry
///
/// The child is named `<mesh>-<entry>`, lives in the mesh namespace, is
/// controller-owned by the mesh, and carries the entry spec verbatim.
pub fn make_component<K: Component>(mesh: &FunctionMesh, entry: &K::Spec) -> K {
    let name = make_component_name(&mesh.name_any(), entry.name());
    let mut component = K::from_spec(&name, entry.clone());

    let meta = component.meta_mut();
    meta.namespace = mesh.namespace();
    meta.labels = Some(BTreeMap::from([
        (LABEL_APP.to_string(), APP_NAME.to_string()),
        (LABEL_COMPONENT.to_string(), K::KIND.as_str().to_string()),
        (LABEL_MESH.to_string(), mesh.name_any()),
    ]));
    meta.owner_references = mesh.controller_owner_ref(&()).map(|r| vec![r]);
    component
}

#[cfg(test)]
mod tests {
    use super::*;
    use fnmesh_common::crd::{
        Component, FunctionMeshSpec, Sink, SinkSpec, Source, SourceSpec, WorkloadSpec,
    };

    fn mesh() -> FunctionMesh {
        let mut mesh = FunctionMesh::new(
            "pipeline",
            FunctionMeshSpec {
                sources: vec![SourceSpec {
                    workload: WorkloadSpec {
                        name: "ingest".to_string(),
                        image: "img".to_string(),
                        ..Default::default()
                    },
                    ..Default::default()
                }],
                sinks: vec![SinkSpec {
                    workload: WorkloadSpec {
                        name: "es".to_string(),
                        image: "img".to_string(),
                        ..Default::default()
                    },
                    ..Default::default()
                }],
                ..Default::default()
            },
        );
        mesh.metadata.namespace = Some("pulsar".to_string());
        mesh.metadata.uid = Some("mesh-uid".to_string());
        mesh
    }

    #[test]
    fn child_is_named_after_mesh_and_entry() {
        let mesh = mesh();
        let source: Source = make_component(&mesh, &mesh.spec.sources[0]);
        assert_eq!(source.name_any(), "pipeline-ingest");
        assert_eq!(source.namespace().as_deref(), Some("pulsar"));
        assert_eq!(source.labels()[LABEL_MESH], "pipeline");
    }

    #[test]
    fn child_spec_is_the_entry_verbatim() {
        let mesh = mesh();
        let sink: Sink = make_component(&mesh, &mesh.spec.sinks[0]);
        assert_eq!(Component::spec(&sink), &mesh.spec.sinks[0]);
        assert!(Component::status(&sink).is_none());
    }

    #[test]
    fn child_is_controller_owned_by_the_mesh() {
        let mesh = mesh();
        let sink: Sink = make_component(&mesh, &mesh.spec.sinks[0]);
        let owners = sink.owner_references();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "FunctionMesh");
        assert_eq!(owners[0].uid, "mesh-uid");
        assert_eq!(owners[0].controller, Some(true));
    }
}
