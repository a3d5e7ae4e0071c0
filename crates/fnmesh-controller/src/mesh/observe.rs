//! Mesh observation

use std::collections::BTreeSet;

use fnmesh_common::crd::{
    make_component_name, ComponentSpec, ConditionStatus, FunctionMesh, ReconcileAction,
    ResourceCondition, SubResource,
};
use fnmesh_common::crd::{Function, Sink, Source};
use fnmesh_common::Error;
use kube::ResourceExt;
use tracing::{debug, error};

use super::{MeshChild, MeshContext};

/// Observe every collection, Functions first, then Sources, then Sinks
pub async fn observe_mesh(mesh: &mut FunctionMesh, ctx: &MeshContext) -> Result<(), Error> {
    observe_collection::<Function>(mesh, ctx).await?;
    observe_collection::<Source>(mesh, ctx).await?;
    observe_collection::<Sink>(mesh, ctx).await?;
    Ok(())
}

/// Record a condition for each entry of one collection and flag orphans.
///
/// Entries without a condition get a pending Create without a read. Entries
/// whose child does not exist yet keep their condition. An orphan marker
/// left on an entry that is back in the spec is replaced by a pending
/// Create, so a re-added entry starts fresh.
pub async fn observe_collection<K: MeshChild>(
    mesh: &mut FunctionMesh,
    ctx: &MeshContext,
) -> Result<(), Error> {
    let mesh_name = mesh.name_any();
    let namespace = mesh.namespace().unwrap_or_default();
    let entries: Vec<String> = K::entries(&mesh.spec)
        .iter()
        .map(|entry| entry.name().to_string())
        .collect();

    let conditions = mesh
        .status
        .get_or_insert_with(Default::default)
        .conditions_mut(K::KIND);
    let mut orphans: BTreeSet<String> = conditions.keys().cloned().collect();
    let ready_condition = K::KIND.ready_condition();

    for entry in entries {
        orphans.remove(&entry);

        match conditions.get(&entry) {
            Some(existing) if !existing.is_orphaned() => {}
            _ => {
                conditions.insert(entry, ResourceCondition::pending(ready_condition));
                continue;
            }
        }

        let child_name = make_component_name(&mesh_name, &entry);
        let child = match K::client(ctx).get(&namespace, &child_name).await {
            Ok(Some(child)) => child,
            Ok(None) => {
                debug!(kind = %K::KIND, child = %child_name, "child not created yet");
                continue;
            }
            Err(e) => {
                error!(error = %e, kind = %K::KIND, child = %child_name, "failed to fetch child");
                return Err(e);
            }
        };

        let ready = child.status().is_some_and(|status| {
            status.is_ready(SubResource::StatefulSet) && status.is_ready(SubResource::Service)
        });
        let condition = if ready {
            ResourceCondition::new(
                ready_condition,
                ConditionStatus::True,
                ReconcileAction::NoAction,
            )
        } else {
            ResourceCondition::new(ready_condition, ConditionStatus::False, ReconcileAction::Wait)
        };
        conditions.insert(entry, condition);
    }

    for orphan in orphans {
        debug!(kind = %K::KIND, entry = %orphan, "entry left the spec");
        conditions.insert(orphan, ResourceCondition::orphaned());
    }
    Ok(())
}
