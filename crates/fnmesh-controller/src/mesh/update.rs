//! Mesh update: child upserts, orphan deletion and the status write

use fnmesh_common::crd::{make_component_name, FunctionMesh};
use fnmesh_common::crd::{Function, Sink, Source};
use fnmesh_common::events::{actions, reasons};
use fnmesh_common::kube_utils::{create_or_update, OperationResult};
use fnmesh_common::Error;
use fnmesh_workload::make_component;
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use tracing::{debug, error};

use super::{MeshChild, MeshContext};

/// Converge children on the mesh spec, then persist the mesh status.
///
/// The first failure stops the pass, leaving later children for the next
/// one. The status write happens regardless; if it fails as well, the
/// earlier error is the one returned.
pub async fn update_mesh(mesh: &mut FunctionMesh, ctx: &MeshContext) -> Result<(), Error> {
    let result = apply_children(mesh, ctx).await;

    if let Err(e) = ctx.meshes.update_status(mesh).await {
        error!(error = %e, mesh = %mesh.name_any(), "failed to update function mesh status");
        if result.is_ok() {
            return Err(e);
        }
    }
    result
}

async fn apply_children(mesh: &mut FunctionMesh, ctx: &MeshContext) -> Result<(), Error> {
    upsert_children::<Function>(mesh, ctx).await?;
    upsert_children::<Source>(mesh, ctx).await?;
    upsert_children::<Sink>(mesh, ctx).await?;

    cleanup_orphans::<Function>(mesh, ctx).await?;
    cleanup_orphans::<Source>(mesh, ctx).await?;
    cleanup_orphans::<Sink>(mesh, ctx).await?;
    Ok(())
}

/// Create each declared child of kind `K`, or overwrite its spec with the entry
pub async fn upsert_children<K: MeshChild>(
    mesh: &FunctionMesh,
    ctx: &MeshContext,
) -> Result<(), Error> {
    for entry in K::entries(&mesh.spec) {
        let desired: K = make_component(mesh, entry);
        let child_name = desired.name_any();
        let spec = entry.clone();

        let result = create_or_update(K::client(ctx), desired, move |child| {
            *child.spec_mut() = spec;
        })
        .await
        .map_err(|e| {
            error!(error = %e, kind = %K::KIND, child = %child_name, "failed to create or update child");
            e
        })?;

        match result {
            OperationResult::Created => {
                ctx.events
                    .publish(
                        &mesh.object_ref(&()),
                        EventType::Normal,
                        reasons::CHILD_CREATED,
                        actions::CREATE,
                        Some(format!("Created {} {}", K::KIND, child_name)),
                    )
                    .await;
            }
            OperationResult::Updated => {
                debug!(kind = %K::KIND, child = %child_name, "child spec updated")
            }
            OperationResult::Unchanged => {}
        }
    }
    Ok(())
}

/// Delete the children of kind `K` marked orphaned and drop their status entries.
///
/// Skipped when the collection's status already has one entry per spec
/// entry. A child that is already gone only loses its status entry.
pub async fn cleanup_orphans<K: MeshChild>(
    mesh: &mut FunctionMesh,
    ctx: &MeshContext,
) -> Result<(), Error> {
    let declared = K::entries(&mesh.spec).len();
    let mesh_name = mesh.name_any();
    let namespace = mesh.namespace().unwrap_or_default();
    let mesh_ref = mesh.object_ref(&());

    let conditions = mesh
        .status
        .get_or_insert_with(Default::default)
        .conditions_mut(K::KIND);
    if conditions.len() == declared {
        return Ok(());
    }

    let orphans: Vec<String> = conditions
        .iter()
        .filter(|(_, condition)| condition.is_orphaned())
        .map(|(name, _)| name.clone())
        .collect();

    let client = K::client(ctx);
    for orphan in orphans {
        let child_name = make_component_name(&mesh_name, &orphan);

        if client.get(&namespace, &child_name).await?.is_none() {
            conditions.remove(&orphan);
            continue;
        }

        match client.delete(&namespace, &child_name).await {
            Ok(()) => {
                ctx.events
                    .publish(
                        &mesh_ref,
                        EventType::Normal,
                        reasons::ORPHAN_DELETED,
                        actions::DELETE,
                        Some(format!("Deleted orphaned {} {}", K::KIND, child_name)),
                    )
                    .await;
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                error!(error = %e, kind = %K::KIND, child = %child_name, "failed to delete orphaned child");
                return Err(e);
            }
        }
        conditions.remove(&orphan);
    }
    Ok(())
}
