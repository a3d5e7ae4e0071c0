//! CRD installation and printing
//!
//! The operator installs its own CRDs on startup using server-side apply,
//! so the CRD versions always match the operator version.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

use fnmesh_common::crd::{Function, FunctionMesh, Sink, Source};
use fnmesh_common::FIELD_MANAGER;

/// CRD definition with name and resource
struct CrdDef {
    name: &'static str,
    crd: CustomResourceDefinition,
}

fn function_mesh_crds() -> Vec<CrdDef> {
    vec![
        CrdDef {
            name: "functionmeshes.compute.functionmesh.io",
            crd: FunctionMesh::crd(),
        },
        CrdDef {
            name: "functions.compute.functionmesh.io",
            crd: Function::crd(),
        },
        CrdDef {
            name: "sources.compute.functionmesh.io",
            crd: Source::crd(),
        },
        CrdDef {
            name: "sinks.compute.functionmesh.io",
            crd: Sink::crd(),
        },
    ]
}

/// Install or update every Function Mesh CRD
pub async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    for def in function_mesh_crds() {
        tracing::info!("Installing {} CRD...", def.name);
        crds.patch(def.name, &params, &Patch::Apply(&def.crd))
            .await
            .map_err(|e| anyhow::anyhow!("failed to install {} CRD: {}", def.name, e))?;
    }
    tracing::info!("Function Mesh CRDs installed/updated");
    Ok(())
}

/// All CRDs as one multi-document YAML stream
pub fn crd_yaml() -> anyhow::Result<String> {
    let mut out = String::new();
    for def in function_mesh_crds() {
        let doc = serde_yaml::to_string(&def.crd)
            .map_err(|e| anyhow::anyhow!("Failed to serialize {} CRD: {}", def.name, e))?;
        out.push_str("---\n");
        out.push_str(&doc);
    }
    Ok(out)
}
