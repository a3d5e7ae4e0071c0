//! Function Mesh operator - runs Pulsar Functions, Sources and Sinks on Kubernetes

mod config;
mod controller_runner;
mod crds;

use clap::{Parser, Subcommand};
use kube::Client;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fnmesh_common::crd::{Function, Sink, Source};

use crate::config::ControllerArgs;
use crate::controller_runner::{build_component_controller, build_mesh_controller};

/// Function Mesh - CRD-driven operator for Pulsar Functions and connectors
#[derive(Parser, Debug)]
#[command(name = "function-mesh", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    #[command(flatten)]
    controller: ControllerArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Watches FunctionMesh, Function, Source and Sink resources and
    /// reconciles them until a termination signal arrives.
    Controller,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        print!("{}", crds::crd_yaml()?);
        return Ok(());
    }

    init_tracing(cli.controller.log_json);

    match cli.command {
        Some(Commands::Controller) | None => run_controller(cli.controller).await,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Run the controllers until shutdown
async fn run_controller(args: ControllerArgs) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    if args.skip_crd_install {
        tracing::info!("Skipping CRD installation");
    } else {
        crds::ensure_crds_installed(&client).await?;
    }

    let config = args.reconcile_config();
    let namespace = args.watch_namespace.as_deref();
    tracing::info!(
        namespace = namespace.unwrap_or("<all>"),
        resync_secs = config.resync_interval.as_secs(),
        "Starting Function Mesh controllers..."
    );

    let controllers = vec![
        build_mesh_controller(client.clone(), namespace, config),
        build_component_controller::<Function>(client.clone(), namespace, config),
        build_component_controller::<Source>(client.clone(), namespace, config),
        build_component_controller::<Sink>(client, namespace, config),
    ];
    futures::future::join_all(controllers).await;

    tracing::info!("Function Mesh operator shutting down");
    Ok(())
}
