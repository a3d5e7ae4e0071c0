//! Controller configuration from flags and environment

use std::time::Duration;

use clap::Args;
use fnmesh_controller::ReconcileConfig;

/// Controller settings; every flag also reads an `FNMESH_*` variable
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ControllerArgs {
    /// Only watch this namespace (all namespaces when unset)
    #[arg(long, env = "FNMESH_WATCH_NAMESPACE", global = true)]
    pub watch_namespace: Option<String>,

    /// Seconds between reconciles of a healthy object
    #[arg(long, env = "FNMESH_RESYNC_SECS", default_value_t = 60, global = true)]
    pub resync_secs: u64,

    /// Seconds before a failed reconcile is retried
    #[arg(
        long,
        env = "FNMESH_ERROR_BACKOFF_SECS",
        default_value_t = 30,
        global = true
    )]
    pub error_backoff_secs: u64,

    /// Do not install or update CRDs on startup
    #[arg(long, global = true)]
    pub skip_crd_install: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

impl ControllerArgs {
    /// Requeue timing for the reconcilers
    pub fn reconcile_config(&self) -> ReconcileConfig {
        ReconcileConfig {
            resync_interval: Duration::from_secs(self.resync_secs),
            error_backoff: Duration::from_secs(self.error_backoff_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ControllerArgs,
    }

    fn parse(argv: &[&str]) -> ControllerArgs {
        TestCli::try_parse_from(std::iter::once("function-mesh").chain(argv.iter().copied()))
            .expect("valid arguments")
            .args
    }

    #[test]
    fn flags_override_timing() {
        let args = parse(&[
            "--watch-namespace",
            "pulsar",
            "--resync-secs",
            "15",
            "--error-backoff-secs",
            "5",
            "--skip-crd-install",
        ]);
        assert_eq!(args.watch_namespace.as_deref(), Some("pulsar"));
        assert!(args.skip_crd_install);
        assert_eq!(
            args.reconcile_config(),
            ReconcileConfig {
                resync_interval: Duration::from_secs(15),
                error_backoff: Duration::from_secs(5),
            }
        );
    }

    #[test]
    fn non_numeric_interval_is_rejected() {
        let result = TestCli::try_parse_from(["function-mesh", "--resync-secs", "soon"]);
        assert!(result.is_err());
    }
}
