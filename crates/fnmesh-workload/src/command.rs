//! Instance command lines per runtime
//!
//! The container runs the Pulsar instance runner for the configured runtime,
//! handing it the component details as JSON. Package locations, when set,
//! are downloaded through `pulsar-admin` before the runner starts.

use fnmesh_common::crd::{Component, ComponentSpec, Runtime};
use kube::ResourceExt;
use serde_json::json;

use crate::METRICS_PORT;

const PULSAR_HOME: &str = "/pulsar";
const JAVA_INSTANCE_MAIN: &str = "org.apache.pulsar.functions.instance.JavaInstanceMain";
const PYTHON_INSTANCE: &str = "/pulsar/instances/python-instance/python_instance_main.py";

/// Render the container command for a component
///
/// Returns `["sh", "-c", <script>]`; the script is fully determined by the
/// component's name, namespace and spec.
pub fn make_command<K: Component>(component: &K) -> Vec<String> {
    let spec = component.spec();
    let workload = spec.workload();
    let details = component_details(component).to_string();

    let mut script = Vec::new();
    if let Some(download) = download_command(&workload.runtime) {
        script.push(download);
    }
    script.push(runner_command(&workload.runtime, &details));

    vec!["sh".to_string(), "-c".to_string(), script.join(" && ")]
}

fn component_details<K: Component>(component: &K) -> serde_json::Value {
    let spec = component.spec();
    let workload = spec.workload();
    json!({
        "componentType": K::KIND.as_str().to_uppercase(),
        "tenant": workload.tenant.as_deref().unwrap_or("public"),
        "namespace": workload.pulsar_namespace.as_deref().unwrap_or("default"),
        "name": component.name_any(),
        "className": workload.class_name,
        "inputs": spec.input().map(|i| &i.topics),
        "topicsPattern": spec.input().and_then(|i| i.topic_pattern.as_ref()),
        "output": spec.output().and_then(|o| o.topic.as_ref()),
        "userConfig": workload.config,
    })
}

fn download_command(runtime: &Runtime) -> Option<String> {
    let (location, path) = if let Some(java) = &runtime.java {
        (java.jar_location.as_ref()?, &java.jar)
    } else if let Some(python) = &runtime.python {
        (python.py_location.as_ref()?, &python.py)
    } else if let Some(golang) = &runtime.golang {
        (golang.go_location.as_ref()?, &golang.go)
    } else {
        return None;
    };
    Some(format!(
        "{PULSAR_HOME}/bin/pulsar-admin --admin-url $webServiceURL packages download {location} --path {path}"
    ))
}

fn runner_command(runtime: &Runtime, details: &str) -> String {
    let common = format!(
        "--instance_id ${{POD_NAME##*-}} --function_details '{details}' \
         --pulsar_serviceurl $brokerServiceURL --port {METRICS_PORT} \
         --expected_healthcheck_interval -1"
    );

    if let Some(java) = &runtime.java {
        format!(
            "exec java -cp {PULSAR_HOME}/instances/java-instance.jar {JAVA_INSTANCE_MAIN} --jar {} {common}",
            java.jar
        )
    } else if let Some(python) = &runtime.python {
        format!("exec python3 {PYTHON_INSTANCE} --py {} {common}", python.py)
    } else if let Some(golang) = &runtime.golang {
        format!("exec {} {common}", golang.go)
    } else {
        // validation rejects specs without a runtime before rendering
        String::from("exit 1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statefulset::tests::sample_function;
    use fnmesh_common::crd::{GoRuntime, JavaRuntime};

    #[test]
    fn java_command_runs_the_instance_main() {
        let f = sample_function();
        let cmd = make_command(&f);
        assert_eq!(cmd[0], "sh");
        assert_eq!(cmd[1], "-c");
        assert!(cmd[2].starts_with("exec java"));
        assert!(cmd[2].contains(JAVA_INSTANCE_MAIN));
        assert!(cmd[2].contains("--jar /pulsar/examples/api-examples.jar"));
        assert!(cmd[2].contains(r#""name":"mesh-f1""#));
    }

    #[test]
    fn package_locations_are_downloaded_first() {
        let mut f = sample_function();
        f.spec.workload.runtime = Runtime {
            java: Some(JavaRuntime {
                jar: "fn.jar".to_string(),
                jar_location: Some("function://public/default/fn@1".to_string()),
            }),
            ..Default::default()
        };
        let script = &make_command(&f)[2];
        let (download, run) = script.split_once(" && ").expect("two steps");
        assert!(download.contains("packages download function://public/default/fn@1"));
        assert!(run.starts_with("exec java"));
    }

    #[test]
    fn go_command_execs_the_binary() {
        let mut f = sample_function();
        f.spec.workload.runtime = Runtime {
            golang: Some(GoRuntime {
                go: "/pulsar/bin/exclamation".to_string(),
                go_location: None,
            }),
            ..Default::default()
        };
        assert!(make_command(&f)[2].starts_with("exec /pulsar/bin/exclamation"));
    }

    #[test]
    fn command_is_deterministic() {
        let f = sample_function();
        assert_eq!(make_command(&f), make_command(&f.clone()));
    }
}
