/*!
# Harness frontends

Entry points shared by every frontend (CLI, tests, embedding programs):
running implementations against scenarios, compiling scenario files and
describing them without running anything.
*/

use std::fmt::Write;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument};

use vaktprov_config::HarnessConfig;
use vaktprov_core::{PredicateRegistry, Scenario, ScenarioDocument, ScenarioError};

use crate::engine::{PacketProcessor, RunError, RunReport, ScenarioRunner, Shim};

/// Runs `entry` against `scenario` with a one-off runner.
pub async fn run_scenario<F, Fut>(scenario: Scenario, config: HarnessConfig, entry: F) -> RunReport
where
    F: FnOnce(Shim) -> Fut,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    ScenarioRunner::new(config).run(scenario, entry).await
}

/// Loads a plain or compiled scenario file and runs `processor` against it.
#[instrument(level = "info", name = "run_scenario_file", skip(runner, registry, processor), fields(processor = processor.name()))]
pub async fn run_scenario_file(
    runner: &ScenarioRunner,
    path: &Path,
    registry: &PredicateRegistry,
    processor: Arc<dyn PacketProcessor>,
) -> Result<RunReport, RunError> {
    let scenario = Scenario::load_from_file(path, registry)?;
    Ok(runner.run_processor(scenario, processor).await)
}

/// Writes the compiled envelope of `input` to `output` (default: the input
/// path with a `.compiled.yaml` extension).
#[instrument(level = "info", name = "compile_scenario_file", skip(registry))]
pub fn compile_scenario_file(
    input: &Path,
    output: Option<&Path>,
    registry: &PredicateRegistry,
) -> Result<PathBuf, RunError> {
    let scenario = Scenario::load_from_file(input, registry)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("compiled.yaml"));
    std::fs::write(&output, scenario.compile()?)?;
    info!(events = scenario.len(), output = %output.display(), "scenario compiled");
    Ok(output)
}

/// Human-readable description of a scenario file. Predicates are not
/// resolved, so files using custom predicates can be inspected too.
pub fn inspect_scenario_file(path: &Path) -> Result<String, RunError> {
    let text = std::fs::read_to_string(path)?;
    let doc = ScenarioDocument::parse(&text)?;
    let mut out = String::new();

    let _ = writeln!(out, "Scenario {}", doc.name);
    let _ = writeln!(out, "\nInterfaces:");
    for iface in &doc.interfaces {
        let _ = writeln!(
            out,
            "    {:<12} {}  {}/{}",
            iface.name, iface.mac, iface.ip, iface.netmask
        );
    }
    if !doc.files.is_empty() {
        let _ = writeln!(out, "\nFiles:");
        for (name, contents) in &doc.files {
            let _ = writeln!(out, "    {:<24} {} lines", name, contents.lines().count());
        }
    }

    // Custom predicates are resolved as always-true placeholders so the
    // events can be summarized without the program that defined them.
    let mut registry = PredicateRegistry::new();
    for event in &doc.events {
        if let vaktprov_core::document::EventDocument::Output { predicates, .. } = event {
            for name in predicates {
                match PredicateRegistry::new().resolve(name) {
                    Err(ScenarioError::UnknownPredicate(_)) => {
                        registry.register(name.clone(), |_| true);
                    }
                    Err(e) => return Err(e.into()),
                    Ok(_) => {}
                }
            }
        }
    }
    let scenario = Scenario::from_document(doc, &registry)?;
    let _ = writeln!(out, "\nEvents:");
    for (index, event) in scenario.events().iter().enumerate() {
        let _ = writeln!(out, "{:<4}{}", index + 1, event.description);
        let _ = writeln!(out, "        {}", event.summary());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use vaktprov_core::{ExpectedEvent, MacAddr, Predicate};

    fn scenario_file(dir: &Path) -> PathBuf {
        let mut s = Scenario::new("inspect");
        s.add_interface(
            "eth0",
            MacAddr::new([0x10, 0, 0, 0, 0, 1]),
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(255, 255, 255, 0),
        )
        .unwrap();
        s.add_file("table.txt", "a\nb\n");
        s.expect(
            ExpectedEvent::output("eth0", vec![0u8; 14], "something goes out")
                .inexact()
                .with_predicate(Predicate::custom("looks_right", |_| true)),
        )
        .unwrap();
        let path = dir.join("inspect.yaml");
        std::fs::write(&path, s.to_yaml().unwrap()).unwrap();
        path
    }

    #[test]
    fn test_compile_then_inspect() {
        let dir = std::env::temp_dir().join(format!("vaktprov-runtime-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = scenario_file(&dir);

        let text = inspect_scenario_file(&path).unwrap();
        assert!(text.contains("Scenario inspect"));
        assert!(text.contains("table.txt"));
        assert!(text.contains("1   something goes out"));

        let mut registry = PredicateRegistry::new();
        registry.register("looks_right", |_| true);
        let compiled = compile_scenario_file(&path, None, &registry).unwrap();
        assert!(compiled.to_string_lossy().ends_with("inspect.compiled.yaml"));
        assert!(inspect_scenario_file(&compiled).unwrap().contains("Scenario inspect"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_inspect_rejects_malformed_field_predicate() {
        let dir = std::env::temp_dir().join(format!("vaktprov-inspect-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = scenario_file(&dir);
        let text = std::fs::read_to_string(&path)
            .unwrap()
            .replace("looks_right", "ipv4.nope == 3");
        std::fs::write(&path, text).unwrap();

        let err = inspect_scenario_file(&path).unwrap_err();
        assert!(matches!(
            err,
            RunError::Scenario(ScenarioError::InvalidPredicate { ref expr, .. }) if expr == "ipv4.nope == 3"
        ));
        let _ = std::fs::remove_dir_all(dir);
    }
}
