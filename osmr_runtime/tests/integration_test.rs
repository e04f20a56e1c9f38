//! Integration tests for osmr_runtime.
//!
//! Bundled scenarios live in `scenarios/`; recorded traces go to temporary
//! directories.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use pretty_assertions::assert_eq;

use osmr_engine::domain::SimulationOptions;
use osmr_engine::program::Program;

use osmr_runtime::drift::{check_scenario, compare_traces, verify_determinism, Verdict};
use osmr_runtime::record::{load_recorded, save_recorded, RecordedTrace};
use osmr_runtime::replay;
use osmr_runtime::scenario::{load_all, load_program, load_scenario};
use osmr_runtime::RuntimeError;

fn scenarios_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios")
}

/// The engine's golden demonstration program.
fn golden_program() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("osmr_engine")
        .join("tests")
        .join("golden")
        .join("lvalues_program.json")
}

// ─────────────────────────────────────────────────────────────
// Bundled scenarios
// ─────────────────────────────────────────────────────────────

#[test]
fn bundled_scenarios_all_pass() {
    let scenarios = load_all(&[scenarios_dir()]).unwrap();
    assert!(scenarios.len() >= 10, "found {} scenarios", scenarios.len());
    for (path, scenario) in &scenarios {
        let verdict = check_scenario(scenario, None);
        assert!(
            verdict.passed(),
            "{} ({}) failed:\n{}",
            scenario.name,
            path.display(),
            verdict
        );
    }
}

#[test]
fn bundled_scenarios_are_deterministic() {
    for (path, scenario) in load_all(&[scenarios_dir()]).unwrap() {
        if scenario.expect.as_ref().is_some_and(|e| e.error.is_some()) {
            continue;
        }
        verify_determinism(&scenario.program)
            .unwrap_or_else(|e| panic!("{}: {}", path.display(), e));
    }
}

#[test]
fn elision_override_changes_by_value_trace() {
    let scenario =
        load_scenario(&scenarios_dir().join("06_by_value_without_elision.json")).unwrap();
    let elided = SimulationOptions {
        guaranteed_elision: true,
    };
    match check_scenario(&scenario, Some(&elided)) {
        Verdict::TraceMismatch(report) => {
            assert_eq!(report.first_divergence, Some(1));
            assert_eq!(report.kind_deltas.get("move-construct"), Some(&-1));
            assert_eq!(report.kind_deltas.get("destruct"), Some(&-1));
        }
        other => panic!("expected a trace mismatch, got {:?}", other),
    }
}

#[test]
fn wrong_error_expectation_fails() {
    let mut scenario =
        load_scenario(&scenarios_dir().join("03_deleted_move_assign.json")).unwrap();
    if let Some(expect) = scenario.expect.as_mut() {
        expect.error = Some("NoViableOverload".to_string());
    }
    let verdict = check_scenario(&scenario, None);
    assert!(matches!(verdict, Verdict::WrongError { .. }), "{:?}", verdict);
}

#[test]
fn missing_error_is_reported() {
    let mut scenario = load_scenario(&scenarios_dir().join("02_copy_only_assign.json")).unwrap();
    scenario.expect = Some(osmr_runtime::scenario::Expectation {
        trace: None,
        error: Some("DeletedMemberSelected".to_string()),
    });
    assert!(matches!(
        check_scenario(&scenario, None),
        Verdict::MissingError { .. }
    ));
}

// ─────────────────────────────────────────────────────────────
// Replay and recorded traces
// ─────────────────────────────────────────────────────────────

#[test]
fn golden_program_replays_through_runtime() {
    let (name, program) = load_program(&golden_program()).unwrap();
    assert_eq!(name, "lvalues_program");
    let (trace, hash) = replay::rebuild_trace(&program).unwrap();
    assert_eq!(trace.events.len(), 21);
    assert_eq!(hash, replay::rebuild_hash(&program).unwrap());
}

#[test]
fn recorded_trace_round_trips_and_matches_replay() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("lvalues.trace.json");

    let (name, program) = load_program(&golden_program()).unwrap();
    let (trace, hash) = replay::rebuild_trace(&program).unwrap();
    save_recorded(&out, &RecordedTrace::new(name, trace.clone())).unwrap();

    let loaded = load_recorded(&out).unwrap();
    assert_eq!(loaded.hash, hash);
    let report = compare_traces(&loaded.events.lines(), &trace.lines());
    assert!(report.is_clean(), "{}", report);
}

#[test]
fn edited_recording_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("wd.trace.json");
    let program: Program = serde_json::from_value(serde_json::json!({
        "classes": [{ "name": "Wd" }],
        "steps": [{ "op": "declare", "name": "a", "type": "Wd" }]
    }))
    .unwrap();
    let (trace, _) = replay::rebuild_trace(&program).unwrap();
    save_recorded(&out, &RecordedTrace::new("wd", trace)).unwrap();

    let edited = fs::read_to_string(&out)
        .unwrap()
        .replace("\"construct\"", "\"copy-construct\"");
    fs::write(&out, edited).unwrap();

    assert!(matches!(
        load_recorded(&out),
        Err(RuntimeError::DigestMismatch { .. })
    ));
}

#[test]
fn resolution_error_surfaces_from_replay() {
    let program: Program = serde_json::from_value(serde_json::json!({
        "steps": [{ "op": "exit_scope" }]
    }))
    .unwrap();
    let err = replay::rebuild_trace(&program).unwrap_err();
    assert!(matches!(err, RuntimeError::Resolve(_)));
    assert_eq!(err.to_string(), "exit_scope without a matching enter_scope");
}

// ─────────────────────────────────────────────────────────────
// CLI
// ─────────────────────────────────────────────────────────────

fn osmr() -> Command {
    Command::new(env!("CARGO_BIN_EXE_osmr"))
}

#[test]
fn cli_check_passes_bundled_scenarios() {
    let output = osmr().arg("check").arg(scenarios_dir()).output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", stdout);
    assert!(stdout.lines().any(|l| l.starts_with("PASS ")));
    assert!(!stdout.lines().any(|l| l.starts_with("FAIL ")));
}

#[test]
fn cli_check_fails_under_no_elide_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("elided.json");
    fs::write(
        &path,
        serde_json::json!({
            "name": "elided by-value temporary",
            "program": {
                "classes": [{ "name": "Wd" }],
                "functions": [
                    { "name": "sink", "parameter_type": "Wd", "overloads": ["by_value"] }
                ],
                "steps": [{
                    "op": "call",
                    "function": "sink",
                    "argument": { "origin": "temporary", "type": "Wd" }
                }]
            },
            "expect": { "trace": ["construct Wd#1", "call sink(Wd) with Wd#1", "destruct Wd#1"] }
        })
        .to_string(),
    )
    .unwrap();

    let ok = osmr().arg("check").arg(&path).output().unwrap();
    assert!(ok.status.success());

    let failed = osmr().args(["--no-elide", "check"]).arg(&path).output().unwrap();
    assert!(!failed.status.success());
    let stdout = String::from_utf8_lossy(&failed.stdout);
    assert!(stdout.contains("FAIL elided by-value temporary"), "{}", stdout);
}

#[test]
fn cli_trace_prints_golden_lines() {
    let output = osmr().arg("trace").arg(golden_program()).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let expected =
        fs::read_to_string(golden_program().with_file_name("expected_trace.txt")).unwrap();
    assert_eq!(stdout.trim_end(), expected.trim_end());
}

#[test]
fn cli_record_writes_verifiable_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("golden.trace.json");
    let output = osmr()
        .arg("record")
        .arg(golden_program())
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success());
    let record = load_recorded(&out).unwrap();
    assert_eq!(record.name, "lvalues_program");
    assert_eq!(record.events.events.len(), 21);
}

#[test]
fn cli_reports_error_once() {
    let output = osmr()
        .args(["trace", "/nonexistent/osmr.json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("/nonexistent/osmr.json").count(), 1, "{}", stderr);
    assert!(stderr.starts_with("error: "), "{}", stderr);
}
