//! Scenario files: a named program plus what it is expected to produce.
//!
//! ```json
//! {
//!   "name": "copy-only assignment",
//!   "program": { "classes": [...], "steps": [...] },
//!   "expect": { "trace": ["construct Wd#1", "..."] }
//! }
//! ```
//!
//! `expect.error` holds an error code such as `DeletedMemberSelected`.
//! A scenario without `expect` only has to run to completion.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use osmr_engine::program::Program;

use crate::error::{Result, RuntimeError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub program: Program,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<Expectation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Parse one scenario file.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let content = fs::read_to_string(path).map_err(RuntimeError::io(path))?;
    let scenario: Scenario = serde_json::from_str(&content).map_err(RuntimeError::json(path))?;

    if let Some(Expectation {
        trace: Some(_),
        error: Some(_),
    }) = &scenario.expect
    {
        return Err(RuntimeError::InvalidScenario {
            path: path.to_path_buf(),
            reason: "expect may name a trace or an error, not both".to_string(),
        });
    }
    if scenario.name.trim().is_empty() {
        return Err(RuntimeError::InvalidScenario {
            path: path.to_path_buf(),
            reason: "empty name".to_string(),
        });
    }

    debug!(
        path = %path.display(),
        name = %scenario.name,
        steps = scenario.program.steps.len(),
        "scenario loaded"
    );
    Ok(scenario)
}

/// Load either a scenario file or a bare program document. A bare program
/// is named after its file stem.
pub fn load_program(path: &Path) -> Result<(String, Program)> {
    let content = fs::read_to_string(path).map_err(RuntimeError::io(path))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(RuntimeError::json(path))?;
    if value.get("program").is_some() {
        let scenario = load_scenario(path)?;
        return Ok((scenario.name, scenario.program));
    }
    let program: Program = serde_json::from_value(value).map_err(RuntimeError::json(path))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok((name, program))
}

/// Expand files and directories into scenario file paths.
/// Directories contribute their `*.json` files, sorted by name; they are
/// not searched recursively.
pub fn collect_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            for entry in fs::read_dir(input).map_err(RuntimeError::io(input))? {
                let path = entry.map_err(RuntimeError::io(input))?.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                    found.push(path);
                }
            }
            found.sort();
            out.extend(found);
        } else {
            out.push(input.clone());
        }
    }
    Ok(out)
}

/// Load every scenario under `inputs`, in path order.
pub fn load_all(inputs: &[PathBuf]) -> Result<Vec<(PathBuf, Scenario)>> {
    collect_paths(inputs)?
        .into_iter()
        .map(|path| load_scenario(&path).map(|s| (path, s)))
        .collect()
}
