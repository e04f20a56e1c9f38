//! Recorded traces: a trace saved together with its canonical digest.
//!
//! No timestamps in the file content. Loading recomputes the digest from
//! the stored events and rejects the file on mismatch.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use osmr_engine::domain::Trace;
use osmr_engine::hashing::canonical_hash;
use osmr_engine::RULESET_VERSION;

use crate::error::{Result, RuntimeError};

/// On-disk format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordedTrace {
    /// Scenario or program name the trace belongs to.
    pub name: String,
    /// Ruleset the trace was produced under.
    pub ruleset_version: u32,
    /// SHA-256 of the canonical serialization of `events`.
    pub hash: String,
    pub events: Trace,
}

impl RecordedTrace {
    pub fn new(name: impl Into<String>, trace: Trace) -> Self {
        Self {
            name: name.into(),
            ruleset_version: RULESET_VERSION,
            hash: canonical_hash(&trace.events),
            events: trace,
        }
    }

    /// Whether `hash` matches the stored events.
    pub fn verify_hash(&self) -> bool {
        canonical_hash(&self.events.events) == self.hash
    }
}

/// Write `record` to `path`, creating parent directories.
pub fn save_recorded(path: &Path, record: &RecordedTrace) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(RuntimeError::io(parent))?;
    }
    let content = serde_json::to_string_pretty(record).map_err(RuntimeError::json(path))?;

    let mut file = File::create(path).map_err(RuntimeError::io(path))?;
    file.write_all(content.as_bytes())
        .and_then(|()| file.write_all(b"\n"))
        .and_then(|()| file.sync_all())
        .map_err(RuntimeError::io(path))?;

    debug!(path = %path.display(), hash = %record.hash, "trace recorded");
    Ok(())
}

/// Load a recorded trace, verifying its ruleset and digest.
pub fn load_recorded(path: &Path) -> Result<RecordedTrace> {
    let content = fs::read_to_string(path).map_err(RuntimeError::io(path))?;
    let record: RecordedTrace = serde_json::from_str(&content).map_err(RuntimeError::json(path))?;

    if record.ruleset_version != RULESET_VERSION {
        return Err(RuntimeError::RulesetMismatch {
            path: path.to_path_buf(),
            recorded: record.ruleset_version,
            current: RULESET_VERSION,
        });
    }
    if !record.verify_hash() {
        return Err(RuntimeError::DigestMismatch {
            path: path.to_path_buf(),
            recorded: record.hash.clone(),
            computed: canonical_hash(&record.events.events),
        });
    }
    Ok(record)
}
