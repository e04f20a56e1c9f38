//! Runtime errors: file access, document parsing, recorded-trace integrity.
//! Resolution failures from the engine pass through unchanged.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use osmr_engine::ResolveError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: malformed JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: invalid scenario: {reason}")]
    InvalidScenario { path: PathBuf, reason: String },

    #[error("{path}: recorded digest {recorded} does not match trace digest {computed}")]
    DigestMismatch {
        path: PathBuf,
        recorded: String,
        computed: String,
    },

    #[error("{path}: recorded with ruleset v{recorded}, running v{current}")]
    RulesetMismatch {
        path: PathBuf,
        recorded: u32,
        current: u32,
    },

    #[error("nondeterministic replay: {first} != {second}")]
    Nondeterministic { first: String, second: String },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl RuntimeError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>) -> impl FnOnce(serde_json::Error) -> Self {
        let path = path.into();
        move |source| Self::Json { path, source }
    }
}
