//! Drift detection: determinism verification and trace comparison.
//!
//! Traces are compared by their rendered lines, so an expectation written
//! by hand and a recorded trace compare the same way.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use osmr_engine::domain::{SimulationOptions, Trace};
use osmr_engine::program::Program;
use osmr_engine::{run_program, run_program_with, ResolveError};

use crate::error::{Result, RuntimeError};
use crate::replay;
use crate::scenario::{Expectation, Scenario};

/// Replay `program` twice and require identical digests.
/// Returns the digest.
pub fn verify_determinism(program: &Program) -> Result<String> {
    let first = replay::rebuild_hash(program)?;
    let second = replay::rebuild_hash(program)?;
    if first != second {
        return Err(RuntimeError::Nondeterministic { first, second });
    }
    Ok(first)
}

/// Line-level comparison of an expected trace with an actual one.
pub fn compare_traces(expected: &[String], actual: &[String]) -> DriftReport {
    let first_divergence = expected
        .iter()
        .zip(actual)
        .position(|(e, a)| e != a)
        .or_else(|| (expected.len() != actual.len()).then(|| expected.len().min(actual.len())));

    let expected_counts = multiset(expected);
    let actual_counts = multiset(actual);

    let mut missing = Vec::new();
    for (line, n) in &expected_counts {
        let have = actual_counts.get(line).copied().unwrap_or(0);
        missing.extend(std::iter::repeat((*line).to_string()).take(n.saturating_sub(have)));
    }
    let mut unexpected = Vec::new();
    for (line, n) in &actual_counts {
        let want = expected_counts.get(line).copied().unwrap_or(0);
        unexpected.extend(std::iter::repeat((*line).to_string()).take(n.saturating_sub(want)));
    }

    let mut kind_deltas: BTreeMap<String, i64> = BTreeMap::new();
    for line in expected {
        *kind_deltas.entry(kind_of(line).to_string()).or_insert(0) -= 1;
    }
    for line in actual {
        *kind_deltas.entry(kind_of(line).to_string()).or_insert(0) += 1;
    }
    kind_deltas.retain(|_, delta| *delta != 0);

    DriftReport {
        expected_len: expected.len(),
        actual_len: actual.len(),
        first_divergence,
        missing,
        unexpected,
        kind_deltas,
    }
}

/// Structured drift report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftReport {
    pub expected_len: usize,
    pub actual_len: usize,
    /// Index of the first differing line, if any.
    pub first_divergence: Option<usize>,
    /// Expected lines absent from the actual trace (with multiplicity).
    pub missing: Vec<String>,
    /// Actual lines absent from the expectation (with multiplicity).
    pub unexpected: Vec<String>,
    /// Actual minus expected count per event kind; zero deltas omitted.
    pub kind_deltas: BTreeMap<String, i64>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.first_divergence.is_none()
    }
}

impl fmt::Display for DriftReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(index) = self.first_divergence else {
            return write!(f, "no drift ({} events)", self.actual_len);
        };
        writeln!(
            f,
            "first divergence at event {} (expected {} events, got {})",
            index, self.expected_len, self.actual_len
        )?;
        for line in &self.missing {
            writeln!(f, "  - {}", line)?;
        }
        for line in &self.unexpected {
            writeln!(f, "  + {}", line)?;
        }
        for (kind, delta) in &self.kind_deltas {
            writeln!(f, "  {}: {:+}", kind, delta)?;
        }
        Ok(())
    }
}

/// Result of checking one scenario against its expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass { events: usize },
    TraceMismatch(DriftReport),
    UnexpectedError(ResolveError),
    WrongError { expected: String, got: ResolveError },
    MissingError { expected: String, trace: Trace },
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass { events } => write!(f, "{} events", events),
            Verdict::TraceMismatch(report) => write!(f, "{}", report),
            Verdict::UnexpectedError(err) => write!(f, "unexpected {}: {}", err.code(), err),
            Verdict::WrongError { expected, got } => {
                write!(f, "expected {}, got {}: {}", expected, got.code(), got)
            }
            Verdict::MissingError { expected, trace } => write!(
                f,
                "expected {}, but the program ran ({} events)",
                expected,
                trace.events.len()
            ),
        }
    }
}

/// Run a scenario and judge it. `options` replaces the program's own
/// options when given.
pub fn check_scenario(scenario: &Scenario, options: Option<&SimulationOptions>) -> Verdict {
    let outcome = match options {
        Some(o) => run_program_with(&scenario.program, o.clone()),
        None => run_program(&scenario.program),
    };
    let expect = scenario.expect.clone().unwrap_or_default();

    let verdict = match (outcome, expect) {
        (Ok(trace), Expectation { error: Some(expected), .. }) => {
            Verdict::MissingError { expected, trace }
        }
        (Ok(trace), Expectation { trace: Some(lines), .. }) => {
            let report = compare_traces(&lines, &trace.lines());
            if report.is_clean() {
                Verdict::Pass {
                    events: trace.events.len(),
                }
            } else {
                Verdict::TraceMismatch(report)
            }
        }
        (Ok(trace), _) => Verdict::Pass {
            events: trace.events.len(),
        },
        (Err(err), Expectation { error: Some(expected), .. }) => {
            if err.code() == expected {
                Verdict::Pass { events: 0 }
            } else {
                Verdict::WrongError { expected, got: err }
            }
        }
        (Err(err), _) => Verdict::UnexpectedError(err),
    };
    debug!(scenario = %scenario.name, passed = verdict.passed(), "scenario checked");
    verdict
}

fn multiset(lines: &[String]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for line in lines {
        *counts.entry(line.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Event kind of a rendered line: its first word.
fn kind_of(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or("")
}
