//! Replay: rebuild a program's trace and its canonical digest.
//!
//! All resolution and lifecycle logic lives in the engine.

use osmr_engine::domain::{SimulationOptions, Trace};
use osmr_engine::hashing::canonical_hash;
use osmr_engine::program::Program;
use osmr_engine::{run_program, run_program_with};

use crate::error::Result;

/// Run `program` from scratch and return `(trace, digest)`.
pub fn rebuild_trace(program: &Program) -> Result<(Trace, String)> {
    let trace = run_program(program)?;
    let hash = canonical_hash(&trace.events);
    Ok((trace, hash))
}

/// Same as [`rebuild_trace`] with `options` in place of the program's own.
pub fn rebuild_trace_with(
    program: &Program,
    options: SimulationOptions,
) -> Result<(Trace, String)> {
    let trace = run_program_with(program, options)?;
    let hash = canonical_hash(&trace.events);
    Ok((trace, hash))
}

pub fn rebuild_hash(program: &Program) -> Result<String> {
    rebuild_trace(program).map(|(_, hash)| hash)
}
