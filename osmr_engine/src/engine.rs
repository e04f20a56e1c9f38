/// OSMR: Simulator
///
/// Top-level orchestrator. Delegates mutation to transitions,
/// validates via invariants.
///
/// Strict sequence enforcement. A rejected step leaves the simulator
/// exactly as it was before the step.

use tracing::{debug, warn};

use crate::domain::{SimState, SimulationOptions, StepOutcome, Trace, TraceEvent};
use crate::error::{ResolveError, Result};
use crate::events::{StepEnvelope, SCHEMA_VERSION};
use crate::invariants::{validate_exit, validate_invariants};
use crate::program::Program;
use crate::state::{build_catalog, create_initial_state, Catalog};
use crate::transitions::{apply_program_exit, apply_step as transition_apply};

/// Stateful simulator wrapping the pure transition layer.
#[derive(Debug, Clone)]
pub struct Simulator {
    catalog: Catalog,
    state: SimState,
    last_sequence: u64,
}

impl Simulator {
    /// Validate the program's declarations and open the program scope.
    /// Steps are not applied.
    pub fn new(program: &Program) -> Result<Self> {
        if program.schema_version != SCHEMA_VERSION {
            return Err(ResolveError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                got: program.schema_version,
            });
        }
        let catalog = build_catalog(program)?;
        debug!(
            classes = catalog.classes.len(),
            functions = catalog.functions.len(),
            elision = catalog.options.guaranteed_elision,
            "catalog built"
        );
        Ok(Self {
            catalog,
            state: create_initial_state(),
            last_sequence: 0,
        })
    }

    /// Same as [`Simulator::new`] with the program's options replaced.
    pub fn with_options(program: &Program, options: SimulationOptions) -> Result<Self> {
        let mut sim = Self::new(program)?;
        sim.catalog.options = options;
        Ok(sim)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// Events emitted so far.
    pub fn trace(&self) -> &[TraceEvent] {
        &self.state.trace
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Apply a single step:
    ///   1. Validate sequence (strictly increasing, no gaps)
    ///   2. Delegate to transitions::apply_step
    ///   3. Validate invariants on the new state
    ///   4. Store and return the outcome
    pub fn apply_step(&mut self, envelope: &StepEnvelope) -> Result<StepOutcome> {
        let expected = self.last_sequence + 1;
        if envelope.sequence != expected {
            return Err(ResolveError::SequenceViolation {
                expected,
                got: envelope.sequence,
            });
        }

        debug!(sequence = envelope.sequence, op = envelope.step.op(), "applying step");
        let (new_state, outcome) = transition_apply(&self.catalog, &self.state, envelope)
            .and_then(|(s, o)| validate_invariants(&self.catalog, &s).map(|()| (s, o)))
            .inspect_err(|e| warn!(sequence = envelope.sequence, error = %e, "step rejected"))?;

        self.state = new_state;
        self.last_sequence = envelope.sequence;
        Ok(outcome)
    }

    /// Apply an ordered sequence of steps.
    pub fn apply_sequence(&mut self, envelopes: &[StepEnvelope]) -> Result<()> {
        for envelope in envelopes {
            self.apply_step(envelope)?;
        }
        Ok(())
    }

    /// Close every scope, validate the exit invariants and return the trace.
    pub fn finish(self) -> Result<Trace> {
        let (state, outcome) = apply_program_exit(&self.catalog, &self.state)?;
        validate_exit(&self.catalog, &state)?;
        debug!(
            exit_events = outcome.events.len(),
            total_events = state.trace.len(),
            "program exit"
        );
        Ok(Trace {
            events: state.trace,
        })
    }
}

/// Run a whole program: declarations, every step, program exit.
pub fn run_program(program: &Program) -> Result<Trace> {
    let mut sim = Simulator::new(program)?;
    sim.apply_sequence(&program.envelopes())?;
    sim.finish()
}

/// Same as [`run_program`] with the program's options replaced.
pub fn run_program_with(program: &Program, options: SimulationOptions) -> Result<Trace> {
    let mut sim = Simulator::with_options(program, options)?;
    sim.apply_sequence(&program.envelopes())?;
    sim.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Step;

    fn program() -> Program {
        serde_json::from_value(serde_json::json!({
            "classes": [{ "name": "Wd" }],
            "steps": [
                { "op": "declare", "name": "a", "type": "Wd" },
                { "op": "declare", "name": "b", "type": "Wd" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_run_program_closes_program_scope() {
        let trace = run_program(&program()).unwrap();
        assert_eq!(
            trace.lines(),
            vec!["construct Wd#1", "construct Wd#2", "destruct Wd#2", "destruct Wd#1"]
        );
    }

    #[test]
    fn test_sequence_gap_rejected() {
        let mut sim = Simulator::new(&program()).unwrap();
        let err = sim
            .apply_step(&StepEnvelope {
                sequence: 2,
                step: Step::EnterScope,
            })
            .unwrap_err();
        assert_eq!(err, ResolveError::SequenceViolation { expected: 1, got: 2 });
        assert_eq!(sim.last_sequence(), 0);
    }

    #[test]
    fn test_rejected_step_keeps_state() {
        let mut sim = Simulator::new(&program()).unwrap();
        sim.apply_sequence(&program().envelopes()).unwrap();
        let before = sim.state().clone();
        let err = sim
            .apply_step(&StepEnvelope {
                sequence: 3,
                step: Step::ExitScope,
            })
            .unwrap_err();
        assert_eq!(err, ResolveError::ScopeUnderflow);
        assert_eq!(sim.state(), &before);
        assert_eq!(sim.last_sequence(), 2);
    }

    #[test]
    fn test_schema_version_enforced() {
        let mut p = program();
        p.schema_version = 2;
        assert_eq!(
            Simulator::new(&p).unwrap_err(),
            ResolveError::SchemaVersionMismatch { expected: 1, got: 2 }
        );
    }

    #[test]
    fn test_option_override() {
        let sim = Simulator::with_options(
            &program(),
            SimulationOptions {
                guaranteed_elision: false,
            },
        )
        .unwrap();
        assert!(!sim.catalog().options.guaranteed_elision);
    }
}
