#![forbid(unsafe_code)]

//! OSMR: Overload & Special-Member Resolver
//!
//! Predicts which overload and which special member function fires for a
//! call site, and simulates the resulting object lifecycle trace.
//!
//! Data flow: argument origin -> category -> overload selection
//! (consulting the special-member table) -> lifecycle transitions -> trace.

/// Ruleset v1. Part of the canonical trace identity.
pub const RULESET_VERSION: u32 = 1;

pub mod category;
pub mod domain;
pub mod error;
pub mod events;
pub mod members;
pub mod overload;
pub mod program;
pub mod state;
pub mod transitions;
pub mod invariants;
pub mod hashing;
pub mod engine;

pub use engine::{run_program, run_program_with, Simulator};
pub use error::{ResolveError, Result};
