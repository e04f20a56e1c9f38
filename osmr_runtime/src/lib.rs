#![forbid(unsafe_code)]

//! OSMR Runtime
//!
//! Loads scenario files, replays them through the engine, compares the
//! result with expectations and records traces with their digests.
//!
//! No resolution logic lives here. Every rule is the engine's.

pub mod error;
pub mod scenario;
pub mod replay;
pub mod drift;
pub mod record;

pub use error::{Result, RuntimeError};
