/// OSMR: Resolution and Simulation Errors
///
/// Every failure is terminal for the run that produced it. The engine
/// applies steps to a clone, so a rejected step never leaves partial state.

use thiserror::Error;

use crate::domain::{ObjectId, ParameterForm, SpecialMember, ValueCategory};

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, ResolveError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no viable overload of {callee} for {argument}")]
    NoViableOverload { callee: String, argument: String },

    #[error("ambiguous call to {callee}: {form} matches {category} argument more than once")]
    AmbiguousOverload {
        callee: String,
        category: ValueCategory,
        form: ParameterForm,
    },

    #[error("call to deleted {member} of {class}")]
    DeletedMemberSelected { class: String, member: SpecialMember },

    #[error("object {class}{object} destroyed twice")]
    DoubleDestroy { class: String, object: ObjectId },

    #[error("invalid class descriptor {class:?}: {reason}")]
    InvalidClassDescriptor { class: String, reason: String },

    #[error("object {class}{object} used after destruction")]
    UseAfterDestroy { class: String, object: ObjectId },

    #[error("unknown name {name:?}")]
    UnknownName { name: String },

    #[error("unknown class {name:?}")]
    UnknownClass { name: String },

    #[error("unknown function {name:?}")]
    UnknownFunction { name: String },

    #[error("invalid function declaration {name:?}: {reason}")]
    InvalidFunctionDecl { name: String, reason: String },

    #[error("{name:?} is already declared in this scope")]
    Redeclared { name: String },

    #[error("{name:?} is not a container")]
    NotAContainer { name: String },

    #[error("{name:?} names a container, not an object")]
    NotAnObject { name: String },

    #[error("exit_scope without a matching enter_scope")]
    ScopeUnderflow,

    #[error("sequence violation: expected {expected}, got {got}")]
    SequenceViolation { expected: u64, got: u64 },

    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaVersionMismatch { expected: u32, got: u32 },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl ResolveError {
    /// Stable error code, used by scenario expectations.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoViableOverload { .. } => "NoViableOverload",
            Self::AmbiguousOverload { .. } => "AmbiguousOverload",
            Self::DeletedMemberSelected { .. } => "DeletedMemberSelected",
            Self::DoubleDestroy { .. } => "DoubleDestroy",
            Self::InvalidClassDescriptor { .. } => "InvalidClassDescriptor",
            Self::UseAfterDestroy { .. } => "UseAfterDestroy",
            Self::UnknownName { .. } => "UnknownName",
            Self::UnknownClass { .. } => "UnknownClass",
            Self::UnknownFunction { .. } => "UnknownFunction",
            Self::InvalidFunctionDecl { .. } => "InvalidFunctionDecl",
            Self::Redeclared { .. } => "Redeclared",
            Self::NotAContainer { .. } => "NotAContainer",
            Self::NotAnObject { .. } => "NotAnObject",
            Self::ScopeUnderflow => "ScopeUnderflow",
            Self::SequenceViolation { .. } => "SequenceViolation",
            Self::SchemaVersionMismatch { .. } => "SchemaVersionMismatch",
            Self::InvariantViolation(_) => "InvariantViolation",
        }
    }

    /// True for failures a compiler would report before the program runs.
    pub fn is_static(&self) -> bool {
        !matches!(
            self,
            Self::DoubleDestroy { .. } | Self::UseAfterDestroy { .. } | Self::InvariantViolation(_)
        )
    }
}
