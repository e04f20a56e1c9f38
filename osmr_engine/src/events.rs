/// OSMR: Call-Site Step Definitions
///
/// Steps are pure data. They describe what the source program does at one
/// call site and contain no resolution logic.
///
/// Schema version is locked at 1.

use serde::{Deserialize, Serialize};

use crate::domain::Origin;

/// Schema version of the program document. Hardcoded.
pub const SCHEMA_VERSION: u32 = 1;

/// An argument expression at a call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case", deny_unknown_fields)]
pub enum Argument {
    /// `name`
    VariableReference { name: String },
    /// `T()`
    Temporary {
        #[serde(rename = "type")]
        type_name: String,
    },
    /// `std::move(name)`
    ExplicitMoveCast { name: String },
    /// A parameter named inside the current callee body.
    FunctionParameter { name: String },
}

impl Argument {
    pub fn origin(&self) -> Origin {
        match self {
            Self::VariableReference { .. } => Origin::VariableReference,
            Self::Temporary { .. } => Origin::Temporary,
            Self::ExplicitMoveCast { .. } => Origin::ExplicitMoveCast,
            Self::FunctionParameter { .. } => Origin::FunctionParameter,
        }
    }

    /// The variable this argument names, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::VariableReference { name }
            | Self::ExplicitMoveCast { name }
            | Self::FunctionParameter { name } => Some(name),
            Self::Temporary { .. } => None,
        }
    }

    pub fn temporary(type_name: impl Into<String>) -> Self {
        Self::Temporary {
            type_name: type_name.into(),
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::VariableReference { name: name.into() }
    }

    pub fn moved(name: impl Into<String>) -> Self {
        Self::ExplicitMoveCast { name: name.into() }
    }
}

/// One call-site step of the simulated program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// `{`
    EnterScope,
    /// `}`
    ExitScope,
    /// `T name;`
    Declare {
        name: String,
        #[serde(rename = "type")]
        type_name: String,
    },
    /// `T name = init;`
    DeclareFrom {
        name: String,
        #[serde(rename = "type")]
        type_name: String,
        init: Argument,
    },
    /// `target = value;`
    Assign { target: String, value: Argument },
    /// `function(argument);`
    Call { function: String, argument: Argument },
    /// `std::vector<T> name;`
    DeclareContainer {
        name: String,
        element_type: String,
    },
    /// `container.push_back(value);`
    PushBack { container: String, value: Argument },
    /// `name.~T();`
    Destroy { name: String },
}

impl Step {
    pub fn op(&self) -> &'static str {
        match self {
            Self::EnterScope => "enter_scope",
            Self::ExitScope => "exit_scope",
            Self::Declare { .. } => "declare",
            Self::DeclareFrom { .. } => "declare_from",
            Self::Assign { .. } => "assign",
            Self::Call { .. } => "call",
            Self::DeclareContainer { .. } => "declare_container",
            Self::PushBack { .. } => "push_back",
            Self::Destroy { .. } => "destroy",
        }
    }
}

/// Step envelope with its position in the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepEnvelope {
    pub sequence: u64,
    pub step: Step,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_call_with_temporary() {
        let v = serde_json::json!({
            "op": "call",
            "function": "test_val",
            "argument": { "origin": "temporary", "type": "Widget" }
        });
        let step: Step = serde_json::from_value(v).unwrap();
        assert_eq!(
            step,
            Step::Call {
                function: "test_val".to_string(),
                argument: Argument::temporary("Widget"),
            }
        );
        assert_eq!(step.op(), "call");
    }

    #[test]
    fn test_parse_unit_steps() {
        let step: Step =
            serde_json::from_value(serde_json::json!({ "op": "enter_scope" })).unwrap();
        assert_eq!(step, Step::EnterScope);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let v = serde_json::json!({ "op": "destroy", "name": "a", "extra": 1 });
        assert!(serde_json::from_value::<Step>(v).is_err());
    }

    #[test]
    fn test_argument_origin_and_name() {
        let a = Argument::moved("b");
        assert_eq!(a.origin(), Origin::ExplicitMoveCast);
        assert_eq!(a.name(), Some("b"));
        assert_eq!(Argument::temporary("Widget").name(), None);
    }
}
