/// OSMR: Program Document
///
/// The declarative input: classes, overloaded functions, options and the
/// ordered call-site steps.

use serde::{Deserialize, Serialize};

use crate::domain::{ParameterForm, SimulationOptions};
use crate::events::{Step, StepEnvelope, SCHEMA_VERSION};
use crate::members::ClassDescriptor;

/// Overloads of a free function taking one parameter of `parameter_type`.
/// Several declarations may share a name; together they form one
/// overload set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionDecl {
    pub name: String,
    pub parameter_type: String,
    pub overloads: Vec<ParameterForm>,
}

impl FunctionDecl {
    pub fn new(
        name: impl Into<String>,
        parameter_type: impl Into<String>,
        overloads: &[ParameterForm],
    ) -> Self {
        Self {
            name: name.into(),
            parameter_type: parameter_type.into(),
            overloads: overloads.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Program {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub options: SimulationOptions,
    #[serde(default)]
    pub classes: Vec<ClassDescriptor>,
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Default for Program {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            options: SimulationOptions::default(),
            classes: Vec::new(),
            functions: Vec::new(),
            steps: Vec::new(),
        }
    }
}

impl Program {
    /// Steps numbered from 1 in document order.
    pub fn envelopes(&self) -> Vec<StepEnvelope> {
        self.steps
            .iter()
            .zip(1u64..)
            .map(|(step, sequence)| StepEnvelope {
                sequence,
                step: step.clone(),
            })
            .collect()
    }
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_program_defaults() {
        let p: Program = serde_json::from_str("{}").unwrap();
        assert_eq!(p.schema_version, SCHEMA_VERSION);
        assert!(p.options.guaranteed_elision);
        assert!(p.steps.is_empty());
    }

    #[test]
    fn test_envelopes_are_numbered_from_one() {
        let p = Program {
            steps: vec![Step::EnterScope, Step::ExitScope],
            ..Default::default()
        };
        let seqs: Vec<u64> = p.envelopes().iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn test_function_decl_from_json() {
        let v = serde_json::json!({
            "name": "test_val",
            "parameter_type": "int",
            "overloads": ["lvalue_ref", "rvalue_ref"]
        });
        let f: FunctionDecl = serde_json::from_value(v).unwrap();
        assert_eq!(
            f,
            FunctionDecl::new(
                "test_val",
                "int",
                &[ParameterForm::LvalueRef, ParameterForm::RvalueRef]
            )
        );
    }
}
