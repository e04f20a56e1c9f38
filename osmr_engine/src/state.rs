/// OSMR: Catalog and State Construction
///
/// The catalog is everything a program declares up front. It is validated
/// once and never changes while steps are applied.

use std::collections::BTreeMap;

use crate::category::is_identifier;
use crate::domain::{SimState, SimulationOptions};
use crate::error::{ResolveError, Result};
use crate::members::{derive_all, SpecialMemberTable};
use crate::overload::Candidate;
use crate::program::Program;

/// Validated declarations of one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub classes: BTreeMap<String, SpecialMemberTable>,
    /// Overload sets by function name.
    pub functions: BTreeMap<String, Vec<Candidate>>,
    pub options: SimulationOptions,
}

impl Catalog {
    pub fn class(&self, name: &str) -> Result<&SpecialMemberTable> {
        self.classes.get(name).ok_or_else(|| ResolveError::UnknownClass {
            name: name.to_string(),
        })
    }

    pub fn function(&self, name: &str) -> Result<&[Candidate]> {
        self.functions
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ResolveError::UnknownFunction {
                name: name.to_string(),
            })
    }
}

/// Derive member tables and collect overload sets.
///
/// Declarations sharing a function name are merged into one overload set,
/// in declaration order.
pub fn build_catalog(program: &Program) -> Result<Catalog> {
    let classes = derive_all(&program.classes)?;

    let mut functions: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
    for decl in &program.functions {
        if !is_identifier(&decl.name) {
            return Err(ResolveError::InvalidFunctionDecl {
                name: decl.name.clone(),
                reason: "function name must match [A-Za-z_][A-Za-z0-9_]*".to_string(),
            });
        }
        if !classes.contains_key(&decl.parameter_type) {
            return Err(ResolveError::UnknownClass {
                name: decl.parameter_type.clone(),
            });
        }
        functions.entry(decl.name.clone()).or_default().extend(
            decl.overloads
                .iter()
                .map(|form| Candidate::new(decl.parameter_type.clone(), *form)),
        );
    }

    Ok(Catalog {
        classes,
        functions,
        options: program.options.clone(),
    })
}

/// Fresh state: no objects, only the program scope open.
pub fn create_initial_state() -> SimState {
    SimState::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParameterForm;
    use crate::members::ClassDescriptor;
    use crate::program::FunctionDecl;

    fn program() -> Program {
        Program {
            classes: vec![ClassDescriptor::new("Widget")],
            functions: vec![
                FunctionDecl::new("test_val", "Widget", &[ParameterForm::LvalueRef]),
                FunctionDecl::new("test_val", "Widget", &[ParameterForm::RvalueRef]),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_overload_sets_are_merged() {
        let catalog = build_catalog(&program()).unwrap();
        let f = catalog.function("test_val").unwrap();
        assert_eq!(
            f,
            &[
                Candidate::new("Widget", ParameterForm::LvalueRef),
                Candidate::new("Widget", ParameterForm::RvalueRef),
            ]
        );
    }

    #[test]
    fn test_unknown_parameter_type_rejected() {
        let mut p = program();
        p.functions
            .push(FunctionDecl::new("other", "Gadget", &[ParameterForm::ByValue]));
        assert_eq!(build_catalog(&p).unwrap_err().code(), "UnknownClass");
    }

    #[test]
    fn test_overload_set_spans_parameter_types() {
        let mut p = program();
        p.classes.push(ClassDescriptor::scalar("int"));
        p.functions
            .push(FunctionDecl::new("test_val", "int", &[ParameterForm::ByValue]));
        let catalog = build_catalog(&p).unwrap();
        let f = catalog.function("test_val").unwrap();
        assert_eq!(f.len(), 3);
        assert_eq!(f[2].signature("test_val"), "test_val(int)");
    }

    #[test]
    fn test_malformed_function_name_rejected() {
        let mut p = program();
        p.functions
            .push(FunctionDecl::new("operator ()", "Widget", &[ParameterForm::ByValue]));
        let err = build_catalog(&p).unwrap_err();
        assert_eq!(err.code(), "InvalidFunctionDecl");
        assert!(err.to_string().contains("must match"), "{}", err);
    }

    #[test]
    fn test_unknown_function_lookup() {
        let catalog = build_catalog(&program()).unwrap();
        assert_eq!(catalog.function("nope").unwrap_err().code(), "UnknownFunction");
    }

    #[test]
    fn test_initial_state_has_program_scope() {
        let s = create_initial_state();
        assert_eq!(s.scopes.len(), 1);
        assert_eq!(s.next_id, 1);
        assert!(s.trace.is_empty());
    }
}
