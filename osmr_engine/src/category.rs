/// OSMR: Value-Category Classifier
///
/// Pure. The category depends on the syntactic origin only.

use serde::{Deserialize, Serialize};

use crate::domain::{Origin, ValueCategory};

/// A call-site argument as the selector sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expression {
    pub origin: Origin,
    pub declared_type: String,
}

impl Expression {
    pub fn new(origin: Origin, declared_type: impl Into<String>) -> Self {
        Self {
            origin,
            declared_type: declared_type.into(),
        }
    }

    pub fn category(&self) -> ValueCategory {
        classify(self.origin)
    }
}

/// Classify an origin.
///
/// A named parameter is an lvalue inside the callee even when it was
/// declared `T&&`: it has a name, so its address can be taken.
pub fn classify(origin: Origin) -> ValueCategory {
    match origin {
        Origin::VariableReference | Origin::FunctionParameter => ValueCategory::Lvalue,
        Origin::Temporary | Origin::ExplicitMoveCast => ValueCategory::Rvalue,
    }
}

/// Whether `name` is usable as a class or variable name: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_variable_is_lvalue() {
        assert_eq!(classify(Origin::VariableReference), ValueCategory::Lvalue);
    }

    #[test]
    fn test_temporary_and_move_cast_are_rvalues() {
        assert_eq!(classify(Origin::Temporary), ValueCategory::Rvalue);
        assert_eq!(classify(Origin::ExplicitMoveCast), ValueCategory::Rvalue);
    }

    #[test]
    fn test_rvalue_reference_parameter_is_lvalue_in_body() {
        let wd = Expression::new(Origin::FunctionParameter, "Widget");
        assert_eq!(wd.category(), ValueCategory::Lvalue);
    }

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("Wd_constr_destr"));
        assert!(is_identifier("_tmp1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("Wd constr"));
        assert!(!is_identifier("std::vector"));
    }
}
