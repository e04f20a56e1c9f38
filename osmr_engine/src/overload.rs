/// OSMR: Overload Selector
///
/// Ranking, best first:
///   0. rvalue -> `T&&`, lvalue -> `T&`
///   1. `const T&` (either category)
///   2. `T` by value (either category)
/// `T&&` never binds an lvalue and `T&` never binds an rvalue.
/// Two candidates sharing the best rank are ambiguous.

use serde::{Deserialize, Serialize};

use crate::category::Expression;
use crate::domain::{MemberStatus, ParameterForm, SpecialMember, ValueCategory};
use crate::error::{ResolveError, Result};
use crate::members::SpecialMemberTable;

/// One overload of a free function: its parameter type and form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Candidate {
    pub parameter_type: String,
    pub form: ParameterForm,
}

impl Candidate {
    pub fn new(parameter_type: impl Into<String>, form: ParameterForm) -> Self {
        Self {
            parameter_type: parameter_type.into(),
            form,
        }
    }

    /// `test_val(Widget&&)`
    pub fn signature(&self, function: &str) -> String {
        format!("{}({})", function, self.form.spell(&self.parameter_type))
    }
}

/// The winning candidate of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Position in the candidate list.
    pub index: usize,
    pub form: ParameterForm,
}

/// Binding rank of `form` for an argument of `category`; `None` if not viable.
pub fn rank(category: ValueCategory, form: ParameterForm) -> Option<u8> {
    match (category, form) {
        (ValueCategory::Rvalue, ParameterForm::RvalueRef) => Some(0),
        (ValueCategory::Lvalue, ParameterForm::LvalueRef) => Some(0),
        (_, ParameterForm::ConstLvalueRef) => Some(1),
        (_, ParameterForm::ByValue) => Some(2),
        _ => None,
    }
}

/// Pick the best of `candidates` for `argument`.
///
/// Candidates taking a different type than the argument's declared type
/// are not viable; no conversions are modelled.
pub fn select_overload(
    callee: &str,
    argument: &Expression,
    candidates: &[Candidate],
) -> Result<Selection> {
    let viable = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.parameter_type == argument.declared_type)
        .map(|(index, c)| (index, c.form));
    select_by_rank(callee, argument.category(), &argument.declared_type, viable)
}

fn select_by_rank(
    callee: &str,
    category: ValueCategory,
    type_name: &str,
    candidates: impl IntoIterator<Item = (usize, ParameterForm)>,
) -> Result<Selection> {
    let mut best: Option<(u8, Selection)> = None;
    let mut tied = false;

    for (index, form) in candidates {
        let Some(r) = rank(category, form) else {
            continue;
        };
        match best {
            Some((best_rank, _)) if r > best_rank => {}
            Some((best_rank, _)) if r == best_rank => tied = true,
            _ => {
                best = Some((r, Selection { index, form }));
                tied = false;
            }
        }
    }

    match best {
        None => Err(no_viable(callee, category, type_name)),
        Some((_, selection)) if tied => Err(ResolveError::AmbiguousOverload {
            callee: callee.to_string(),
            category,
            form: selection.form,
        }),
        Some((_, selection)) => Ok(selection),
    }
}

// ---------------------------------------------------------------------------
// Special members
// ---------------------------------------------------------------------------

/// Copy/move operation being initialised from an argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOperation {
    Construct,
    Assign,
}

impl MemberOperation {
    fn members(self) -> (SpecialMember, SpecialMember) {
        match self {
            Self::Construct => (SpecialMember::CopyConstructor, SpecialMember::MoveConstructor),
            Self::Assign => (SpecialMember::CopyAssignment, SpecialMember::MoveAssignment),
        }
    }

    fn callee(self, class: &str) -> String {
        match self {
            Self::Construct => format!("{}::{}", class, class),
            Self::Assign => format!("{}::operator=", class),
        }
    }
}

/// Choose between the copy member (`const T&`) and the move member (`T&&`).
///
/// Suppressed members are not candidates, so an rvalue falls back to the
/// copy member when no move member exists. A deleted winner is fatal.
pub fn resolve_special_member(
    table: &SpecialMemberTable,
    operation: MemberOperation,
    category: ValueCategory,
) -> Result<SpecialMember> {
    let (copy, mv) = operation.members();
    let candidates: Vec<(SpecialMember, ParameterForm)> = [
        (copy, ParameterForm::ConstLvalueRef),
        (mv, ParameterForm::RvalueRef),
    ]
    .into_iter()
    .filter(|(member, _)| table.status(*member).is_candidate())
    .collect();

    let callee = operation.callee(&table.class);
    let forms = candidates.iter().map(|(_, form)| *form).enumerate();
    let selection = select_by_rank(&callee, category, &table.class, forms)?;
    let member = candidates[selection.index].0;

    ensure_not_deleted(table, member)?;
    Ok(member)
}

/// `T()` or `T name;`
pub fn resolve_default_construction(table: &SpecialMemberTable) -> Result<()> {
    match table.status(SpecialMember::DefaultConstructor) {
        MemberStatus::Suppressed => Err(ResolveError::NoViableOverload {
            callee: MemberOperation::Construct.callee(&table.class),
            argument: "an empty argument list".to_string(),
        }),
        _ => ensure_not_deleted(table, SpecialMember::DefaultConstructor),
    }
}

/// End of lifetime of an object of this class.
pub fn resolve_destruction(table: &SpecialMemberTable) -> Result<()> {
    ensure_not_deleted(table, SpecialMember::Destructor)
}

fn ensure_not_deleted(table: &SpecialMemberTable, member: SpecialMember) -> Result<()> {
    if table.status(member) == MemberStatus::Deleted {
        return Err(ResolveError::DeletedMemberSelected {
            class: table.class.clone(),
            member,
        });
    }
    Ok(())
}

fn no_viable(callee: &str, category: ValueCategory, type_name: &str) -> ResolveError {
    ResolveError::NoViableOverload {
        callee: callee.to_string(),
        argument: format!("{} of type {}", category, type_name),
    }
}
