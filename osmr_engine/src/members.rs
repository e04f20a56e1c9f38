/// OSMR: Special-Member Table
///
/// Derives the status of all six special members from a class's explicit
/// declarations. Class variants are data, not generated types.
///
/// Rules, applied to members the class does not declare itself:
///   - move ctor / move assign: suppressed if any of destructor, copy ctor,
///     copy assign, move ctor, move assign is declared
///   - copy ctor / copy assign: deleted if a move ctor or move assign is
///     declared (user-defined or deleted)
///   - default ctor: suppressed if a copy or move ctor is declared
///   - destructor: always implicit

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::is_identifier;
use crate::domain::{Declared, MemberStatus, SpecialMember};
use crate::error::{ResolveError, Result};

/// One explicit member declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberDeclaration {
    pub member: SpecialMember,
    pub status: Declared,
}

/// A class as declared in the program document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassDescriptor {
    pub name: String,
    #[serde(default)]
    pub declarations: Vec<MemberDeclaration>,
    /// Scalar types such as `int`: overloads resolve normally but no
    /// lifecycle events are observable.
    #[serde(default)]
    pub trivial: bool,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declarations: Vec::new(),
            trivial: false,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            trivial: true,
            ..Self::new(name)
        }
    }

    pub fn user_defined(mut self, member: SpecialMember) -> Self {
        self.declarations.push(MemberDeclaration {
            member,
            status: Declared::UserDefined,
        });
        self
    }

    pub fn deleted(mut self, member: SpecialMember) -> Self {
        self.declarations.push(MemberDeclaration {
            member,
            status: Declared::Deleted,
        });
        self
    }
}

/// Derived status of every special member of one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialMemberTable {
    pub class: String,
    pub trivial: bool,
    statuses: BTreeMap<SpecialMember, MemberStatus>,
}

impl SpecialMemberTable {
    /// Validate a descriptor and derive its table.
    pub fn derive(descriptor: &ClassDescriptor) -> Result<Self> {
        let declared = validate_descriptor(descriptor)?;
        let is_declared = |m: SpecialMember| declared.contains_key(&m);

        let any_copy_move_or_dtor = [
            SpecialMember::Destructor,
            SpecialMember::CopyConstructor,
            SpecialMember::CopyAssignment,
            SpecialMember::MoveConstructor,
            SpecialMember::MoveAssignment,
        ]
        .into_iter()
        .any(is_declared);
        let any_move = is_declared(SpecialMember::MoveConstructor)
            || is_declared(SpecialMember::MoveAssignment);
        let any_other_ctor = is_declared(SpecialMember::CopyConstructor)
            || is_declared(SpecialMember::MoveConstructor);

        let mut statuses = BTreeMap::new();
        for member in SpecialMember::ALL {
            let status = match declared.get(&member) {
                Some(Declared::UserDefined) => MemberStatus::UserDefined,
                Some(Declared::Deleted) => MemberStatus::Deleted,
                None => match member {
                    SpecialMember::DefaultConstructor if any_other_ctor => MemberStatus::Suppressed,
                    SpecialMember::CopyConstructor | SpecialMember::CopyAssignment if any_move => {
                        MemberStatus::Deleted
                    }
                    SpecialMember::MoveConstructor | SpecialMember::MoveAssignment
                        if any_copy_move_or_dtor =>
                    {
                        MemberStatus::Suppressed
                    }
                    _ => MemberStatus::Implicit,
                },
            };
            statuses.insert(member, status);
        }

        Ok(Self {
            class: descriptor.name.clone(),
            trivial: descriptor.trivial,
            statuses,
        })
    }

    pub fn status(&self, member: SpecialMember) -> MemberStatus {
        self.statuses
            .get(&member)
            .copied()
            .unwrap_or(MemberStatus::Suppressed)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpecialMember, MemberStatus)> + '_ {
        self.statuses.iter().map(|(m, s)| (*m, *s))
    }
}

/// Build the table for every class of a program. Class names must be unique.
pub fn derive_all(classes: &[ClassDescriptor]) -> Result<BTreeMap<String, SpecialMemberTable>> {
    let mut tables = BTreeMap::new();
    for class in classes {
        let table = SpecialMemberTable::derive(class)?;
        if tables.insert(class.name.clone(), table).is_some() {
            return Err(invalid(&class.name, "class declared more than once"));
        }
    }
    Ok(tables)
}

fn validate_descriptor(descriptor: &ClassDescriptor) -> Result<BTreeMap<SpecialMember, Declared>> {
    let name = &descriptor.name;
    if !is_identifier(name) {
        return Err(invalid(name, "class name must match [A-Za-z_][A-Za-z0-9_]*"));
    }
    if descriptor.trivial && !descriptor.declarations.is_empty() {
        return Err(invalid(name, "a trivial type cannot declare special members"));
    }

    let mut declared = BTreeMap::new();
    for decl in &descriptor.declarations {
        if let Some(previous) = declared.insert(decl.member, decl.status) {
            let reason = if previous != decl.status {
                format!("{} declared both user-defined and deleted", decl.member)
            } else {
                format!("{} declared more than once", decl.member)
            };
            return Err(invalid(name, &reason));
        }
    }
    Ok(declared)
}

fn invalid(class: &str, reason: &str) -> ResolveError {
    ResolveError::InvalidClassDescriptor {
        class: class.to_string(),
        reason: reason.to_string(),
    }
}
