/// OSMR: Core Domain Types
///
/// Pure data. No resolution rules, no transition logic.
/// Object identities are opaque tokens assigned in construction order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Expressions and parameters ─────────────────────────────────────

/// Value category of an argument expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueCategory {
    Lvalue,
    Rvalue,
}

impl ValueCategory {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lvalue => "lvalue",
            Self::Rvalue => "rvalue",
        }
    }
}

impl fmt::Display for ValueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Syntactic origin of a call-site argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// `wd`
    VariableReference,
    /// `Widget()`
    Temporary,
    /// `std::move(wd)`
    ExplicitMoveCast,
    /// A named parameter inside a callee body, whatever its declared form.
    FunctionParameter,
}

/// Parameter form of one candidate overload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterForm {
    ByValue,
    LvalueRef,
    ConstLvalueRef,
    RvalueRef,
}

impl ParameterForm {
    pub const fn name(self) -> &'static str {
        match self {
            Self::ByValue => "by-value",
            Self::LvalueRef => "lvalue-ref",
            Self::ConstLvalueRef => "const-lvalue-ref",
            Self::RvalueRef => "rvalue-ref",
        }
    }

    /// Spell the parameter type the way a declaration would: `const T&`.
    pub fn spell(self, type_name: &str) -> String {
        match self {
            Self::ByValue => type_name.to_string(),
            Self::LvalueRef => format!("{}&", type_name),
            Self::ConstLvalueRef => format!("const {}&", type_name),
            Self::RvalueRef => format!("{}&&", type_name),
        }
    }

    pub const fn is_reference(self) -> bool {
        !matches!(self, Self::ByValue)
    }
}

impl fmt::Display for ParameterForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Special members ────────────────────────────────────────────────

/// The six lifecycle operations a class may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialMember {
    DefaultConstructor,
    Destructor,
    CopyConstructor,
    CopyAssignment,
    MoveConstructor,
    MoveAssignment,
}

impl SpecialMember {
    pub const ALL: [SpecialMember; 6] = [
        Self::DefaultConstructor,
        Self::Destructor,
        Self::CopyConstructor,
        Self::CopyAssignment,
        Self::MoveConstructor,
        Self::MoveAssignment,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::DefaultConstructor => "default constructor",
            Self::Destructor => "destructor",
            Self::CopyConstructor => "copy constructor",
            Self::CopyAssignment => "copy assignment",
            Self::MoveConstructor => "move constructor",
            Self::MoveAssignment => "move assignment",
        }
    }
}

impl fmt::Display for SpecialMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a class explicitly declares a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Declared {
    /// `Widget(Widget&&) { ... }`
    UserDefined,
    /// `Widget(Widget&&) = delete;`
    Deleted,
}

/// Derived status of a member after the suppression rules ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    UserDefined,
    Implicit,
    /// Present as a candidate, fatal when selected.
    Deleted,
    /// Absent. Does not take part in overload resolution.
    Suppressed,
}

impl MemberStatus {
    /// Whether the member takes part in overload resolution.
    pub const fn is_candidate(self) -> bool {
        !matches!(self, Self::Suppressed)
    }
}

// ── Objects ────────────────────────────────────────────────────────

/// Opaque identity token. Never an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectState {
    Uninitialized,
    Live,
    MovedFrom,
    Destroyed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub class: String,
    pub state: ObjectState,
}

// ── Trace ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Construct,
    Destruct,
    CopyConstruct,
    MoveConstruct,
    CopyAssign,
    MoveAssign,
    /// An overload was entered.
    Call,
}

impl EventKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Construct => "construct",
            Self::Destruct => "destruct",
            Self::CopyConstruct => "copy-construct",
            Self::MoveConstruct => "move-construct",
            Self::CopyAssign => "copy-assign",
            Self::MoveAssign => "move-assign",
            Self::Call => "call",
        }
    }

    pub const fn is_move(self) -> bool {
        matches!(self, Self::MoveConstruct | Self::MoveAssign)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of the lifecycle trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceEvent {
    pub kind: EventKind,
    pub object: ObjectId,
    pub class: String,
    /// Source identity of copy/move events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ObjectId>,
    /// Spelled overload of call events, e.g. `test_val(Widget&&)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callee: Option<String>,
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.callee, &self.source) {
            (EventKind::Call, Some(callee), _) => {
                write!(f, "call {} with {}{}", callee, self.class, self.object)
            }
            (kind, _, Some(source)) => {
                write!(f, "{} {}{} from {}", kind, self.class, self.object, source)
            }
            (kind, _, None) => write!(f, "{} {}{}", kind, self.class, self.object),
        }
    }
}

/// Structured outcome of one applied step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub sequence: u64,
    pub events: Vec<TraceEvent>,
    /// Overload chosen by a `call` or `push_back` step.
    pub selected: Option<ParameterForm>,
}

// ── Configuration ──────────────────────────────────────────────────

/// Simulation knobs carried by the program document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationOptions {
    /// Construct temporaries directly into by-value parameters and named
    /// variables instead of materialising and moving them.
    pub guaranteed_elision: bool,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            guaranteed_elision: true,
        }
    }
}

// ── Simulation state ───────────────────────────────────────────────

/// What a name in scope refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Object(ObjectId),
    Container {
        element_class: String,
        elements: Vec<ObjectId>,
    },
}

/// One block. Bindings are kept in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub bindings: Vec<(String, Binding)>,
}

/// Complete simulation state. Cloned before every step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimState {
    pub objects: BTreeMap<ObjectId, ObjectRecord>,
    pub scopes: Vec<Scope>,
    pub trace: Vec<TraceEvent>,
    pub next_id: u64,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
            // program scope
            scopes: vec![Scope::default()],
            trace: Vec::new(),
            next_id: 1,
        }
    }
}

/// Completed, validated trace of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace {
    pub events: Vec<TraceEvent>,
}

impl Trace {
    /// One rendered line per event.
    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(|e| e.to_string()).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Events naming `id` as object or source.
    pub fn involving(&self, id: ObjectId) -> impl Iterator<Item = &TraceEvent> + '_ {
        self.events
            .iter()
            .filter(move |e| e.object == id || e.source == Some(id))
    }
}
