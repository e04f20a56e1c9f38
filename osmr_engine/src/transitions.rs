/// OSMR: Centralized Transition Logic
///
/// ALL lifecycle mutation lives here. Each step is applied to a clone of
/// the state; on error the clone is dropped and the caller's state is
/// untouched.
///
/// Object state machine:
///   construct / copy-construct / move-construct   Uninitialized -> Live
///   move-construct, move-assign (source)          Live -> MovedFrom
///   copy-assign / move-assign (target)            -> Live
///   destruct                                      Live | MovedFrom -> Destroyed

use tracing::trace;

use crate::category::{classify, Expression};
use crate::domain::{
    Binding, EventKind, ObjectId, ObjectRecord, ObjectState, ParameterForm, Scope, SimState,
    SpecialMember, StepOutcome, TraceEvent, ValueCategory,
};
use crate::error::{ResolveError, Result};
use crate::events::{Argument, Step, StepEnvelope};
use crate::overload::{
    resolve_default_construction, resolve_destruction, resolve_special_member, select_overload,
    Candidate, MemberOperation,
};
use crate::state::Catalog;

// ---------------------------------------------------------------------------
// Public dispatcher
// ---------------------------------------------------------------------------

/// Apply one step to `state` and return `(new_state, outcome)`.
pub fn apply_step(
    catalog: &Catalog,
    state: &SimState,
    envelope: &StepEnvelope,
) -> Result<(SimState, StepOutcome)> {
    let mut frame = Frame::new(catalog, state);

    match &envelope.step {
        Step::EnterScope => frame.state.scopes.push(Scope::default()),
        Step::ExitScope => frame.exit_scope()?,
        Step::Declare { name, type_name } => frame.declare(name, type_name)?,
        Step::DeclareFrom {
            name,
            type_name,
            init,
        } => frame.declare_from(name, type_name, init)?,
        Step::Assign { target, value } => frame.assign_step(target, value)?,
        Step::Call { function, argument } => frame.call(function, argument)?,
        Step::DeclareContainer { name, element_type } => {
            frame.declare_container(name, element_type)?
        }
        Step::PushBack { container, value } => frame.push_back(container, value)?,
        Step::Destroy { name } => {
            let id = frame.lookup_object(name)?;
            frame.destroy(id)?;
        }
    }

    Ok(frame.finish(envelope.sequence))
}

/// Close every open scope, the program scope last.
pub fn apply_program_exit(catalog: &Catalog, state: &SimState) -> Result<(SimState, StepOutcome)> {
    let mut frame = Frame::new(catalog, state);
    while let Some(scope) = frame.state.scopes.pop() {
        frame.close_scope(scope)?;
    }
    // not a program step
    Ok(frame.finish(0))
}

// ---------------------------------------------------------------------------
// Working frame of one step
// ---------------------------------------------------------------------------

struct Frame<'a> {
    catalog: &'a Catalog,
    state: SimState,
    events: Vec<TraceEvent>,
    selected: Option<ParameterForm>,
}

/// An argument after evaluation: the object it denotes and its category.
struct Evaluated {
    id: ObjectId,
    category: ValueCategory,
    temporary: bool,
}

impl<'a> Frame<'a> {
    fn new(catalog: &'a Catalog, state: &SimState) -> Self {
        Self {
            catalog,
            state: state.clone(),
            events: Vec::new(),
            selected: None,
        }
    }

    fn finish(mut self, sequence: u64) -> (SimState, StepOutcome) {
        self.state.trace.extend(self.events.iter().cloned());
        let outcome = StepOutcome {
            sequence,
            events: self.events,
            selected: self.selected,
        };
        (self.state, outcome)
    }

    // -- step handlers ------------------------------------------------------

    fn exit_scope(&mut self) -> Result<()> {
        if self.state.scopes.len() <= 1 {
            return Err(ResolveError::ScopeUnderflow);
        }
        match self.state.scopes.pop() {
            Some(scope) => self.close_scope(scope),
            None => Err(ResolveError::ScopeUnderflow),
        }
    }

    fn declare(&mut self, name: &str, type_name: &str) -> Result<()> {
        self.ensure_unbound(name)?;
        let id = self.construct(type_name)?;
        self.bind(name, Binding::Object(id));
        Ok(())
    }

    fn declare_from(&mut self, name: &str, type_name: &str, init: &Argument) -> Result<()> {
        self.ensure_unbound(name)?;
        self.catalog.class(type_name)?;

        let id = match init {
            // T name = T();  constructed in place
            Argument::Temporary { type_name: t } if self.catalog.options.guaranteed_elision => {
                self.expect_type(MemberOperation::Construct, type_name, t, ValueCategory::Rvalue)?;
                self.construct(type_name)?
            }
            _ => {
                let src = self.evaluate(init)?;
                let class = self.class_of(src.id)?;
                self.expect_type(MemberOperation::Construct, type_name, &class, src.category)?;
                let id = self.construct_from(type_name, src.id, src.category)?;
                self.end_full_expression(&src)?;
                id
            }
        };

        self.bind(name, Binding::Object(id));
        Ok(())
    }

    fn assign_step(&mut self, target: &str, value: &Argument) -> Result<()> {
        let target_id = self.lookup_object(target)?;
        let class = self.class_of(target_id)?;
        let src = self.evaluate(value)?;
        let src_class = self.class_of(src.id)?;
        self.expect_type(MemberOperation::Assign, &class, &src_class, src.category)?;
        self.assign(target_id, src.id, src.category)?;
        self.end_full_expression(&src)
    }

    fn call(&mut self, function: &str, argument: &Argument) -> Result<()> {
        let catalog = self.catalog;
        let candidates = catalog.function(function)?;
        let declared_type = match argument {
            Argument::Temporary { type_name } => type_name.clone(),
            _ => {
                let id = self.lookup_argument(argument)?;
                self.class_of(id)?
            }
        };
        let expr = Expression::new(argument.origin(), declared_type.clone());
        let selection = select_overload(function, &expr, candidates)?;
        let signature = candidates[selection.index].signature(function);
        self.selected = Some(selection.form);

        let elide = self.catalog.options.guaranteed_elision;
        match (argument, selection.form) {
            // Temporary bound to a reference, or constructed directly in the
            // callee's parameter: one construction, destroyed at the end of
            // the full expression.
            (Argument::Temporary { .. }, form) if form.is_reference() || elide => {
                let tmp = self.construct(&declared_type)?;
                self.emit_call(tmp, &signature)?;
                self.destroy(tmp)
            }
            (_, ParameterForm::ByValue) => {
                let src = self.evaluate(argument)?;
                let param = self.construct_from(&declared_type, src.id, src.category)?;
                self.emit_call(param, &signature)?;
                self.destroy(param)?;
                self.end_full_expression(&src)
            }
            _ => {
                let id = self.lookup_argument(argument)?;
                self.require_usable(id)?;
                self.emit_call(id, &signature)
            }
        }
    }

    fn declare_container(&mut self, name: &str, element_type: &str) -> Result<()> {
        self.ensure_unbound(name)?;
        self.catalog.class(element_type)?;
        self.bind(
            name,
            Binding::Container {
                element_class: element_type.to_string(),
                elements: Vec::new(),
            },
        );
        Ok(())
    }

    /// `push_back(const T&)` / `push_back(T&&)`. The element is copy- or
    /// move-constructed in container storage from the bound reference.
    fn push_back(&mut self, container: &str, value: &Argument) -> Result<()> {
        let element_class = match self.lookup(container)? {
            Binding::Container { element_class, .. } => element_class.clone(),
            Binding::Object(_) => {
                return Err(ResolveError::NotAContainer {
                    name: container.to_string(),
                })
            }
        };

        let candidates = [
            Candidate::new(element_class.clone(), ParameterForm::ConstLvalueRef),
            Candidate::new(element_class.clone(), ParameterForm::RvalueRef),
        ];
        let declared_type = match value {
            Argument::Temporary { type_name } => type_name.clone(),
            _ => {
                let id = self.lookup_argument(value)?;
                self.class_of(id)?
            }
        };
        let expr = Expression::new(value.origin(), declared_type);
        let callee = format!("std::vector<{}>::push_back", element_class);
        let selection = select_overload(&callee, &expr, &candidates)?;
        self.selected = Some(selection.form);

        // push_back(T&&) forwards with std::move; push_back(const T&) copies.
        let inner = match selection.form {
            ParameterForm::RvalueRef => ValueCategory::Rvalue,
            _ => ValueCategory::Lvalue,
        };

        let src = self.evaluate(value)?;
        let element = self.construct_from(&element_class, src.id, inner)?;
        self.container_mut(container)?.push(element);
        self.end_full_expression(&src)
    }

    // -- lifecycle primitives -------------------------------------------------

    /// Default construction: `T()` or `T name;`.
    /// The destructor must be usable at the point of construction.
    fn construct(&mut self, class: &str) -> Result<ObjectId> {
        let table = self.catalog.class(class)?;
        resolve_default_construction(table)?;
        resolve_destruction(table)?;
        let id = self.allocate(class);
        self.transition(id, ObjectState::Live)?;
        self.emit(EventKind::Construct, id, None)?;
        Ok(id)
    }

    /// Copy or move construction of a new `class` object from `source`.
    fn construct_from(
        &mut self,
        class: &str,
        source: ObjectId,
        category: ValueCategory,
    ) -> Result<ObjectId> {
        self.require_usable(source)?;
        let table = self.catalog.class(class)?;
        let member = resolve_special_member(table, MemberOperation::Construct, category)?;
        resolve_destruction(table)?;

        let id = self.allocate(class);
        self.transition(id, ObjectState::Live)?;
        if member == SpecialMember::MoveConstructor {
            self.mark_moved_from(source)?;
            self.emit(EventKind::MoveConstruct, id, Some(source))?;
        } else {
            self.emit(EventKind::CopyConstruct, id, Some(source))?;
        }
        Ok(id)
    }

    fn assign(
        &mut self,
        target: ObjectId,
        source: ObjectId,
        category: ValueCategory,
    ) -> Result<()> {
        self.require_usable(target)?;
        self.require_usable(source)?;
        let class = self.class_of(target)?;
        let table = self.catalog.class(&class)?;
        let member = resolve_special_member(table, MemberOperation::Assign, category)?;

        let kind = if member == SpecialMember::MoveAssignment {
            self.mark_moved_from(source)?;
            EventKind::MoveAssign
        } else {
            EventKind::CopyAssign
        };
        // self-move leaves the target live
        self.transition(target, ObjectState::Live)?;
        self.emit(kind, target, Some(source))
    }

    fn destroy(&mut self, id: ObjectId) -> Result<()> {
        let record = self.record(id)?;
        match record.state {
            ObjectState::Destroyed => {
                return Err(ResolveError::DoubleDestroy {
                    class: record.class.clone(),
                    object: id,
                })
            }
            ObjectState::Uninitialized => {
                return Err(ResolveError::InvariantViolation(format!(
                    "[INVARIANT:destroy_uninitialized] {}{} was never constructed",
                    record.class, id
                )))
            }
            ObjectState::Live | ObjectState::MovedFrom => {}
        }
        let class = record.class.clone();
        resolve_destruction(self.catalog.class(&class)?)?;
        self.transition(id, ObjectState::Destroyed)?;
        self.emit(EventKind::Destruct, id, None)
    }

    /// Destroy a scope's bindings in reverse declaration order. Container
    /// elements go in insertion order.
    fn close_scope(&mut self, scope: Scope) -> Result<()> {
        for (_, binding) in scope.bindings.into_iter().rev() {
            match binding {
                Binding::Object(id) => self.destroy(id)?,
                Binding::Container { elements, .. } => {
                    for id in elements {
                        self.destroy(id)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Temporaries die at the end of the full expression that created them.
    fn end_full_expression(&mut self, evaluated: &Evaluated) -> Result<()> {
        if evaluated.temporary {
            self.destroy(evaluated.id)?;
        }
        Ok(())
    }

    // -- argument evaluation --------------------------------------------------

    /// Materialise a temporary, or resolve a name to its object.
    fn evaluate(&mut self, argument: &Argument) -> Result<Evaluated> {
        let category = classify(argument.origin());
        match argument {
            Argument::Temporary { type_name } => Ok(Evaluated {
                id: self.construct(type_name)?,
                category,
                temporary: true,
            }),
            _ => {
                let id = self.lookup_argument(argument)?;
                self.require_usable(id)?;
                Ok(Evaluated {
                    id,
                    category,
                    temporary: false,
                })
            }
        }
    }

    fn lookup_argument(&self, argument: &Argument) -> Result<ObjectId> {
        match argument.name() {
            Some(name) => self.lookup_object(name),
            None => Err(ResolveError::InvariantViolation(
                "[INVARIANT:named_argument] temporary has no name".to_string(),
            )),
        }
    }

    /// Types must match exactly; no conversions are modelled.
    fn expect_type(
        &self,
        operation: MemberOperation,
        expected: &str,
        found: &str,
        category: ValueCategory,
    ) -> Result<()> {
        if expected == found {
            return Ok(());
        }
        let callee = match operation {
            MemberOperation::Construct => format!("{}::{}", expected, expected),
            MemberOperation::Assign => format!("{}::operator=", expected),
        };
        Err(ResolveError::NoViableOverload {
            callee,
            argument: format!("{} of type {}", category, found),
        })
    }

    // -- scopes and names -----------------------------------------------------

    fn lookup(&self, name: &str) -> Result<&Binding> {
        self.state
            .scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.bindings.iter())
            .find(|(n, _)| n == name)
            .map(|(_, binding)| binding)
            .ok_or_else(|| ResolveError::UnknownName {
                name: name.to_string(),
            })
    }

    fn lookup_object(&self, name: &str) -> Result<ObjectId> {
        match self.lookup(name)? {
            Binding::Object(id) => Ok(*id),
            Binding::Container { .. } => Err(ResolveError::NotAnObject {
                name: name.to_string(),
            }),
        }
    }

    fn container_mut(&mut self, name: &str) -> Result<&mut Vec<ObjectId>> {
        self.state
            .scopes
            .iter_mut()
            .rev()
            .flat_map(|scope| scope.bindings.iter_mut())
            .find(|(n, _)| n == name)
            .and_then(|(_, binding)| match binding {
                Binding::Container { elements, .. } => Some(elements),
                Binding::Object(_) => None,
            })
            .ok_or_else(|| ResolveError::NotAContainer {
                name: name.to_string(),
            })
    }

    fn ensure_unbound(&self, name: &str) -> Result<()> {
        let innermost = self.state.scopes.last();
        if innermost.is_some_and(|scope| scope.bindings.iter().any(|(n, _)| n == name)) {
            return Err(ResolveError::Redeclared {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn bind(&mut self, name: &str, binding: Binding) {
        if let Some(scope) = self.state.scopes.last_mut() {
            scope.bindings.push((name.to_string(), binding));
        }
    }

    // -- object table ---------------------------------------------------------

    fn allocate(&mut self, class: &str) -> ObjectId {
        let id = ObjectId(self.state.next_id);
        self.state.next_id += 1;
        self.state.objects.insert(
            id,
            ObjectRecord {
                id,
                class: class.to_string(),
                state: ObjectState::Uninitialized,
            },
        );
        id
    }

    fn record(&self, id: ObjectId) -> Result<&ObjectRecord> {
        self.state.objects.get(&id).ok_or_else(|| {
            ResolveError::InvariantViolation(format!(
                "[INVARIANT:known_identity] {} was never allocated",
                id
            ))
        })
    }

    fn class_of(&self, id: ObjectId) -> Result<String> {
        Ok(self.record(id)?.class.clone())
    }

    fn require_usable(&self, id: ObjectId) -> Result<()> {
        let record = self.record(id)?;
        if record.state == ObjectState::Destroyed {
            return Err(ResolveError::UseAfterDestroy {
                class: record.class.clone(),
                object: id,
            });
        }
        Ok(())
    }

    fn transition(&mut self, id: ObjectId, to: ObjectState) -> Result<()> {
        self.record(id)?;
        if let Some(record) = self.state.objects.get_mut(&id) {
            record.state = to;
        }
        Ok(())
    }

    fn mark_moved_from(&mut self, id: ObjectId) -> Result<()> {
        if self.record(id)?.state == ObjectState::Live {
            self.transition(id, ObjectState::MovedFrom)?;
        }
        Ok(())
    }

    // -- trace ----------------------------------------------------------------

    fn emit_call(&mut self, id: ObjectId, signature: &str) -> Result<()> {
        let class = self.class_of(id)?;
        let event = TraceEvent {
            kind: EventKind::Call,
            object: id,
            class,
            source: None,
            callee: Some(signature.to_string()),
        };
        trace!(event = %event, "emit");
        self.events.push(event);
        Ok(())
    }

    /// Lifecycle events of trivial types are not observable and are skipped.
    fn emit(&mut self, kind: EventKind, id: ObjectId, source: Option<ObjectId>) -> Result<()> {
        let class = self.class_of(id)?;
        if self.catalog.class(&class)?.trivial {
            return Ok(());
        }
        let event = TraceEvent {
            kind,
            object: id,
            class,
            source,
            callee: None,
        };
        trace!(event = %event, "emit");
        self.events.push(event);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
