//! The workflow engine.
//!
//! `Workflow` ties a [`Definition`] to a [`MarkingStore`] and computes, for a
//! given subject:
//! 1. its marking (bootstrapping the initial places on first contact),
//! 2. the transitions currently enabled (all source places marked, no guard
//!    veto),
//! 3. the result of applying a named transition, publishing lifecycle events
//!    in the order guard → leave → transition → enter → entered → announce.
//!
//! Calls are synchronous. The engine reads then writes the marking without
//! locking, so callers must not apply transitions to the same subject
//! concurrently.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use marking::{Context, Marking, MarkingStore};

use crate::auth::AuthorizationChecker;
use crate::events::{Event, EventDispatcher, Stage, Topic};
use crate::validator::{DefinitionValidator, Discipline, StateMachineValidator};
use crate::{Definition, EngineError, Transition};

/// Executes transitions of one [`Definition`] against subjects of type `S`.
pub struct Workflow<S, C = Context> {
    name: String,
    definition: Definition,
    store: Arc<dyn MarkingStore<S, C>>,
    dispatcher: Option<Arc<EventDispatcher<S, C>>>,
    authorization: Option<Arc<dyn AuthorizationChecker>>,
    discipline: Discipline,
}

impl<S, C> Workflow<S, C> {
    /// Create a free-form workflow. No structural validation beyond what
    /// [`Definition::new`] performed is applied.
    pub fn new(
        name: impl Into<String>,
        definition: Definition,
        store: Arc<dyn MarkingStore<S, C>>,
    ) -> Self {
        Self {
            name: name.into(),
            definition,
            store,
            dispatcher: None,
            authorization: None,
            discipline: Discipline::Workflow,
        }
    }

    /// Create a workflow under the strict state-machine discipline.
    ///
    /// # Errors
    /// Any [`StateMachineValidator`] failure.
    pub fn state_machine(
        name: impl Into<String>,
        definition: Definition,
        store: Arc<dyn MarkingStore<S, C>>,
    ) -> Result<Self, EngineError> {
        let name = name.into();
        StateMachineValidator.validate(&definition, &name)?;

        let mut workflow = Self::new(name, definition, store);
        workflow.discipline = Discipline::StateMachine;
        Ok(workflow)
    }

    /// Publish lifecycle events (and consult guard listeners) through
    /// `dispatcher`.
    pub fn with_dispatcher(mut self, dispatcher: Arc<EventDispatcher<S, C>>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Check declared transition roles with `checker`. Without a checker,
    /// role-guarded transitions can never be applied.
    pub fn with_authorization(mut self, checker: Arc<dyn AuthorizationChecker>) -> Self {
        self.authorization = Some(checker);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    pub fn marking_store(&self) -> &Arc<dyn MarkingStore<S, C>> {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Read the subject's marking.
    ///
    /// An unmarked subject is placed in the definition's initial places and
    /// the new marking is persisted before returning.
    ///
    /// # Errors
    /// - [`EngineError::InvalidMarking`] if the store cannot produce a marking.
    /// - [`EngineError::NoInitialPlace`] if the subject is unmarked and the
    ///   definition has no initial place.
    /// - [`EngineError::UnknownPlace`] if the marking holds a place the
    ///   definition does not declare.
    /// - [`EngineError::Store`] if persisting the initial marking fails.
    pub fn marking(&self, subject: &mut S) -> Result<Marking<C>, EngineError> {
        let mut marking = self
            .store
            .get_marking(subject)
            .map_err(|source| EngineError::InvalidMarking {
                workflow: self.name.clone(),
                source,
            })?;

        if marking.is_empty() {
            let initial = self.definition.initial_places();
            if initial.is_empty() {
                return Err(EngineError::NoInitialPlace {
                    workflow: self.name.clone(),
                });
            }

            for place in initial {
                marking.mark(place.as_str());
            }
            self.persist(subject, &marking, None)?;
            debug!(workflow = %self.name, places = ?initial, "subject entered the workflow");
        }

        for place in marking.places() {
            if !self.definition.has_place(place) {
                let hint = if self.definition.places().is_empty() {
                    " It seems you forgot to add places to the current workflow."
                } else {
                    ""
                };
                return Err(EngineError::UnknownPlace {
                    place: place.clone(),
                    workflow: self.name.clone(),
                    hint,
                });
            }
        }

        Ok(marking)
    }

    /// Whether a transition named `transition_name` is currently enabled.
    pub fn can(&self, subject: &mut S, transition_name: &str) -> Result<bool, EngineError> {
        Ok(self
            .enabled_transitions(subject)?
            .iter()
            .any(|transition| transition.name() == transition_name))
    }

    /// Transitions whose source places are all marked and that no guard
    /// blocks, in definition order.
    pub fn enabled_transitions(&self, subject: &mut S) -> Result<Vec<&Transition>, EngineError> {
        let marking = self.marking(subject)?;
        Ok(self.enabled_for(subject, &marking))
    }

    // -----------------------------------------------------------------------
    // Application
    // -----------------------------------------------------------------------

    /// Apply every enabled transition named `transition_name` and return the
    /// resulting marking.
    ///
    /// When several transitions share the name and are enabled at once they
    /// are all applied, in definition order.
    ///
    /// # Errors
    /// Everything [`Workflow::marking`] can return, [`EngineError::Store`] if
    /// the new marking cannot be persisted, and
    /// [`EngineError::NotApplicable`] if no transition was applied.
    pub fn apply(&self, subject: &mut S, transition_name: &str) -> Result<Marking<C>, EngineError> {
        self.apply_inner(subject, transition_name, None)
    }

    /// Like [`Workflow::apply`], additionally handing `context` to the store
    /// and recording it on the returned marking.
    pub fn apply_with_context(
        &self,
        subject: &mut S,
        transition_name: &str,
        context: C,
    ) -> Result<Marking<C>, EngineError> {
        self.apply_inner(subject, transition_name, Some(context))
    }

    #[instrument(name = "apply", skip(self, subject, context), fields(workflow = %self.name))]
    fn apply_inner(
        &self,
        subject: &mut S,
        transition_name: &str,
        context: Option<C>,
    ) -> Result<Marking<C>, EngineError> {
        let mut marking = self.marking(subject)?;
        // Only the context handed to this call may come back out.
        marking.clear_context();
        let enabled = self.enabled_for(subject, &marking);

        let mut applied = false;
        for transition in enabled.into_iter().filter(|t| t.name() == transition_name) {
            if !self.is_authorized(transition) {
                continue;
            }
            applied = true;

            self.leave(subject, transition, &mut marking);
            self.transition(subject, transition, &marking);
            self.enter(subject, transition, &mut marking);
            self.persist(subject, &marking, context.as_ref())?;
            self.entered(subject, transition, &marking);
            self.announce(subject, transition, &marking);
        }

        if !applied {
            return Err(EngineError::NotApplicable {
                transition: transition_name.to_owned(),
                workflow: self.name.clone(),
            });
        }

        if let Some(context) = context {
            marking.set_context(context);
        }
        info!(places = ?marking.places(), "transition applied");

        Ok(marking)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn enabled_for(&self, subject: &S, marking: &Marking<C>) -> Vec<&Transition> {
        let enabled: Vec<&Transition> = self
            .definition
            .transitions()
            .iter()
            .filter(|transition| self.is_enabled(subject, marking, transition))
            .collect();
        debug!(
            workflow = %self.name,
            enabled = ?enabled.iter().map(|t| t.name()).collect::<Vec<_>>(),
            "computed enabled transitions"
        );
        enabled
    }

    fn is_enabled(&self, subject: &S, marking: &Marking<C>, transition: &Transition) -> bool {
        transition.froms().iter().all(|place| marking.has(place))
            && !self.is_guarded(subject, marking, transition)
    }

    fn is_guarded(&self, subject: &S, marking: &Marking<C>, transition: &Transition) -> bool {
        let Some(dispatcher) = &self.dispatcher else {
            return false;
        };
        let mut event = Event::new(Stage::Guard, subject, marking, transition, &self.name);
        self.notify(dispatcher, &mut event, [transition.name()]);
        event.is_blocked()
    }

    fn is_authorized(&self, transition: &Transition) -> bool {
        if transition.roles().is_empty() {
            return true;
        }

        let Some(checker) = &self.authorization else {
            warn!(
                workflow = %self.name,
                transition = transition.name(),
                "transition requires roles but no authorization checker is configured; skipping"
            );
            return false;
        };

        let mut granted = false;
        for role in transition.roles() {
            granted |= checker.is_granted(role);
        }
        if !granted {
            debug!(
                workflow = %self.name,
                transition = transition.name(),
                roles = ?transition.roles(),
                "none of the required roles is granted"
            );
        }
        granted
    }

    fn persist(
        &self,
        subject: &mut S,
        marking: &Marking<C>,
        context: Option<&C>,
    ) -> Result<(), EngineError> {
        self.store
            .set_marking(subject, marking, context)
            .map_err(|source| EngineError::Store {
                workflow: self.name.clone(),
                source,
            })
    }

    fn leave(&self, subject: &S, transition: &Transition, marking: &mut Marking<C>) {
        if let Some(dispatcher) = &self.dispatcher {
            let mut event = Event::new(Stage::Leave, subject, &*marking, transition, &self.name);
            self.notify(dispatcher, &mut event, transition.froms().iter().map(String::as_str));
        }
        for place in transition.froms() {
            marking.unmark(place);
        }
    }

    fn transition(&self, subject: &S, transition: &Transition, marking: &Marking<C>) {
        if let Some(dispatcher) = &self.dispatcher {
            let mut event = Event::new(Stage::Transition, subject, marking, transition, &self.name);
            self.notify(dispatcher, &mut event, [transition.name()]);
        }
    }

    fn enter(&self, subject: &S, transition: &Transition, marking: &mut Marking<C>) {
        if let Some(dispatcher) = &self.dispatcher {
            let mut event = Event::new(Stage::Enter, subject, &*marking, transition, &self.name);
            self.notify(dispatcher, &mut event, transition.tos().iter().map(String::as_str));
        }
        for place in transition.tos() {
            marking.mark(place.as_str());
        }
    }

    fn entered(&self, subject: &S, transition: &Transition, marking: &Marking<C>) {
        if let Some(dispatcher) = &self.dispatcher {
            let mut event = Event::new(Stage::Entered, subject, marking, transition, &self.name);
            self.notify(dispatcher, &mut event, transition.tos().iter().map(String::as_str));
        }
    }

    /// One detail notification per transition name the new marking enables.
    fn announce(&self, subject: &S, transition: &Transition, marking: &Marking<C>) {
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };

        let mut names: Vec<&str> = Vec::new();
        for enabled in self.enabled_for(subject, marking) {
            if !names.contains(&enabled.name()) {
                names.push(enabled.name());
            }
        }

        let mut event = Event::new(Stage::Announce, subject, marking, transition, &self.name);
        self.notify(dispatcher, &mut event, names);
    }

    /// Global, then workflow-scoped, then one detail topic per `details`.
    fn notify<'d>(
        &self,
        dispatcher: &EventDispatcher<S, C>,
        event: &mut Event<'_, S, C>,
        details: impl IntoIterator<Item = &'d str>,
    ) {
        let stage = event.stage();
        dispatcher.dispatch(&Topic::global(stage), event);
        dispatcher.dispatch(&Topic::workflow(self.name.as_str(), stage), event);
        for detail in details {
            dispatcher.dispatch(&Topic::detail(self.name.as_str(), stage, detail), event);
        }
    }
}
