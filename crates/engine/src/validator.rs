//! Structural validation, run once when a definition is assembled.
//!
//! Two disciplines are supported:
//! - **Workflow** (free-form Petri net): no constraint beyond the reference
//!   checks [`Definition::new`] already performs, unless the marking store
//!   can only persist a single place.
//! - **State machine**, rules checked in this order:
//!   1. every transition has exactly one input place,
//!   2. every transition has exactly one output place,
//!   3. no two transitions with the same name leave the same place,
//!   4. at most one initial place.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{Definition, EngineError};

/// Checks a definition against the rules of an execution discipline.
pub trait DefinitionValidator: Send + Sync {
    /// `name` identifies the workflow in error messages.
    fn validate(&self, definition: &Definition, name: &str) -> Result<(), EngineError>;
}

/// The structural rule set a definition must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    #[default]
    Workflow,
    StateMachine,
}

impl Discipline {
    /// Validate `definition` under this discipline.
    ///
    /// `single_place` tells a free-form workflow that its marking store can
    /// only persist one place; state machines always assume it.
    pub fn validate(
        self,
        definition: &Definition,
        name: &str,
        single_place: bool,
    ) -> Result<(), EngineError> {
        match self {
            Discipline::Workflow => WorkflowValidator::new(single_place).validate(definition, name),
            Discipline::StateMachine => StateMachineValidator.validate(definition, name),
        }
    }
}

// ---------------------------------------------------------------------------
// Free-form workflows
// ---------------------------------------------------------------------------

/// Validator for the free-form discipline.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowValidator {
    single_place: bool,
}

impl WorkflowValidator {
    pub fn new(single_place: bool) -> Self {
        Self { single_place }
    }
}

impl DefinitionValidator for WorkflowValidator {
    fn validate(&self, definition: &Definition, name: &str) -> Result<(), EngineError> {
        if !self.single_place {
            return Ok(());
        }

        for transition in definition.transitions() {
            if transition.tos().len() > 1 {
                return Err(EngineError::SinglePlaceOutputs {
                    workflow: name.to_owned(),
                    transition: transition.name().to_owned(),
                    count: transition.tos().len(),
                });
            }
        }

        let initial = definition.initial_places().len();
        if initial > 1 {
            return Err(EngineError::SinglePlaceInitialPlaces {
                workflow: name.to_owned(),
                count: initial,
            });
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// State machines
// ---------------------------------------------------------------------------

/// Validator for the strict state-machine discipline.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateMachineValidator;

impl DefinitionValidator for StateMachineValidator {
    fn validate(&self, definition: &Definition, name: &str) -> Result<(), EngineError> {
        // place -> names of transitions leaving it
        let mut leaving: HashMap<&str, HashSet<&str>> = HashMap::new();

        for transition in definition.transitions() {
            if transition.froms().len() != 1 {
                return Err(EngineError::StateMachineInputs {
                    transition: transition.name().to_owned(),
                    workflow: name.to_owned(),
                    count: transition.froms().len(),
                });
            }

            if transition.tos().len() != 1 {
                return Err(EngineError::StateMachineOutputs {
                    transition: transition.name().to_owned(),
                    workflow: name.to_owned(),
                    count: transition.tos().len(),
                });
            }

            let from = transition.froms()[0].as_str();
            if !leaving.entry(from).or_default().insert(transition.name()) {
                return Err(EngineError::DuplicateTransitionFromPlace {
                    transition: transition.name().to_owned(),
                    place: from.to_owned(),
                    workflow: name.to_owned(),
                });
            }
        }

        let initial = definition.initial_places().len();
        if initial > 1 {
            return Err(EngineError::StateMachineInitialPlaces {
                workflow: name.to_owned(),
                count: initial,
            });
        }

        Ok(())
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, Transition};

    fn t(name: &str, froms: &[&str], tos: &[&str]) -> Transition {
        Transition::new(name, froms.iter().copied(), tos.iter().copied()).unwrap()
    }

    fn abc(transitions: Vec<Transition>) -> Definition {
        Definition::new(["a", "b", "c"], transitions, None).unwrap()
    }

    #[test]
    fn same_name_leaving_same_place_is_rejected() {
        //   a --t1--> b
        //   a --t1--> c
        let def = abc(vec![t("t1", &["a"], &["b"]), t("t1", &["a"], &["c"])]);

        let err = StateMachineValidator.validate(&def, "foo").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDefinition);
        assert!(err
            .to_string()
            .contains("A transition from a place/state must have an unique name."));
    }

    #[test]
    fn multiple_outputs_are_rejected() {
        // a --t1--> b, c
        let def = abc(vec![t("t1", &["a"], &["b", "c"])]);

        let err = StateMachineValidator.validate(&def, "foo").unwrap_err();
        assert!(err
            .to_string()
            .contains("A transition in StateMachine can only have one output."));
    }

    #[test]
    fn multiple_inputs_are_rejected() {
        // a, b --t1--> c
        let def = abc(vec![t("t1", &["a", "b"], &["c"])]);

        let err = StateMachineValidator.validate(&def, "foo").unwrap_err();
        assert!(err
            .to_string()
            .contains("A transition in StateMachine can only have one input."));
    }

    #[test]
    fn inputs_are_checked_before_outputs() {
        let def = abc(vec![t("t1", &["a", "b"], &["b", "c"])]);
        assert!(matches!(
            StateMachineValidator.validate(&def, "foo"),
            Err(EngineError::StateMachineInputs { count: 2, .. })
        ));
    }

    #[test]
    fn branching_with_distinct_names_is_valid() {
        //   a --t1--> b
        //   a --t2--> c
        let def = abc(vec![t("t1", &["a"], &["b"]), t("t2", &["a"], &["c"])]);
        assert!(StateMachineValidator.validate(&def, "foo").is_ok());
    }

    #[test]
    fn same_name_from_different_places_is_valid() {
        let def = abc(vec![t("next", &["a"], &["b"]), t("next", &["b"], &["c"])]);
        assert!(StateMachineValidator.validate(&def, "foo").is_ok());
    }

    #[test]
    fn too_many_initial_places_are_rejected() {
        let def = Definition::new(["a", "b", "c"], vec![], Some(vec!["a".into(), "b".into()])).unwrap();

        let err = StateMachineValidator.validate(&def, "foo").unwrap_err();
        assert_eq!(
            err.to_string(),
            "The state machine \"foo\" cannot store many places. \
             But the definition has 2 initial places. Only one is supported."
        );
    }

    #[test]
    fn free_form_accepts_petri_net_shapes() {
        let def = Definition::new(
            ["a", "b", "c"],
            vec![t("go", &["a"], &["b"]), t("go", &["a"], &["c"]), t("join", &["b", "c"], &["a"])],
            Some(vec!["a".into(), "b".into()]),
        )
        .unwrap();
        assert!(WorkflowValidator::default().validate(&def, "foo").is_ok());
        assert!(Discipline::Workflow.validate(&def, "foo", false).is_ok());
    }

    #[test]
    fn single_place_workflow_limits_outputs_and_initial_places() {
        let fork = abc(vec![t("split", &["a"], &["b", "c"])]);
        assert!(matches!(
            WorkflowValidator::new(true).validate(&fork, "foo"),
            Err(EngineError::SinglePlaceOutputs { count: 2, .. })
        ));

        let join = abc(vec![t("join", &["a", "b"], &["c"])]);
        assert!(WorkflowValidator::new(true).validate(&join, "foo").is_ok());

        let two_initial = Definition::new(["a", "b"], vec![], Some(vec!["a".into(), "b".into()])).unwrap();
        assert!(matches!(
            Discipline::Workflow.validate(&two_initial, "foo", true),
            Err(EngineError::SinglePlaceInitialPlaces { count: 2, .. })
        ));
    }
}
