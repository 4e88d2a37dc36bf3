//! Workflow configuration.
//!
//! A workflow is described in JSON and turned into a validated
//! [`Definition`]:
//!
//! ```json
//! {
//!   "name": "article",
//!   "type": "workflow",
//!   "places": ["draft", "review", "published"],
//!   "initial_marking": "draft",
//!   "transitions": [
//!     { "name": "submit", "from": "draft", "to": "review" },
//!     { "name": "publish", "from": "review", "to": "published", "roles": ["ROLE_EDITOR"] }
//!   ]
//! }
//! ```
//!
//! `from`, `to` and `initial_marking` accept a single place or a list.

use std::path::Path;

use marking::{MethodMarkingStore, StateMode};
use serde::{Deserialize, Serialize};

use crate::validator::Discipline;
use crate::{Definition, EngineError, Transition};

/// One place or several, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaceList {
    One(String),
    Many(Vec<String>),
}

impl PlaceList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            PlaceList::One(place) => vec![place],
            PlaceList::Many(places) => places,
        }
    }
}

/// A transition as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionConfig {
    pub name: String,
    pub from: PlaceList,
    pub to: PlaceList,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// A complete workflow description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Discipline,
    #[serde(default)]
    pub places: Vec<String>,
    #[serde(default)]
    pub initial_marking: Option<PlaceList>,
    #[serde(default)]
    pub transitions: Vec<TransitionConfig>,
    /// Defaults to single-state for state machines, multiple-state otherwise.
    #[serde(default)]
    pub marking_store: Option<StateMode>,
    /// Log every leave/transition/enter event.
    #[serde(default)]
    pub audit_trail: bool,
}

impl WorkflowConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn state_mode(&self) -> StateMode {
        self.marking_store.unwrap_or(match self.kind {
            Discipline::StateMachine => StateMode::SingleState,
            Discipline::Workflow => StateMode::MultipleState,
        })
    }

    /// Store matching [`WorkflowConfig::state_mode`].
    pub fn method_store(&self) -> MethodMarkingStore {
        MethodMarkingStore::new(self.state_mode())
    }

    /// Build the definition and validate it under the configured discipline.
    ///
    /// # Errors
    /// Transition construction, definition reference checks and validator
    /// failures, in that order.
    pub fn build_definition(&self) -> Result<Definition, EngineError> {
        let transitions = self
            .transitions
            .iter()
            .map(|t| {
                Transition::new(
                    t.name.as_str(),
                    t.from.clone().into_vec(),
                    t.to.clone().into_vec(),
                )
                .map(|transition| transition.with_roles(t.roles.iter().cloned()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let definition = Definition::new(
            self.places.iter().cloned(),
            transitions,
            self.initial_marking.clone().map(PlaceList::into_vec),
        )?;

        let single_place = self.state_mode() == StateMode::SingleState;
        self.kind.validate(&definition, &self.name, single_place)?;

        tracing::info!(
            workflow = %self.name,
            kind = ?self.kind,
            places = definition.places().len(),
            transitions = definition.transitions().len(),
            "workflow definition loaded"
        );
        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const ARTICLE: &str = r#"{
        "name": "article",
        "places": ["draft", "wait_for_journalist", "wait_for_spellchecker", "approved", "published"],
        "transitions": [
            { "name": "request_review", "from": "draft", "to": ["wait_for_journalist", "wait_for_spellchecker"] },
            { "name": "journalist_approval", "from": "wait_for_journalist", "to": "approved" },
            { "name": "publish", "from": ["approved"], "to": "published", "roles": ["ROLE_EDITOR"] }
        ]
    }"#;

    #[test]
    fn single_and_many_places_are_normalized() {
        let config = WorkflowConfig::from_json_str(ARTICLE).unwrap();
        assert_eq!(config.kind, Discipline::Workflow);
        assert_eq!(config.state_mode(), StateMode::MultipleState);
        assert!(!config.audit_trail);

        let def = config.build_definition().unwrap();
        assert_eq!(def.initial_places(), ["draft"]);
        assert_eq!(def.transitions()[0].tos(), ["wait_for_journalist", "wait_for_spellchecker"]);
        assert_eq!(def.transitions()[2].froms(), ["approved"]);
        assert_eq!(def.transitions()[2].roles(), ["ROLE_EDITOR"]);
    }

    #[test]
    fn state_machine_config_is_validated_strictly() {
        let mut config = WorkflowConfig::from_json_str(ARTICLE).unwrap();
        config.kind = Discipline::StateMachine;
        assert_eq!(config.state_mode(), StateMode::SingleState);

        let err = config.build_definition().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDefinition);
        assert!(matches!(err, EngineError::StateMachineOutputs { ref transition, .. } if transition == "request_review"));
    }

    #[test]
    fn explicit_single_state_store_limits_a_workflow() {
        let mut config = WorkflowConfig::from_json_str(ARTICLE).unwrap();
        config.marking_store = Some(StateMode::SingleState);
        assert!(matches!(
            config.build_definition(),
            Err(EngineError::SinglePlaceOutputs { .. })
        ));
    }

    #[test]
    fn parse_and_name_errors_are_invalid_arguments() {
        let err = WorkflowConfig::from_json_str("{ \"places\": [] }").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let config = WorkflowConfig::from_json_str(
            r#"{ "name": "x", "type": "state_machine", "places": ["a", "b"],
                 "initial_marking": ["a"],
                 "transitions": [{ "name": "bad name", "from": "a", "to": "b" }] }"#,
        )
        .unwrap();
        assert!(matches!(
            config.build_definition(),
            Err(EngineError::InvalidTransitionName { .. })
        ));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = WorkflowConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
