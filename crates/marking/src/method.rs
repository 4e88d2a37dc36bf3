//! Marking store that persists onto the subject itself.
//!
//! The subject exposes its raw marking as a JSON value through
//! [`MarkedSubject`]. In single-state mode the value is the name of the one
//! active place; in multiple-state mode it is an object mapping each active
//! place to `1`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Context, Marking, MarkingStore, StoreError};

/// Accessors a subject provides so its marking can live on the subject.
pub trait MarkedSubject<C = Context> {
    /// The raw persisted marking, or `None` if the subject was never marked.
    fn marking_value(&self) -> Option<&Value>;

    /// Replace the raw persisted marking.
    fn set_marking_value(&mut self, value: Value, context: Option<&C>);
}

/// How many places the store can persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateMode {
    /// Exactly zero or one place, stored as a string.
    SingleState,
    /// Any number of places, stored as `{ "place": 1, ... }`.
    #[default]
    MultipleState,
}

/// [`MarkingStore`] backed by the subject's own [`MarkedSubject`] accessors.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodMarkingStore {
    mode: StateMode,
}

impl MethodMarkingStore {
    pub fn new(mode: StateMode) -> Self {
        Self { mode }
    }

    pub fn single_state() -> Self {
        Self::new(StateMode::SingleState)
    }

    pub fn multiple_state() -> Self {
        Self::new(StateMode::MultipleState)
    }

    pub fn mode(&self) -> StateMode {
        self.mode
    }

    fn decode<C>(&self, value: Option<&Value>) -> Result<Marking<C>, StoreError> {
        let value = match value {
            None | Some(Value::Null) => return Ok(Marking::new()),
            Some(value) => value,
        };

        match (self.mode, value) {
            (StateMode::SingleState, Value::String(place)) if place.is_empty() => Ok(Marking::new()),
            (StateMode::SingleState, Value::String(place)) => Ok(Marking::with_places([place.as_str()])),
            (StateMode::SingleState, other) => Err(StoreError::Malformed(format!(
                "expected a place name, found {}",
                json_kind(other)
            ))),

            (StateMode::MultipleState, Value::Object(places)) => {
                let mut marking = Marking::new();
                for (place, tokens) in places {
                    if !is_single_token(tokens) {
                        return Err(StoreError::Malformed(format!(
                            "place \"{place}\" holds {tokens}, expected 1"
                        )));
                    }
                    marking.mark(place.as_str());
                }
                Ok(marking)
            }
            (StateMode::MultipleState, Value::Array(places)) => {
                let mut marking = Marking::new();
                for place in places {
                    match place {
                        Value::String(place) => marking.mark(place.as_str()),
                        other => {
                            return Err(StoreError::Malformed(format!(
                                "expected a place name, found {}",
                                json_kind(other)
                            )))
                        }
                    }
                }
                Ok(marking)
            }
            (StateMode::MultipleState, other) => Err(StoreError::Malformed(format!(
                "expected an object of places, found {}",
                json_kind(other)
            ))),
        }
    }

    fn encode<C>(&self, marking: &Marking<C>) -> Result<Value, StoreError> {
        match self.mode {
            StateMode::SingleState => {
                let mut places = marking.places().iter();
                match (places.next(), places.next()) {
                    (None, _) => Ok(Value::Null),
                    (Some(place), None) => Ok(Value::String(place.clone())),
                    (Some(_), Some(_)) => Err(StoreError::TooManyPlaces {
                        count: marking.places().len(),
                    }),
                }
            }
            StateMode::MultipleState => Ok(Value::Object(
                marking
                    .places()
                    .iter()
                    .map(|place| (place.clone(), Value::from(1)))
                    .collect::<Map<_, _>>(),
            )),
        }
    }
}

impl<S, C> MarkingStore<S, C> for MethodMarkingStore
where
    S: MarkedSubject<C>,
{
    fn get_marking(&self, subject: &S) -> Result<Marking<C>, StoreError> {
        self.decode(subject.marking_value())
    }

    fn set_marking(
        &self,
        subject: &mut S,
        marking: &Marking<C>,
        context: Option<&C>,
    ) -> Result<(), StoreError> {
        let value = self.encode(marking)?;
        tracing::trace!(mode = ?self.mode, %value, "persisting marking onto subject");
        subject.set_marking_value(value, context);
        Ok(())
    }
}

fn is_single_token(tokens: &Value) -> bool {
    matches!(tokens, Value::Bool(true)) || tokens.as_u64() == Some(1)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
