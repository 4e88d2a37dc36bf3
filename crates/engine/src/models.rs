//! Core domain models for the workflow engine.
//!
//! A [`Definition`] is the immutable graph a workflow runs on: the declared
//! places, the ordered transitions between them, and the places a fresh
//! subject starts in. Both types are built once and then shared read-only.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::EngineError;

static TRANSITION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w-]+$").expect("transition name pattern is a valid regex")
});

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// A named edge consuming activation from `froms` and producing it in `tos`.
///
/// Several transitions may share a name; they model alternative paths for
/// the same user-facing action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    name: String,
    froms: Vec<String>,
    tos: Vec<String>,
    roles: Vec<String>,
}

impl Transition {
    /// Create a transition with no role requirement.
    ///
    /// # Errors
    /// - [`EngineError::InvalidTransitionName`] if `name` is not made of word
    ///   characters and dashes.
    /// - [`EngineError::EmptyTransitionSide`] if `froms` or `tos` is empty.
    pub fn new<F, T>(
        name: impl Into<String>,
        froms: F,
        tos: T,
    ) -> Result<Self, EngineError>
    where
        F: IntoIterator,
        F::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        let name = name.into();
        if !TRANSITION_NAME.is_match(&name) {
            return Err(EngineError::InvalidTransitionName { name });
        }

        let froms: Vec<String> = froms.into_iter().map(Into::into).collect();
        if froms.is_empty() {
            return Err(EngineError::EmptyTransitionSide { name, side: "source" });
        }
        let tos: Vec<String> = tos.into_iter().map(Into::into).collect();
        if tos.is_empty() {
            return Err(EngineError::EmptyTransitionSide { name, side: "destination" });
        }

        Ok(Self {
            name,
            froms,
            tos,
            roles: Vec::new(),
        })
    }

    /// Require at least one of `roles` to be granted before the transition
    /// can be applied.
    pub fn with_roles<I>(mut self, roles: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        for role in roles {
            let role = role.into();
            if !self.roles.contains(&role) {
                self.roles.push(role);
            }
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn froms(&self) -> &[String] {
        &self.froms
    }

    pub fn tos(&self) -> &[String] {
        &self.tos
    }

    /// Roles of which at least one must be granted; empty means unguarded.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }
}

// ---------------------------------------------------------------------------
// Definition
// ---------------------------------------------------------------------------

/// The workflow graph.
///
/// Construction checks that every place a transition or the initial marking
/// mentions is declared. Shape rules (state machine or not) are left to the
/// [validators](crate::validator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Definition {
    places: Vec<String>,
    transitions: Vec<Transition>,
    initial_places: Vec<String>,
}

impl Definition {
    /// Assemble a definition.
    ///
    /// Duplicate places are collapsed, keeping declaration order. When
    /// `initial_places` is `None` the first declared place (if any) becomes
    /// the initial place.
    ///
    /// # Errors
    /// - [`EngineError::UndeclaredTransitionPlace`] if a transition mentions
    ///   a place that is not in `places`.
    /// - [`EngineError::UndeclaredInitialPlace`] for an undeclared initial place.
    pub fn new<P>(
        places: P,
        transitions: Vec<Transition>,
        initial_places: Option<Vec<String>>,
    ) -> Result<Self, EngineError>
    where
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let mut seen = HashSet::new();
        let places: Vec<String> = places
            .into_iter()
            .map(Into::into)
            .filter(|place: &String| seen.insert(place.clone()))
            .collect();

        for transition in &transitions {
            for place in transition.froms().iter().chain(transition.tos()) {
                if !seen.contains(place) {
                    return Err(EngineError::UndeclaredTransitionPlace {
                        place: place.clone(),
                        transition: transition.name().to_owned(),
                    });
                }
            }
        }

        let initial_places = match initial_places {
            Some(initial) => {
                let mut unique = Vec::with_capacity(initial.len());
                for place in initial {
                    if !seen.contains(&place) {
                        return Err(EngineError::UndeclaredInitialPlace { place });
                    }
                    if !unique.contains(&place) {
                        unique.push(place);
                    }
                }
                unique
            }
            None => places.first().cloned().into_iter().collect(),
        };

        Ok(Self {
            places,
            transitions,
            initial_places,
        })
    }

    /// Every place valid within this graph, in declaration order.
    pub fn places(&self) -> &[String] {
        &self.places
    }

    pub fn has_place(&self, place: &str) -> bool {
        self.places.iter().any(|p| p == place)
    }

    /// Transitions in declaration order, which is also evaluation order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Places marked for a subject that has no marking yet.
    pub fn initial_places(&self) -> &[String] {
        &self.initial_places
    }
}

// ---------------------------------------------------------------------------
// DefinitionBuilder
// ---------------------------------------------------------------------------

/// Incrementally collects places and transitions into a [`Definition`].
#[derive(Debug, Clone, Default)]
pub struct DefinitionBuilder {
    places: Vec<String>,
    transitions: Vec<Transition>,
    initial_places: Option<Vec<String>>,
}

impl DefinitionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_place(&mut self, place: impl Into<String>) -> &mut Self {
        self.places.push(place.into());
        self
    }

    pub fn add_places<I>(&mut self, places: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.places.extend(places.into_iter().map(Into::into));
        self
    }

    pub fn add_transition(&mut self, transition: Transition) -> &mut Self {
        self.transitions.push(transition);
        self
    }

    pub fn add_transitions(&mut self, transitions: impl IntoIterator<Item = Transition>) -> &mut Self {
        self.transitions.extend(transitions);
        self
    }

    pub fn set_initial_places<I>(&mut self, places: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.initial_places = Some(places.into_iter().map(Into::into).collect());
        self
    }

    /// Forget everything collected so far.
    pub fn clear(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    /// # Errors
    /// Same as [`Definition::new`].
    pub fn build(&self) -> Result<Definition, EngineError> {
        let definition = Definition::new(
            self.places.iter().cloned(),
            self.transitions.clone(),
            self.initial_places.clone(),
        )?;
        tracing::debug!(
            places = definition.places().len(),
            transitions = definition.transitions().len(),
            "definition built"
        );
        Ok(definition)
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn transition_name_must_be_word_characters() {
        assert!(Transition::new("to_review-2", ["a"], ["b"]).is_ok());

        let err = Transition::new("to review", ["a"], ["b"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            err.to_string(),
            "The transition \"to review\" contains invalid characters."
        );
        assert!(Transition::new("", ["a"], ["b"]).is_err());
    }

    #[test]
    fn transition_needs_both_sides() {
        let none: [&str; 0] = [];
        assert!(matches!(
            Transition::new("t1", none, ["b"]),
            Err(EngineError::EmptyTransitionSide { side: "source", .. })
        ));
        assert!(matches!(
            Transition::new("t1", ["a"], none),
            Err(EngineError::EmptyTransitionSide { side: "destination", .. })
        ));
    }

    #[test]
    fn roles_are_deduplicated_in_order() {
        let t = Transition::new("publish", ["review"], ["published"])
            .unwrap()
            .with_roles(["ROLE_EDITOR", "ROLE_ADMIN", "ROLE_EDITOR"]);
        assert_eq!(t.roles(), ["ROLE_EDITOR", "ROLE_ADMIN"]);
    }

    #[test]
    fn first_place_is_initial_by_default() {
        let def = Definition::new(["a", "b", "a"], vec![], None).unwrap();
        assert_eq!(def.places(), ["a", "b"]);
        assert_eq!(def.initial_places(), ["a"]);

        let empty = Definition::new(Vec::<String>::new(), vec![], None).unwrap();
        assert!(empty.initial_places().is_empty());
    }

    #[test]
    fn transition_places_must_be_declared() {
        let t = Transition::new("t1", ["a"], ["ghost"]).unwrap();
        let err = Definition::new(["a"], vec![t], None).unwrap_err();
        assert!(matches!(
            &err,
            EngineError::UndeclaredTransitionPlace { place, transition } if place == "ghost" && transition == "t1"
        ));
        assert_eq!(err.kind(), ErrorKind::Logic);
    }

    #[test]
    fn initial_places_must_be_declared() {
        let err = Definition::new(["a"], vec![], Some(vec!["z".into()])).unwrap_err();
        assert!(matches!(err, EngineError::UndeclaredInitialPlace { place } if place == "z"));
    }

    #[test]
    fn builder_collects_and_clears() {
        let mut builder = DefinitionBuilder::new();
        builder
            .add_places(["draft", "review"])
            .add_place("published")
            .add_transition(Transition::new("submit", ["draft"], ["review"]).unwrap())
            .add_transitions([Transition::new("publish", ["review"], ["published"]).unwrap()])
            .set_initial_places(["draft"]);

        let def = builder.build().unwrap();
        assert_eq!(def.places(), ["draft", "review", "published"]);
        assert_eq!(def.transitions().len(), 2);
        assert_eq!(def.transitions()[1].name(), "publish");
        assert_eq!(def.initial_places(), ["draft"]);

        let def = builder.clear().build().unwrap();
        assert!(def.places().is_empty());
        assert!(def.transitions().is_empty());
    }
}
