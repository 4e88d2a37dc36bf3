//! `Marking`: the set of places a subject currently occupies.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Default opaque payload carried alongside a marking.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Active places of a subject plus the context of its last transition.
///
/// Activation is boolean: a place is either marked or not. The marking does
/// not know which places are valid; the workflow checks that lazily.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marking<C = Context> {
    places: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<C>,
}

impl<C> Marking<C> {
    /// An empty marking with no context.
    pub fn new() -> Self {
        Self {
            places: BTreeSet::new(),
            context: None,
        }
    }

    /// Build a marking with the given places already marked.
    pub fn with_places<I, P>(places: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            places: places.into_iter().map(Into::into).collect(),
            context: None,
        }
    }

    pub fn mark(&mut self, place: impl Into<String>) {
        self.places.insert(place.into());
    }

    pub fn unmark(&mut self, place: &str) {
        self.places.remove(place);
    }

    pub fn has(&self, place: &str) -> bool {
        self.places.contains(place)
    }

    /// Read-only view of the active places, in name order.
    pub fn places(&self) -> &BTreeSet<String> {
        &self.places
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn set_context(&mut self, context: C) {
        self.context = Some(context);
    }

    /// Drop the recorded context, returning it.
    pub fn clear_context(&mut self) -> Option<C> {
        self.context.take()
    }

    /// Context recorded after the subject last transitioned, if any.
    pub fn context(&self) -> Option<&C> {
        self.context.as_ref()
    }
}

impl<C> Default for Marking<C> {
    fn default() -> Self {
        Self::new()
    }
}
