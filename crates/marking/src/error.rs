//! Store-level error type.

use thiserror::Error;

/// Errors returned by a [`MarkingStore`](crate::MarkingStore).
///
/// The engine treats every variant as fatal for the current call: a store
/// that cannot produce a well-formed marking is a collaborator bug, not a
/// transient condition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The persisted value could not be read back as a marking.
    #[error("malformed marking: {0}")]
    Malformed(String),

    /// A single-state store was asked to persist several places.
    #[error("a single-state store cannot persist {count} places")]
    TooManyPlaces { count: usize },

    /// The store's internal lock was poisoned by a panicking writer.
    #[error("marking store lock poisoned")]
    Poisoned,
}
