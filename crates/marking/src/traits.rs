//! The `MarkingStore` trait, the bridge between a workflow and its subject.

use crate::{Context, Marking, StoreError};

/// Reads and writes the marking of a subject.
///
/// Defined here (in the marking crate) so both the engine and individual
/// store implementations can import it without a circular dependency.
///
/// Implementations must round-trip: a marking written by [`set_marking`]
/// and then read by [`get_marking`] yields the same set of places.
///
/// Stores do no locking of their own across a read-then-write cycle. If
/// several callers may apply transitions to the same subject concurrently,
/// access to that subject must be serialized outside the workflow.
///
/// [`set_marking`]: MarkingStore::set_marking
/// [`get_marking`]: MarkingStore::get_marking
pub trait MarkingStore<S, C = Context>: Send + Sync {
    /// Read the subject's current marking. An unmarked subject yields an
    /// empty marking, not an error.
    fn get_marking(&self, subject: &S) -> Result<Marking<C>, StoreError>;

    /// Persist `marking` for the subject, along with the context of the
    /// transition that produced it.
    fn set_marking(
        &self,
        subject: &mut S,
        marking: &Marking<C>,
        context: Option<&C>,
    ) -> Result<(), StoreError>;
}
