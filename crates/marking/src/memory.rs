//! In-process marking store keyed by subject identity.
//!
//! Useful when the subject type cannot (or should not) carry its own marking,
//! and in tests. Markings live only as long as the store.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{Context, Marking, MarkingStore, StoreError};

type KeyFn<S> = Box<dyn Fn(&S) -> String + Send + Sync>;

/// Keeps markings in a map keyed by a caller-supplied subject key.
pub struct InMemoryMarkingStore<S, C = Context> {
    key: KeyFn<S>,
    markings: Mutex<HashMap<String, Marking<C>>>,
}

impl<S, C: Clone> InMemoryMarkingStore<S, C> {
    /// `key` must return the same string for the same logical subject.
    pub fn new(key: impl Fn(&S) -> String + Send + Sync + 'static) -> Self {
        Self {
            key: Box::new(key),
            markings: Mutex::new(HashMap::new()),
        }
    }

    /// Number of subjects with a stored marking.
    pub fn len(&self) -> Result<usize, StoreError> {
        let markings = self.markings.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(markings.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Drop the stored marking of `subject`, returning it if there was one.
    pub fn forget(&self, subject: &S) -> Result<Option<Marking<C>>, StoreError> {
        let key = (self.key)(subject);
        let mut markings = self.markings.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(markings.remove(&key))
    }
}

impl<S, C> MarkingStore<S, C> for InMemoryMarkingStore<S, C>
where
    C: Clone + Send,
{
    fn get_marking(&self, subject: &S) -> Result<Marking<C>, StoreError> {
        let key = (self.key)(subject);
        let markings = self.markings.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(markings.get(&key).cloned().unwrap_or_default())
    }

    fn set_marking(
        &self,
        subject: &mut S,
        marking: &Marking<C>,
        context: Option<&C>,
    ) -> Result<(), StoreError> {
        let key = (self.key)(subject);
        // The stored context is always the one handed in with this write.
        let mut stored = marking.clone();
        stored.clear_context();
        if let Some(context) = context {
            stored.set_context(context.clone());
        }

        let mut markings = self.markings.lock().map_err(|_| StoreError::Poisoned)?;
        tracing::trace!(subject = %key, places = ?stored.places(), "storing marking");
        markings.insert(key, stored);
        Ok(())
    }
}
