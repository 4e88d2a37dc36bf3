//! Test doubles for `MarkingStore`.
//!
//! Useful in unit and integration tests where the interesting part is how
//! often (and with what) the engine talks to its store.

use std::sync::{Arc, Mutex};

use crate::{Marking, MarkingStore, StoreError};

/// Wraps another store and records every marking written through it.
pub struct RecordingStore<St> {
    /// The store that actually holds the markings.
    pub inner: St,
    /// Number of `get_marking` calls seen so far.
    pub reads: Arc<Mutex<usize>>,
    /// Places of every marking written, in call order.
    pub writes: Arc<Mutex<Vec<Vec<String>>>>,
}

impl<St> RecordingStore<St> {
    pub fn new(inner: St) -> Self {
        Self {
            inner,
            reads: Arc::new(Mutex::new(0)),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of times the store has been read.
    pub fn read_count(&self) -> usize {
        *self.reads.lock().unwrap()
    }

    /// Number of times a marking has been persisted.
    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    /// Places of the most recent persisted marking.
    pub fn last_write(&self) -> Option<Vec<String>> {
        self.writes.lock().unwrap().last().cloned()
    }
}

impl<S, C, St> MarkingStore<S, C> for RecordingStore<St>
where
    St: MarkingStore<S, C>,
{
    fn get_marking(&self, subject: &S) -> Result<Marking<C>, StoreError> {
        *self.reads.lock().unwrap() += 1;
        self.inner.get_marking(subject)
    }

    fn set_marking(
        &self,
        subject: &mut S,
        marking: &Marking<C>,
        context: Option<&C>,
    ) -> Result<(), StoreError> {
        self.writes
            .lock()
            .unwrap()
            .push(marking.places().iter().cloned().collect());
        self.inner.set_marking(subject, marking, context)
    }
}

/// What a [`FailingStore`] does when called.
#[derive(Debug, Clone)]
pub enum FailingBehaviour {
    /// Every read fails with the given error.
    FailReads(StoreError),
    /// Reads return the given places, every write fails.
    FailWrites(Vec<String>, StoreError),
}

/// A store that fails on purpose.
#[derive(Debug, Clone)]
pub struct FailingStore {
    pub behaviour: FailingBehaviour,
}

impl FailingStore {
    /// Create a store whose reads report a malformed marking.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self {
            behaviour: FailingBehaviour::FailReads(StoreError::Malformed(msg.into())),
        }
    }

    /// Create a store that reads `places` but cannot persist anything.
    pub fn read_only<I, P>(places: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            behaviour: FailingBehaviour::FailWrites(
                places.into_iter().map(Into::into).collect(),
                StoreError::Poisoned,
            ),
        }
    }
}

impl<S, C> MarkingStore<S, C> for FailingStore {
    fn get_marking(&self, _subject: &S) -> Result<Marking<C>, StoreError> {
        match &self.behaviour {
            FailingBehaviour::FailReads(err) => Err(err.clone()),
            FailingBehaviour::FailWrites(places, _) => Ok(Marking::with_places(places.iter().cloned())),
        }
    }

    fn set_marking(
        &self,
        _subject: &mut S,
        _marking: &Marking<C>,
        _context: Option<&C>,
    ) -> Result<(), StoreError> {
        match &self.behaviour {
            FailingBehaviour::FailReads(err) | FailingBehaviour::FailWrites(_, err) => {
                Err(err.clone())
            }
        }
    }
}

