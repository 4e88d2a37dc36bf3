//! `marking` crate: the `Marking` type, the `MarkingStore` trait and the
//! built-in store implementations.
//!
//! The engine reads a subject's marking through [`MarkingStore`] and hands
//! the updated marking back after every transition. How (and where) the
//! marking is persisted is entirely up to the store.

pub mod error;
pub mod marking;
pub mod memory;
pub mod method;
pub mod mock;
pub mod traits;

pub use error::StoreError;
pub use marking::{Context, Marking};
pub use memory::InMemoryMarkingStore;
pub use method::{MarkedSubject, MethodMarkingStore, StateMode};
pub use traits::MarkingStore;
