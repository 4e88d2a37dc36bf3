//! Support strategies decide which registered workflow applies to a subject.

use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

use crate::validator::Discipline;
use crate::{Definition, Workflow};

/// Type-erased view of a [`Workflow`], as stored in the
/// [`Registry`](crate::Registry).
pub trait WorkflowHandle: Send + Sync {
    fn name(&self) -> &str;
    fn definition(&self) -> &Definition;
    fn discipline(&self) -> Discipline;
    /// Name of the subject type the workflow operates on.
    fn subject_type(&self) -> &'static str;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<S: 'static, C: 'static> WorkflowHandle for Workflow<S, C> {
    fn name(&self) -> &str {
        Workflow::name(self)
    }

    fn definition(&self) -> &Definition {
        Workflow::definition(self)
    }

    fn discipline(&self) -> Discipline {
        Workflow::discipline(self)
    }

    fn subject_type(&self) -> &'static str {
        type_name::<S>()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Decides whether `workflow` handles `subject`.
pub trait SupportStrategy: Send + Sync {
    fn supports(&self, workflow: &dyn WorkflowHandle, subject: &dyn Any) -> bool;
}

/// Supports every subject of one concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceOfSupportStrategy {
    type_id: TypeId,
    type_name: &'static str,
}

impl InstanceOfSupportStrategy {
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl SupportStrategy for InstanceOfSupportStrategy {
    fn supports(&self, _workflow: &dyn WorkflowHandle, subject: &dyn Any) -> bool {
        (*subject).type_id() == self.type_id
    }
}

impl<F> SupportStrategy for F
where
    F: Fn(&dyn WorkflowHandle, &dyn Any) -> bool + Send + Sync,
{
    fn supports(&self, workflow: &dyn WorkflowHandle, subject: &dyn Any) -> bool {
        self(workflow, subject)
    }
}
