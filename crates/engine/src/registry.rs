//! Registry: picks the workflow that handles a given subject.
//!
//! Workflows are registered together with a [`SupportStrategy`]. Build the
//! registry once at start-up and share it; it is read-only afterwards.

use std::any::{type_name, Any};
use std::sync::Arc;

use tracing::info;

use crate::support::{InstanceOfSupportStrategy, SupportStrategy, WorkflowHandle};
use crate::{EngineError, Workflow};

type Entry = (Arc<dyn WorkflowHandle>, Arc<dyn SupportStrategy>);

/// Registered `(workflow, strategy)` pairs, in registration order.
#[derive(Default)]
pub struct Registry {
    workflows: Vec<Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_workflow<S: 'static, C: 'static>(
        &mut self,
        workflow: Arc<Workflow<S, C>>,
        strategy: Arc<dyn SupportStrategy>,
    ) {
        info!(
            workflow = workflow.name(),
            subject = type_name::<S>(),
            "workflow registered"
        );
        let workflow: Arc<dyn WorkflowHandle> = workflow;
        self.workflows.push((workflow, strategy));
    }

    /// Register `workflow` for every subject of type `S`.
    pub fn register<S: 'static, C: 'static>(&mut self, workflow: Arc<Workflow<S, C>>) {
        self.add_workflow(workflow, Arc::new(InstanceOfSupportStrategy::of::<S>()));
    }

    /// Whether some workflow (named `name`, if given) supports `subject`.
    pub fn has<S: 'static>(&self, subject: &S, name: Option<&str>) -> bool {
        let subject: &dyn Any = subject;
        self.workflows
            .iter()
            .any(|(workflow, strategy)| Self::matches(&**workflow, &**strategy, subject, name))
    }

    /// The one workflow (named `name`, if given) supporting `subject`.
    ///
    /// # Errors
    /// - [`EngineError::NoWorkflow`] if nothing matches.
    /// - [`EngineError::TooManyWorkflows`] if several match; give each a
    ///   distinct name and pass it.
    /// - [`EngineError::SubjectTypeMismatch`] if the match was built for a
    ///   different subject type.
    pub fn get<S: 'static, C: 'static>(
        &self,
        subject: &S,
        name: Option<&str>,
    ) -> Result<Arc<Workflow<S, C>>, EngineError> {
        let subject_type = type_name::<S>();
        let subject: &dyn Any = subject;

        let matched: Vec<&Arc<dyn WorkflowHandle>> = self
            .workflows
            .iter()
            .filter(|(workflow, strategy)| Self::matches(&**workflow, &**strategy, subject, name))
            .map(|(workflow, _)| workflow)
            .collect();

        match matched.as_slice() {
            [] => Err(EngineError::NoWorkflow { subject_type }),
            [workflow] => {
                let workflow_name = workflow.name().to_owned();
                Arc::clone(workflow)
                    .into_any()
                    .downcast::<Workflow<S, C>>()
                    .map_err(|_| EngineError::SubjectTypeMismatch {
                        workflow: workflow_name,
                        subject_type,
                    })
            }
            many => Err(EngineError::TooManyWorkflows {
                names: many
                    .iter()
                    .map(|workflow| workflow.name())
                    .collect::<Vec<_>>()
                    .join(", "),
                subject_type,
            }),
        }
    }

    /// Every workflow supporting `subject`, ignoring names.
    pub fn all<S: 'static>(&self, subject: &S) -> Vec<Arc<dyn WorkflowHandle>> {
        let subject: &dyn Any = subject;
        self.workflows
            .iter()
            .filter(|(workflow, strategy)| strategy.supports(&**workflow, subject))
            .map(|(workflow, _)| Arc::clone(workflow))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }

    fn matches(
        workflow: &dyn WorkflowHandle,
        strategy: &dyn SupportStrategy,
        subject: &dyn Any,
        name: Option<&str>,
    ) -> bool {
        if name.is_some_and(|name| name != workflow.name()) {
            return false;
        }
        strategy.supports(workflow, subject)
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Definition, ErrorKind, Transition};
    use marking::{InMemoryMarkingStore, MarkingStore};

    struct Invoice {
        id: u32,
    }

    struct Shipment {
        kind: &'static str,
    }

    fn definition() -> Definition {
        Definition::new(
            ["draft", "sent"],
            vec![Transition::new("send", ["draft"], ["sent"]).unwrap()],
            None,
        )
        .unwrap()
    }

    fn workflow<S: 'static>(name: &str, key: fn(&S) -> String) -> Arc<Workflow<S>> {
        let store: Arc<dyn MarkingStore<S>> = Arc::new(InMemoryMarkingStore::new(key));
        Arc::new(Workflow::new(name, definition(), store))
    }

    fn invoice_workflow(name: &str) -> Arc<Workflow<Invoice>> {
        workflow(name, |invoice: &Invoice| invoice.id.to_string())
    }

    #[test]
    fn unique_match_is_returned_typed() {
        let mut registry = Registry::new();
        registry.register(invoice_workflow("billing"));

        let mut invoice = Invoice { id: 1 };
        let billing: Arc<Workflow<Invoice>> = registry.get(&invoice, None).unwrap();
        assert_eq!(billing.name(), "billing");
        assert!(billing.can(&mut invoice, "send").unwrap());
        assert!(registry.has(&invoice, None));
        assert!(registry.has(&invoice, Some("billing")));
        assert!(!registry.has(&invoice, Some("other")));
    }

    #[test]
    fn unsupported_subject_is_an_invalid_argument() {
        let mut registry = Registry::new();
        registry.register(invoice_workflow("billing"));

        let shipment = Shipment { kind: "parcel" };
        let err = registry.get::<Shipment, marking::Context>(&shipment, None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("Shipment"));
        assert!(!registry.has(&shipment, None));
        assert!(registry.all(&shipment).is_empty());
    }

    #[test]
    fn ambiguity_lists_every_match_and_names_disambiguate() {
        let mut registry = Registry::new();
        registry.register(invoice_workflow("billing"));
        registry.register(invoice_workflow("dunning"));

        let invoice = Invoice { id: 2 };
        let err = registry.get::<Invoice, marking::Context>(&invoice, None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(matches!(
            &err,
            EngineError::TooManyWorkflows { names, .. } if names == "billing, dunning"
        ));

        let dunning: Arc<Workflow<Invoice>> = registry.get(&invoice, Some("dunning")).unwrap();
        assert_eq!(dunning.name(), "dunning");
        let billing: Arc<Workflow<Invoice>> = registry.get(&invoice, Some("billing")).unwrap();
        assert_eq!(billing.name(), "billing");

        let all: Vec<_> = registry.all(&invoice).iter().map(|w| w.name().to_owned()).collect();
        assert_eq!(all, ["billing", "dunning"]);
    }

    #[test]
    fn closure_strategies_can_inspect_the_subject() {
        let mut registry = Registry::new();
        let parcels: Arc<Workflow<Shipment>> = workflow("parcels", |s: &Shipment| s.kind.to_owned());
        let freight: Arc<Workflow<Shipment>> = workflow("freight", |s: &Shipment| s.kind.to_owned());

        registry.add_workflow(
            parcels,
            Arc::new(|_: &dyn WorkflowHandle, subject: &dyn Any| {
                subject.downcast_ref::<Shipment>().is_some_and(|s| s.kind == "parcel")
            }),
        );
        registry.add_workflow(
            freight,
            Arc::new(|_: &dyn WorkflowHandle, subject: &dyn Any| {
                subject.downcast_ref::<Shipment>().is_some_and(|s| s.kind == "freight")
            }),
        );

        let parcel = Shipment { kind: "parcel" };
        let chosen: Arc<Workflow<Shipment>> = registry.get(&parcel, None).unwrap();
        assert_eq!(chosen.name(), "parcels");
        assert_eq!(registry.all(&parcel).len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn strategy_matching_the_wrong_subject_type_is_a_logic_error() {
        let mut registry = Registry::new();
        registry.add_workflow(
            invoice_workflow("billing"),
            Arc::new(|_: &dyn WorkflowHandle, _: &dyn Any| true),
        );

        let shipment = Shipment { kind: "parcel" };
        let err = registry.get::<Shipment, marking::Context>(&shipment, None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Logic);
        assert!(matches!(err, EngineError::SubjectTypeMismatch { workflow, .. } if workflow == "billing"));
    }
}
