//! Audit trail: logs every leave, transition and enter event.

use std::any::type_name;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::info;

use crate::events::{Event, EventDispatcher, Listener, Stage, Topic};

/// Listener that writes an `info` line for each place left or entered and
/// each transition taken.
pub struct AuditTrailListener<S, C> {
    _subject: PhantomData<fn(&S, &C)>,
}

impl<S, C> AuditTrailListener<S, C>
where
    S: 'static,
    C: 'static,
{
    pub fn new() -> Self {
        Self {
            _subject: PhantomData,
        }
    }

    /// Subscribe a new audit trail to the global leave, transition and
    /// enter topics of `dispatcher`.
    pub fn register(dispatcher: &mut EventDispatcher<S, C>) {
        let listener: Arc<dyn Listener<S, C>> = Arc::new(Self::new());
        for stage in [Stage::Leave, Stage::Transition, Stage::Enter] {
            dispatcher.add_listener(Topic::global(stage), Arc::clone(&listener));
        }
    }
}

impl<S, C> Default for AuditTrailListener<S, C>
where
    S: 'static,
    C: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C> Listener<S, C> for AuditTrailListener<S, C> {
    fn handle(&self, event: &mut Event<'_, S, C>) {
        let subject = type_name::<S>();
        let workflow = event.workflow_name();
        let transition = event.transition();

        match event.stage() {
            Stage::Leave => {
                for place in transition.froms() {
                    info!("Leaving \"{place}\" for subject of type \"{subject}\" in workflow \"{workflow}\".");
                }
            }
            Stage::Transition => {
                info!(
                    "Transition \"{}\" for subject of type \"{subject}\" in workflow \"{workflow}\".",
                    transition.name()
                );
            }
            Stage::Enter => {
                for place in transition.tos() {
                    info!("Entering \"{place}\" for subject of type \"{subject}\" in workflow \"{workflow}\".");
                }
            }
            Stage::Guard | Stage::Entered | Stage::Announce => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ticket;

    #[test]
    fn registers_on_three_global_topics() {
        let mut dispatcher: EventDispatcher<Ticket> = EventDispatcher::new();
        AuditTrailListener::register(&mut dispatcher);

        assert!(dispatcher.has_listeners(&Topic::global(Stage::Leave)));
        assert!(dispatcher.has_listeners(&Topic::global(Stage::Transition)));
        assert!(dispatcher.has_listeners(&Topic::global(Stage::Enter)));
        assert!(!dispatcher.has_listeners(&Topic::global(Stage::Guard)));
        assert!(!dispatcher.has_listeners(&Topic::global(Stage::Entered)));
    }
}
