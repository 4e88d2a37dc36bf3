//! Lifecycle notifications.
//!
//! While applying a transition the workflow walks through a fixed sequence
//! of [`Stage`]s. At each stage it publishes one [`Event`] to three tiers of
//! [`Topic`]: global, per workflow, and per workflow plus a detail (the
//! transition name, or a place name for `Leave`/`Enter`/`Entered`).
//! Listeners register on exactly the tier they care about.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use marking::{Context, Marking};

use crate::Transition;

/// Points in the life of a transition, in firing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Before a transition counts as enabled; listeners may block it.
    Guard,
    /// Source places are about to be unmarked.
    Leave,
    /// Between leaving and entering.
    Transition,
    /// Destination places are about to be marked.
    Enter,
    /// The new marking has been persisted.
    Entered,
    /// Transitions enabled by the new marking.
    Announce,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Guard => "guard",
            Stage::Leave => "leave",
            Stage::Transition => "transition",
            Stage::Enter => "enter",
            Stage::Entered => "entered",
            Stage::Announce => "announce",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a listener is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Every workflow.
    Global(Stage),
    /// One workflow.
    Workflow { workflow: String, stage: Stage },
    /// One workflow and one transition or place.
    Detail {
        workflow: String,
        stage: Stage,
        detail: String,
    },
}

impl Topic {
    pub fn global(stage: Stage) -> Self {
        Topic::Global(stage)
    }

    pub fn workflow(workflow: impl Into<String>, stage: Stage) -> Self {
        Topic::Workflow {
            workflow: workflow.into(),
            stage,
        }
    }

    pub fn detail(workflow: impl Into<String>, stage: Stage, detail: impl Into<String>) -> Self {
        Topic::Detail {
            workflow: workflow.into(),
            stage,
            detail: detail.into(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Topic::Global(stage) => *stage,
            Topic::Workflow { stage, .. } | Topic::Detail { stage, .. } => *stage,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Global(stage) => write!(f, "workflow.{stage}"),
            Topic::Workflow { workflow, stage } => write!(f, "workflow.{workflow}.{stage}"),
            Topic::Detail {
                workflow,
                stage,
                detail,
            } => write!(f, "workflow.{workflow}.{stage}.{detail}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Payload handed to listeners.
pub struct Event<'a, S, C = Context> {
    stage: Stage,
    subject: &'a S,
    marking: &'a Marking<C>,
    transition: &'a Transition,
    workflow_name: &'a str,
    blocked: bool,
}

impl<'a, S, C> Event<'a, S, C> {
    pub fn new(
        stage: Stage,
        subject: &'a S,
        marking: &'a Marking<C>,
        transition: &'a Transition,
        workflow_name: &'a str,
    ) -> Self {
        Self {
            stage,
            subject,
            marking,
            transition,
            workflow_name,
            blocked: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn subject(&self) -> &'a S {
        self.subject
    }

    /// The marking as it stands at this stage.
    pub fn marking(&self) -> &'a Marking<C> {
        self.marking
    }

    /// The transition being evaluated or applied. For `Announce` this is the
    /// transition that was just applied.
    pub fn transition(&self) -> &'a Transition {
        self.transition
    }

    pub fn workflow_name(&self) -> &'a str {
        self.workflow_name
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Veto the transition. Only honoured for [`Stage::Guard`] events.
    pub fn set_blocked(&mut self, blocked: bool) {
        self.blocked = blocked;
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// Observer of workflow events.
pub trait Listener<S, C = Context>: Send + Sync {
    fn handle(&self, event: &mut Event<'_, S, C>);
}

struct FnListener<F>(F);

impl<S, C, F> Listener<S, C> for FnListener<F>
where
    F: Fn(&mut Event<'_, S, C>) + Send + Sync,
{
    fn handle(&self, event: &mut Event<'_, S, C>) {
        (self.0)(event)
    }
}

/// Registration table of listeners keyed by topic.
pub struct EventDispatcher<S, C = Context> {
    listeners: HashMap<Topic, Vec<Arc<dyn Listener<S, C>>>>,
}

impl<S, C> EventDispatcher<S, C> {
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
        }
    }

    /// Register a closure on `topic`.
    pub fn listen<F>(&mut self, topic: Topic, listener: F) -> &mut Self
    where
        F: Fn(&mut Event<'_, S, C>) + Send + Sync + 'static,
        S: 'static,
        C: 'static,
    {
        self.add_listener(topic, Arc::new(FnListener(listener)))
    }

    /// Register a shared listener on `topic`. Listeners on the same topic run
    /// in registration order.
    pub fn add_listener(&mut self, topic: Topic, listener: Arc<dyn Listener<S, C>>) -> &mut Self {
        self.listeners.entry(topic).or_default().push(listener);
        self
    }

    pub fn has_listeners(&self, topic: &Topic) -> bool {
        self.listeners.get(topic).is_some_and(|l| !l.is_empty())
    }

    /// Hand `event` to every listener registered on `topic`.
    pub fn dispatch(&self, topic: &Topic, event: &mut Event<'_, S, C>) {
        let Some(listeners) = self.listeners.get(topic) else {
            return;
        };
        tracing::trace!(%topic, listeners = listeners.len(), "dispatching workflow event");
        for listener in listeners {
            listener.handle(event);
        }
    }
}

impl<S, C> Default for EventDispatcher<S, C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Doc;

    #[test]
    fn topics_render_as_dotted_names() {
        assert_eq!(Topic::global(Stage::Guard).to_string(), "workflow.guard");
        assert_eq!(
            Topic::workflow("article", Stage::Entered).to_string(),
            "workflow.article.entered"
        );
        assert_eq!(
            Topic::detail("article", Stage::Leave, "draft").to_string(),
            "workflow.article.leave.draft"
        );
        assert_eq!(Topic::detail("a", Stage::Announce, "t").stage(), Stage::Announce);
    }

    #[test]
    fn dispatch_reaches_only_the_matching_topic() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher: EventDispatcher<Doc> = EventDispatcher::new();

        for topic in [
            Topic::global(Stage::Leave),
            Topic::workflow("article", Stage::Leave),
            Topic::workflow("other", Stage::Leave),
        ] {
            let seen = Arc::clone(&seen);
            let label = topic.to_string();
            dispatcher.listen(topic, move |_event| seen.lock().unwrap().push(label.clone()));
        }

        let transition = Transition::new("submit", ["draft"], ["review"]).unwrap();
        let marking = Marking::with_places(["draft"]);
        let mut event = Event::new(Stage::Leave, &Doc, &marking, &transition, "article");

        dispatcher.dispatch(&Topic::workflow("article", Stage::Leave), &mut event);
        dispatcher.dispatch(&Topic::global(Stage::Leave), &mut event);
        dispatcher.dispatch(&Topic::global(Stage::Enter), &mut event);

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["workflow.article.leave", "workflow.leave"]
        );
    }

    #[test]
    fn listeners_can_block() {
        let mut dispatcher: EventDispatcher<Doc> = EventDispatcher::new();
        dispatcher.listen(Topic::detail("article", Stage::Guard, "publish"), |event| {
            event.set_blocked(true)
        });
        assert!(dispatcher.has_listeners(&Topic::detail("article", Stage::Guard, "publish")));
        assert!(!dispatcher.has_listeners(&Topic::global(Stage::Guard)));

        let transition = Transition::new("publish", ["review"], ["published"]).unwrap();
        let marking = Marking::with_places(["review"]);
        let mut event = Event::new(Stage::Guard, &Doc, &marking, &transition, "article");
        assert!(!event.is_blocked());

        dispatcher.dispatch(&Topic::detail("article", Stage::Guard, "publish"), &mut event);
        assert!(event.is_blocked());
    }
}
