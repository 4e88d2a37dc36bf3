//! Engine-level error types.

use thiserror::Error;

/// Broad category of an [`EngineError`].
///
/// Every category is fatal to the call that produced it: they describe
/// programming or configuration mistakes, never transient conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input handed to a constructor or lookup.
    InvalidArgument,
    /// A definition breaks the structural rules of its discipline.
    InvalidDefinition,
    /// A runtime contract violation against a well-formed definition.
    Logic,
}

/// Errors produced by the workflow engine (definition, validation, execution).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Invalid arguments ------

    #[error("The transition \"{name}\" contains invalid characters.")]
    InvalidTransitionName { name: String },

    #[error("The transition \"{name}\" must have at least one {side} place.")]
    EmptyTransitionSide { name: String, side: &'static str },

    #[error("Unable to find a workflow for subject type \"{subject_type}\".")]
    NoWorkflow { subject_type: &'static str },

    #[error(
        "Too many workflows ({names}) match this subject ({subject_type}); \
         set a different name on each and pass the name when looking one up."
    )]
    TooManyWorkflows {
        names: String,
        subject_type: &'static str,
    },

    #[error("cannot read workflow configuration '{path}': {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid workflow configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    // ------ Invalid definitions ------

    #[error(
        "A transition in StateMachine can only have one input. \
         But the transition \"{transition}\" in StateMachine \"{workflow}\" has {count} inputs."
    )]
    StateMachineInputs {
        transition: String,
        workflow: String,
        count: usize,
    },

    #[error(
        "A transition in StateMachine can only have one output. \
         But the transition \"{transition}\" in StateMachine \"{workflow}\" has {count} outputs."
    )]
    StateMachineOutputs {
        transition: String,
        workflow: String,
        count: usize,
    },

    #[error(
        "A transition from a place/state must have an unique name. \
         Multiple transitions named \"{transition}\" from place/state \"{place}\" were found on StateMachine \"{workflow}\"."
    )]
    DuplicateTransitionFromPlace {
        transition: String,
        place: String,
        workflow: String,
    },

    #[error(
        "The state machine \"{workflow}\" cannot store many places. \
         But the definition has {count} initial places. Only one is supported."
    )]
    StateMachineInitialPlaces { workflow: String, count: usize },

    #[error(
        "The marking store of workflow \"{workflow}\" cannot store many places. \
         But the transition \"{transition}\" has too many output ({count}). Only one is accepted."
    )]
    SinglePlaceOutputs {
        workflow: String,
        transition: String,
        count: usize,
    },

    #[error(
        "The marking store of workflow \"{workflow}\" cannot store many places. \
         But the definition has {count} initial places. Only one is supported."
    )]
    SinglePlaceInitialPlaces { workflow: String, count: usize },

    // ------ Logic errors ------

    #[error("Place \"{place}\" referenced in transition \"{transition}\" does not exist.")]
    UndeclaredTransitionPlace { place: String, transition: String },

    #[error("Place \"{place}\" cannot be the initial place as it does not exist.")]
    UndeclaredInitialPlace { place: String },

    #[error("The value returned by the marking store is not a valid marking for workflow \"{workflow}\": {source}")]
    InvalidMarking {
        workflow: String,
        #[source]
        source: marking::StoreError,
    },

    #[error("The marking store of workflow \"{workflow}\" failed to persist the marking: {source}")]
    Store {
        workflow: String,
        #[source]
        source: marking::StoreError,
    },

    #[error("The Marking is empty and there is no initial place for workflow \"{workflow}\".")]
    NoInitialPlace { workflow: String },

    #[error("Place \"{place}\" is not valid for workflow \"{workflow}\".{hint}")]
    UnknownPlace {
        place: String,
        workflow: String,
        hint: &'static str,
    },

    #[error("Unable to apply transition \"{transition}\" for workflow \"{workflow}\".")]
    NotApplicable { transition: String, workflow: String },

    #[error("The workflow \"{workflow}\" does not operate on subjects of type \"{subject_type}\".")]
    SubjectTypeMismatch {
        workflow: String,
        subject_type: &'static str,
    },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        use EngineError::*;

        match self {
            InvalidTransitionName { .. }
            | EmptyTransitionSide { .. }
            | NoWorkflow { .. }
            | TooManyWorkflows { .. }
            | ConfigIo { .. }
            | ConfigParse(_) => ErrorKind::InvalidArgument,

            StateMachineInputs { .. }
            | StateMachineOutputs { .. }
            | DuplicateTransitionFromPlace { .. }
            | StateMachineInitialPlaces { .. }
            | SinglePlaceOutputs { .. }
            | SinglePlaceInitialPlaces { .. } => ErrorKind::InvalidDefinition,

            UndeclaredTransitionPlace { .. }
            | UndeclaredInitialPlace { .. }
            | InvalidMarking { .. }
            | Store { .. }
            | NoInitialPlace { .. }
            | UnknownPlace { .. }
            | NotApplicable { .. }
            | SubjectTypeMismatch { .. } => ErrorKind::Logic,
        }
    }
}
