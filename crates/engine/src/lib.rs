//! `engine` crate: workflow definitions, structural validation and the
//! transition-firing engine.

pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod registry;
pub mod support;
pub mod validator;
pub mod workflow;

pub use audit::AuditTrailListener;
pub use auth::{AuthorizationChecker, StaticAuthorizationChecker};
pub use config::WorkflowConfig;
pub use error::{EngineError, ErrorKind};
pub use events::{Event, EventDispatcher, Listener, Stage, Topic};
pub use models::{Definition, DefinitionBuilder, Transition};
pub use registry::Registry;
pub use support::{InstanceOfSupportStrategy, SupportStrategy, WorkflowHandle};
pub use validator::{DefinitionValidator, Discipline, StateMachineValidator, WorkflowValidator};
pub use workflow::Workflow;
