//! `markflow` CLI entry-point.
//!
//! Available sub-commands:
//! - `validate`: check a workflow configuration file.
//! - `enabled`: list the transitions enabled for a marking.
//! - `apply`: fire a transition and print the resulting marking.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine::{
    AuditTrailListener, Discipline, EventDispatcher, StaticAuthorizationChecker, Workflow,
    WorkflowConfig,
};
use marking::{Context, MarkedSubject, Marking, MarkingStore};

#[derive(Parser)]
#[command(name = "markflow", about = "Petri-net workflow engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a workflow configuration file.
    Validate {
        /// Path to the workflow JSON file.
        path: PathBuf,
    },
    /// Print the transitions enabled for a marking.
    Enabled {
        #[command(flatten)]
        subject: SubjectArgs,
    },
    /// Apply a transition and print the resulting marking as JSON.
    Apply {
        #[command(flatten)]
        subject: SubjectArgs,
        /// Name of the transition to fire.
        transition: String,
        /// JSON object handed to the marking store along with the marking.
        #[arg(long)]
        context: Option<String>,
    },
}

#[derive(Args)]
struct SubjectArgs {
    /// Path to the workflow JSON file.
    path: PathBuf,
    /// Places currently marked, comma separated. Empty means a fresh subject.
    #[arg(long, value_delimiter = ',')]
    marking: Vec<String>,
    /// Role granted to the caller. May be repeated.
    #[arg(long = "role")]
    roles: Vec<String>,
}

/// A subject that exists only for the duration of one command.
#[derive(Debug, Default)]
struct CliSubject {
    state: Option<Value>,
    context: Option<Context>,
}

impl MarkedSubject for CliSubject {
    fn marking_value(&self) -> Option<&Value> {
        self.state.as_ref()
    }

    fn set_marking_value(&mut self, value: Value, context: Option<&Context>) {
        self.state = Some(value);
        self.context = context.cloned();
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Validate { path } => {
            let config = load(&path)?;
            let definition = config.build_definition()?;
            println!(
                "Workflow \"{}\" is valid: {} places, {} transitions.",
                config.name,
                definition.places().len(),
                definition.transitions().len()
            );
            println!("places: {}", definition.places().join(", "));
            for transition in definition.transitions() {
                println!(
                    "  {}: {} -> {}",
                    transition.name(),
                    transition.froms().join(", "),
                    transition.tos().join(", ")
                );
            }
        }
        Command::Enabled { subject } => {
            let (workflow, mut target) = prepare(&subject)?;
            for transition in workflow.enabled_transitions(&mut target)? {
                println!("{}", transition.name());
            }
        }
        Command::Apply {
            subject,
            transition,
            context,
        } => {
            let (workflow, mut target) = prepare(&subject)?;
            let marking = match context {
                Some(raw) => {
                    let context: Context =
                        serde_json::from_str(&raw).context("--context must be a JSON object")?;
                    workflow.apply_with_context(&mut target, &transition, context)?
                }
                None => workflow.apply(&mut target, &transition)?,
            };
            info!(transition = %transition, "done");
            println!("{}", serde_json::to_string_pretty(&marking)?);
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<WorkflowConfig> {
    WorkflowConfig::from_path(path)
        .with_context(|| format!("failed to load workflow from {}", path.display()))
}

/// Build the workflow described by the config file and a subject carrying
/// the requested marking.
fn prepare(args: &SubjectArgs) -> Result<(Workflow<CliSubject>, CliSubject)> {
    let config = load(&args.path)?;
    let definition = config.build_definition()?;
    let store: Arc<dyn MarkingStore<CliSubject>> = Arc::new(config.method_store());

    let mut subject = CliSubject::default();
    if !args.marking.is_empty() {
        let marking = Marking::<Context>::with_places(args.marking.iter().cloned());
        store
            .set_marking(&mut subject, &marking, None)
            .context("cannot encode --marking for this workflow's marking store")?;
    }

    let mut workflow = match config.kind {
        Discipline::Workflow => Workflow::new(config.name.as_str(), definition, store),
        Discipline::StateMachine => {
            Workflow::state_machine(config.name.as_str(), definition, store)?
        }
    };

    if config.audit_trail {
        let mut dispatcher: EventDispatcher<CliSubject> = EventDispatcher::new();
        AuditTrailListener::<CliSubject, Context>::register(&mut dispatcher);
        workflow = workflow.with_dispatcher(Arc::new(dispatcher));
    }
    if !args.roles.is_empty() {
        workflow = workflow.with_authorization(Arc::new(StaticAuthorizationChecker::new(
            args.roles.iter().cloned(),
        )));
    }

    Ok((workflow, subject))
}
