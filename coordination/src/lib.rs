//! Debate coordination library
//!
//! Runs a scripted, multi-party debate between language-model personas:
//! - a Proponent and an Opposition argue through opening, rebuttal and
//!   closing phases
//! - a neutral Judge scores the transcript and names a winner
//! - every model call goes through one safeguard layer (retry with
//!   backoff, structure checks, word cap)
//!
//! The library owns the state machine and the run state only. Prompt text
//! comes from a [`debate::PromptRenderer`], model output from a
//! [`debate::ModelBackend`]; neither touches the environment.
//!
//! # Usage
//!
//! ```ignore
//! let orchestrator = DebateOrchestrator::new(config, renderer, backend)?;
//! match orchestrator.run("Remote work beats office work").await? {
//!     DebateOutcome::Completed(state) => println!("{}", state.verdict().unwrap().headline()),
//!     DebateOutcome::Aborted { state, error } => eprintln!("{error}: {} turns", state.history().len()),
//! }
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod debate;

// Re-export key debate types
pub use debate::{
    AgentStep, DebateConfig, DebateError, DebateOrchestrator, DebateOutcome, DebateState,
    ModelBackend, ModelError, Phase, PromptRenderer, Role, TurnEvent, TurnRecord, Verdict, Winner,
};
