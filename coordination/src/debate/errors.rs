//! Run-level error taxonomy.
//!
//! Only [`DebateError::ModelUnavailable`] can end a started run early.
//! Structure problems and unparseable verdicts are absorbed inside the
//! step and surface as [`StepWarning`](super::agent::StepWarning)s.

use thiserror::Error;

use super::agent::AgentStep;
use super::backend::ModelError;

#[derive(Debug, Error)]
pub enum DebateError {
    /// The backend could not answer within the retry budget.
    #[error("{step} (round {round}) failed after {attempts} attempt(s): {source}")]
    ModelUnavailable {
        step: AgentStep,
        round: u32,
        attempts: u32,
        #[source]
        source: ModelError,
    },

    #[error("invalid debate configuration: {0}")]
    InvalidConfig(String),

    /// A step was requested on a state that already reached `Done`.
    #[error("debate is already complete")]
    AlreadyComplete,
}

impl DebateError {
    /// Whether the error aborted a run that had already started.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::ModelUnavailable { .. })
    }
}
