//! Debate orchestrator: drives the router to completion.
//!
//! Two ways to run a debate:
//! - [`DebateOrchestrator::run`] runs every step and returns a
//!   [`DebateOutcome`];
//! - [`DebateOrchestrator::stream`] yields `(state, event)` per completed
//!   step and only advances when polled.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::agent::{StepDeps, TurnEvent};
use super::backend::{ModelBackend, ModelSettings, PromptRenderer};
use super::errors::DebateError;
use super::router::PhaseRouter;
use super::safeguard::{Safeguard, SafeguardConfig};
use super::state::DebateState;
use super::verdict::Verdict;

/// Upper bound on rebuttal rounds.
pub const MAX_ROUNDS_LIMIT: u32 = 10;

/// Configuration for one debate run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    /// Rebuttal rounds between opening and closing.
    pub max_rounds: u32,
    pub model: ModelSettings,
    pub safeguard: SafeguardConfig,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            model: ModelSettings::default(),
            safeguard: SafeguardConfig::default(),
        }
    }
}

impl DebateConfig {
    pub fn validate(&self) -> Result<(), DebateError> {
        let invalid = |msg: String| Err(DebateError::InvalidConfig(msg));

        if self.max_rounds > MAX_ROUNDS_LIMIT {
            return invalid(format!(
                "max_rounds {} exceeds limit {}",
                self.max_rounds, MAX_ROUNDS_LIMIT
            ));
        }
        if self.safeguard.max_response_length == 0 {
            return invalid("max_response_length must be at least 1".into());
        }
        if self.safeguard.judge_max_response_length == Some(0) {
            return invalid("judge_max_response_length must be at least 1".into());
        }
        if self.safeguard.backoff.multiplier < 1.0 {
            return invalid(format!(
                "backoff multiplier {} must be >= 1.0",
                self.safeguard.backoff.multiplier
            ));
        }
        if self.model.name.trim().is_empty() {
            return invalid("model name is empty".into());
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return invalid(format!(
                "temperature {} outside 0.0..=2.0",
                self.model.temperature
            ));
        }
        Ok(())
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum DebateOutcome {
    /// The judge ruled. The state is `Done` and carries the verdict.
    Completed(DebateState),
    /// A step failed for good. The state holds every turn completed before
    /// the failing step and no verdict.
    Aborted {
        state: DebateState,
        error: DebateError,
    },
}

impl DebateOutcome {
    pub fn state(&self) -> &DebateState {
        match self {
            Self::Completed(state) | Self::Aborted { state, .. } => state,
        }
    }

    pub fn into_state(self) -> DebateState {
        match self {
            Self::Completed(state) | Self::Aborted { state, .. } => state,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        self.state().verdict()
    }

    pub fn error(&self) -> Option<&DebateError> {
        match self {
            Self::Completed(_) => None,
            Self::Aborted { error, .. } => Some(error),
        }
    }

    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        let state = self.state();
        match self {
            Self::Completed(_) => format!(
                "[COMPLETED] {} turns | {}",
                state.history().len(),
                self.verdict()
                    .map(Verdict::headline)
                    .unwrap_or_else(|| "no verdict".into())
            ),
            Self::Aborted { error, .. } => format!(
                "[ABORTED] {} turns in {} | {}",
                state.history().len(),
                state.current_phase(),
                error
            ),
        }
    }
}

/// Stream of completed steps, in execution order.
pub type DebateStream<'a> = BoxStream<'a, Result<(DebateState, TurnEvent), DebateError>>;

/// Runs debates against one backend and renderer.
pub struct DebateOrchestrator {
    config: DebateConfig,
    safeguard: Safeguard,
    router: PhaseRouter,
    renderer: Arc<dyn PromptRenderer>,
    backend: Arc<dyn ModelBackend>,
}

impl DebateOrchestrator {
    /// Build an orchestrator. Fails if `config` does not validate.
    pub fn new(
        config: DebateConfig,
        renderer: Arc<dyn PromptRenderer>,
        backend: Arc<dyn ModelBackend>,
    ) -> Result<Self, DebateError> {
        config.validate()?;
        Ok(Self {
            safeguard: Safeguard::new(config.safeguard.clone()),
            config,
            router: PhaseRouter,
            renderer,
            backend,
        })
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    /// Fresh state for `topic`.
    pub fn start(&self, topic: &str) -> Result<DebateState, DebateError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(DebateError::InvalidConfig("topic is empty".into()));
        }
        Ok(DebateState::new(topic, self.config.max_rounds))
    }

    /// Run the pending step of `state` and move the router past it.
    pub async fn step(&self, state: &DebateState) -> Result<(DebateState, TurnEvent), DebateError> {
        let step = self
            .router
            .next_step(state)
            .ok_or(DebateError::AlreadyComplete)?;

        let deps = StepDeps {
            renderer: self.renderer.as_ref(),
            backend: self.backend.as_ref(),
            safeguard: &self.safeguard,
            model: &self.config.model,
        };
        let (after_turn, event) = step.run(state, &deps).await?;
        let next = self.router.advance(&after_turn, step);
        debug_assert!(
            next.check_invariants().is_ok(),
            "{:?}",
            next.check_invariants()
        );
        Ok((next, event))
    }

    /// Run a whole debate on `topic`.
    ///
    /// Only configuration problems are returned as `Err`; a run that starts
    /// always yields an outcome.
    pub async fn run(&self, topic: &str) -> Result<DebateOutcome, DebateError> {
        let state = self.start(topic)?;
        Ok(self.run_from(state).await)
    }

    /// Run from an existing state until it is done or a step fails.
    pub async fn run_from(&self, mut state: DebateState) -> DebateOutcome {
        info!(
            id = %state.id(),
            topic = %state.topic(),
            max_rounds = state.max_rounds(),
            model = %self.config.model.name,
            "debate started"
        );

        while !state.is_done() {
            match self.step(&state).await {
                Ok((next, _)) => state = next,
                Err(e) => {
                    error!(
                        id = %state.id(),
                        phase = %state.current_phase(),
                        turns = state.history().len(),
                        error = %e,
                        "debate aborted"
                    );
                    return DebateOutcome::Aborted { state, error: e };
                }
            }
        }

        info!(id = %state.id(), turns = state.history().len(), "debate complete");
        DebateOutcome::Completed(state)
    }

    /// Lazily run a debate on `topic`, one item per completed step.
    ///
    /// The stream ends after the judge step, or right after the first
    /// error. Dropping it stops the run.
    pub fn stream(&self, topic: &str) -> Result<DebateStream<'_>, DebateError> {
        let state = self.start(topic)?;
        Ok(self.stream_from(state))
    }

    pub fn stream_from(&self, state: DebateState) -> DebateStream<'_> {
        stream::unfold(Some(state), move |state| async move {
            let state = state?;
            if state.is_done() {
                return None;
            }
            match self.step(&state).await {
                Ok((next, event)) => Some((Ok((next.clone(), event)), Some(next))),
                Err(e) => {
                    error!(
                        id = %state.id(),
                        phase = %state.current_phase(),
                        error = %e,
                        "debate stream aborted"
                    );
                    Some((Err(e), None))
                }
            }
        })
        .boxed()
    }
}
