//! Debate Orchestration: Proponent / Opposition / Judge
//!
//! Sequences model calls for a scripted debate and keeps the run state.
//! Prompt text and network access stay outside: callers plug in a
//! [`PromptRenderer`] and a [`ModelBackend`].
//!
//! # Debate Flow
//!
//! ```text
//! Opening ──→ Rebuttal(1..=max_rounds) ──→ Closing ──→ Verdict ──→ Done
//!    │              │    ▲                    ▲
//!    │              └────┘ (next round)       │
//!    └──────── max_rounds = 0 ────────────────┘
//!
//! each step:  render prompt → safeguard(invoke model) → append turn → route
//! any step:   retries exhausted → Aborted (partial history, no verdict)
//! ```

pub mod agent;
pub mod backend;
pub mod errors;
pub mod orchestrator;
pub mod router;
pub mod safeguard;
pub mod state;
pub mod verdict;

pub use agent::{AgentStep, StepDeps, StepWarning, TurnEvent, TurnPayload};
pub use backend::{
    LabeledTurn, ModelBackend, ModelError, ModelRequest, ModelSettings, PromptContext,
    PromptRenderer, RetryCategory, Speaker,
};
pub use errors::DebateError;
pub use orchestrator::{
    DebateConfig, DebateOrchestrator, DebateOutcome, DebateStream, MAX_ROUNDS_LIMIT,
};
pub use router::{transition, PhaseRouter};
pub use safeguard::{
    clean_response, missing_markers, truncate_words, BackoffPolicy, GuardedResponse,
    RetriesExhausted, Safeguard, SafeguardConfig, StructureMarkers,
};
pub use state::{count_words, DebateState, Phase, Position, Role, TurnRecord};
pub use verdict::{
    parse_verdict, Confidence, DimensionScore, Scores, Verdict, VerdictParseError, Winner,
};
