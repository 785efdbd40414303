//! Collaborator seams: the model backend and the prompt renderer.
//!
//! The debate engine never builds prompt text and never touches the
//! network. It hands a [`PromptContext`] to a [`PromptRenderer`] and the
//! rendered text to a [`ModelBackend`], and everything else stays inside
//! the engine.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::{Phase, Role, TurnRecord};

/// Retry classification of a backend failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCategory {
    /// Network failure, timeout, backend hiccup, or empty reply.
    Transient,
    /// Provider throttling. Retry after backing off.
    RateLimit,
    /// The request itself is wrong (auth, payload).
    Fatal,
}

impl RetryCategory {
    pub fn is_retriable(self) -> bool {
        !matches!(self, Self::Fatal)
    }
}

impl std::fmt::Display for RetryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// Failure reported by a [`ModelBackend`].
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("transient backend failure: {0}")]
    Transient(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("request rejected: {0}")]
    Rejected(String),
}

impl ModelError {
    pub fn retry_category(&self) -> RetryCategory {
        match self {
            Self::Transient(_) | Self::Timeout(_) | Self::EmptyResponse => {
                RetryCategory::Transient
            }
            Self::RateLimited { .. } => RetryCategory::RateLimit,
            Self::Rejected(_) => RetryCategory::Fatal,
        }
    }

    pub fn is_retriable(&self) -> bool {
        self.retry_category().is_retriable()
    }

    /// Provider-supplied wait hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Model parameters fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Provider model identifier.
    pub name: String,
    pub temperature: f32,
    /// Completion token ceiling sent to the provider.
    pub max_tokens: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "tngtech/deepseek-r1t2-chimera:free".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }
}

/// One model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub role: Role,
    pub phase: Phase,
    pub round: u32,
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// The single I/O boundary of the engine: send a prompt, get raw text back.
///
/// Implementations own their own timeouts and report them as
/// [`ModelError::Timeout`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn invoke(&self, request: &ModelRequest) -> Result<String, ModelError>;
}

/// Who spoke a transcript turn, relative to the agent being prompted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The agent being prompted.
    Own,
    /// The other debater.
    Opponent,
    /// Every debater turn as seen by the judge.
    Other,
}

/// A transcript turn with its speaker label.
#[derive(Debug, Clone, Copy)]
pub struct LabeledTurn<'a> {
    pub speaker: Speaker,
    pub turn: &'a TurnRecord,
}

/// Everything a renderer may use to build a prompt.
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub topic: &'a str,
    pub role: Role,
    pub phase: Phase,
    /// Rebuttal round; 0 outside the rebuttal phase.
    pub round: u32,
    pub max_rounds: u32,
    /// Word limit the response will be truncated to.
    pub max_words: usize,
    /// Full debate so far, oldest first.
    pub transcript: Vec<LabeledTurn<'a>>,
}

impl<'a> PromptContext<'a> {
    /// Label every turn in `history` relative to `role`.
    pub fn label_history(role: Role, history: &'a [TurnRecord]) -> Vec<LabeledTurn<'a>> {
        history
            .iter()
            .map(|turn| {
                let speaker = if role == Role::Judge {
                    Speaker::Other
                } else if turn.role() == role {
                    Speaker::Own
                } else {
                    Speaker::Opponent
                };
                LabeledTurn { speaker, turn }
            })
            .collect()
    }

    /// The opponent's most recent turn.
    pub fn last_opponent_turn(&self) -> Option<&'a TurnRecord> {
        self.transcript
            .iter()
            .rev()
            .find(|t| t.speaker == Speaker::Opponent)
            .map(|t| t.turn)
    }

    /// The prompted agent's own previous turns, oldest first.
    pub fn own_turns(&self) -> impl Iterator<Item = &'a TurnRecord> + '_ {
        self.transcript
            .iter()
            .filter(|t| t.speaker == Speaker::Own)
            .map(|t| t.turn)
    }
}

/// Turns a prompt context into prompt text. Must be pure.
pub trait PromptRenderer: Send + Sync {
    fn render(&self, ctx: &PromptContext<'_>) -> String;
}

impl<F> PromptRenderer for F
where
    F: Fn(&PromptContext<'_>) -> String + Send + Sync,
{
    fn render(&self, ctx: &PromptContext<'_>) -> String {
        self(ctx)
    }
}
