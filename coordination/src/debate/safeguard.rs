//! Safeguard layer: retry, validation and truncation around every model
//! call.
//!
//! ```text
//! invoke(request)
//!   ├─ backend fails, retriable, budget left → back off, try again
//!   ├─ backend fails otherwise              → RetriesExhausted (fatal for the run)
//!   └─ backend answers → clean → check markers (warn only) → cap words
//! ```
//!
//! Only call-level failures are retried. Missing structure is logged and
//! reported, never retried.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::backend::{ModelBackend, ModelError, ModelRequest};
use super::state::{count_words, Role};

static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank line regex should compile"));

/// Exponential backoff between attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay.
    pub max_delay_ms: u64,
    /// Growth factor per failed attempt (1.0 = fixed delay).
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// Delay after the failure with zero-based index `failed_attempt`.
    ///
    /// A provider hint raises the delay but never past `max_delay_ms`.
    pub fn delay_for(&self, failed_attempt: u32, hint: Option<Duration>) -> Duration {
        let cap = Duration::from_millis(self.max_delay_ms);
        let exp = self.base_delay_ms as f64 * self.multiplier.powi(failed_attempt as i32);
        let computed = Duration::from_millis(exp.min(self.max_delay_ms as f64) as u64);
        match hint {
            Some(hint) => computed.max(hint).min(cap),
            None => computed,
        }
    }
}

/// Headings each role's output is expected to contain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureMarkers {
    #[serde(default)]
    pub proponent: Vec<String>,
    #[serde(default)]
    pub opposition: Vec<String>,
    #[serde(default)]
    pub judge: Vec<String>,
}

impl StructureMarkers {
    /// No structural checks.
    pub fn none() -> Self {
        Self::default()
    }

    /// The same marker set for every role.
    pub fn uniform<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let markers: Vec<String> = markers.into_iter().map(Into::into).collect();
        Self {
            proponent: markers.clone(),
            opposition: markers.clone(),
            judge: markers,
        }
    }

    /// Headings the bundled debate templates ask each role for.
    pub fn standard() -> Self {
        Self {
            proponent: ["Main Argument", "Supporting Evidence", "Key Takeaway"]
                .map(String::from)
                .to_vec(),
            opposition: ["Counter-Argument", "Critical Analysis", "Key Takeaway"]
                .map(String::from)
                .to_vec(),
            judge: ["Argument Analysis", "Scores", "Verdict", "Reasoning"]
                .map(String::from)
                .to_vec(),
        }
    }

    pub fn for_role(&self, role: Role) -> &[String] {
        match role {
            Role::Proponent => &self.proponent,
            Role::Opposition => &self.opposition,
            Role::Judge => &self.judge,
        }
    }
}

/// Safeguard settings, fixed for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeguardConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
    /// Word cap applied to every response.
    pub max_response_length: usize,
    /// Word cap for the judge; falls back to `max_response_length`.
    pub judge_max_response_length: Option<usize>,
    pub structure_markers: StructureMarkers,
}

impl Default for SafeguardConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: BackoffPolicy::default(),
            max_response_length: 500,
            judge_max_response_length: None,
            structure_markers: StructureMarkers::none(),
        }
    }
}

impl SafeguardConfig {
    /// Word cap for `role`.
    pub fn word_limit(&self, role: Role) -> usize {
        match (role, self.judge_max_response_length) {
            (Role::Judge, Some(limit)) => limit,
            _ => self.max_response_length,
        }
    }
}

/// A model response that passed through the safeguards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedResponse {
    /// Cleaned, word-capped text. Never empty.
    pub text: String,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Configured markers absent from the response.
    pub missing_markers: Vec<String>,
    pub truncated: bool,
}

/// The backend could not produce a response within the retry budget.
#[derive(Debug, Error)]
#[error("model unavailable after {attempts} attempt(s): {source}")]
pub struct RetriesExhausted {
    pub attempts: u32,
    #[source]
    pub source: ModelError,
}

/// Normalise line endings, collapse runs of blank lines, and trim.
pub fn clean_response(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n");
    EXCESS_BLANK_LINES
        .replace_all(&normalized, "\n\n")
        .trim()
        .to_string()
}

/// Keep the text up to the end of its `max_words`-th word.
///
/// Text with at most `max_words` words comes back unchanged.
pub fn truncate_words(text: &str, max_words: usize) -> &str {
    let mut words = 0;
    let mut in_word = false;
    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            in_word = false;
        } else if !in_word {
            if words == max_words {
                return text[..idx].trim_end();
            }
            in_word = true;
            words += 1;
        }
    }
    text
}

/// Markers from `markers` that do not appear as a heading (`# marker`, any
/// level) or bold text (`**marker**`). Case-insensitive.
pub fn missing_markers(text: &str, markers: &[String]) -> Vec<String> {
    let lower = text.to_lowercase();
    markers
        .iter()
        .filter(|marker| {
            let marker = marker.to_lowercase();
            !lower.contains(&format!("# {}", marker)) && !lower.contains(&format!("**{}**", marker))
        })
        .cloned()
        .collect()
}

/// Wraps model calls with the run's retry, validation, and length policy.
#[derive(Debug, Clone)]
pub struct Safeguard {
    config: SafeguardConfig,
}

impl Safeguard {
    pub fn new(config: SafeguardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SafeguardConfig {
        &self.config
    }

    /// Call the backend under the safeguards.
    pub async fn invoke(
        &self,
        backend: &dyn ModelBackend,
        request: &ModelRequest,
    ) -> Result<GuardedResponse, RetriesExhausted> {
        let max_attempts = self.config.max_retries + 1;
        let mut attempts = 0;

        let text = loop {
            attempts += 1;
            let result = match backend.invoke(request).await {
                Ok(raw) => {
                    let cleaned = clean_response(&raw);
                    if cleaned.is_empty() {
                        Err(ModelError::EmptyResponse)
                    } else {
                        Ok(cleaned)
                    }
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(text) => break text,
                Err(e) if e.is_retriable() && attempts < max_attempts => {
                    let delay = self
                        .config
                        .backoff
                        .delay_for(attempts - 1, e.retry_after());
                    warn!(
                        role = %request.role,
                        phase = %request.phase,
                        attempt = attempts,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        role = %request.role,
                        phase = %request.phase,
                        attempts,
                        category = %e.retry_category(),
                        error = %e,
                        "model call failed, giving up"
                    );
                    return Err(RetriesExhausted {
                        attempts,
                        source: e,
                    });
                }
            }
        };

        let missing = missing_markers(&text, self.config.structure_markers.for_role(request.role));
        if !missing.is_empty() {
            warn!(
                role = %request.role,
                phase = %request.phase,
                missing = ?missing,
                "response is missing expected structure"
            );
        }

        let limit = self.config.word_limit(request.role);
        let kept = truncate_words(&text, limit);
        let truncated = kept.len() != text.len();
        if truncated {
            debug!(
                role = %request.role,
                from = count_words(&text),
                to = limit,
                "response truncated"
            );
        }

        Ok(GuardedResponse {
            text: kept.to_string(),
            attempts,
            missing_markers: missing,
            truncated,
        })
    }
}
