//! Agent steps: the seven named units of work a debate is made of.
//!
//! A step reads the state, asks the renderer for its prompt, calls the
//! backend through the safeguards, and returns a new state with exactly one
//! turn appended (plus the verdict, for the judge). It never moves the
//! phase or round; that belongs to the router.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::backend::{ModelBackend, ModelRequest, ModelSettings, PromptContext, PromptRenderer};
use super::errors::DebateError;
use super::safeguard::Safeguard;
use super::state::{DebateState, Phase, Role, TurnRecord};
use super::verdict::{parse_verdict, Verdict};

/// A named unit of work in the debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStep {
    ProponentOpen,
    OppositionOpen,
    ProponentRebut,
    OppositionRebut,
    ProponentClose,
    OppositionClose,
    Judge,
}

impl AgentStep {
    /// Every step, in the order a full debate visits them.
    pub const ALL: [AgentStep; 7] = [
        Self::ProponentOpen,
        Self::OppositionOpen,
        Self::ProponentRebut,
        Self::OppositionRebut,
        Self::ProponentClose,
        Self::OppositionClose,
        Self::Judge,
    ];

    pub fn role(self) -> Role {
        match self {
            Self::ProponentOpen | Self::ProponentRebut | Self::ProponentClose => Role::Proponent,
            Self::OppositionOpen | Self::OppositionRebut | Self::OppositionClose => {
                Role::Opposition
            }
            Self::Judge => Role::Judge,
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            Self::ProponentOpen | Self::OppositionOpen => Phase::Opening,
            Self::ProponentRebut | Self::OppositionRebut => Phase::Rebuttal,
            Self::ProponentClose | Self::OppositionClose => Phase::Closing,
            Self::Judge => Phase::Verdict,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ProponentOpen => "proponent_open",
            Self::OppositionOpen => "opposition_open",
            Self::ProponentRebut => "proponent_rebut",
            Self::OppositionRebut => "opposition_rebut",
            Self::ProponentClose => "proponent_close",
            Self::OppositionClose => "opposition_close",
            Self::Judge => "judge",
        }
    }

    /// Run this step against `state`.
    ///
    /// On success the returned state has one more turn than `state`; phase,
    /// round and pending step are unchanged. On failure `state` is the
    /// caller's to keep.
    pub async fn run(
        self,
        state: &DebateState,
        deps: &StepDeps<'_>,
    ) -> Result<(DebateState, TurnEvent), DebateError> {
        let role = self.role();
        let phase = self.phase();
        let round = if phase == Phase::Rebuttal {
            state.current_round()
        } else {
            0
        };

        let prompt = {
            let ctx = PromptContext {
                topic: state.topic(),
                role,
                phase,
                round,
                max_rounds: state.max_rounds(),
                max_words: deps.safeguard.config().word_limit(role),
                transcript: PromptContext::label_history(role, state.history()),
            };
            deps.renderer.render(&ctx)
        };
        debug!(step = %self, round, prompt_chars = prompt.len(), "prompt rendered");

        let request = ModelRequest {
            role,
            phase,
            round,
            prompt,
            model: deps.model.name.clone(),
            temperature: deps.model.temperature,
            max_tokens: deps.model.max_tokens,
        };

        let response = deps
            .safeguard
            .invoke(deps.backend, &request)
            .await
            .map_err(|e| DebateError::ModelUnavailable {
                step: self,
                round,
                attempts: e.attempts,
                source: e.source,
            })?;

        let mut warnings = Vec::new();
        if !response.missing_markers.is_empty() {
            warnings.push(StepWarning::MissingStructure {
                missing: response.missing_markers.clone(),
            });
        }

        let turn = TurnRecord::new(role, phase, round, response.text.clone());
        let word_count = turn.word_count();

        let (next, payload) = if role == Role::Judge {
            let verdict = match parse_verdict(&response.text) {
                Ok(verdict) => verdict,
                Err(e) => {
                    warn!(step = %self, reason = %e, "judge output unparseable, recording a tie");
                    warnings.push(StepWarning::VerdictParseFailure {
                        reason: e.to_string(),
                    });
                    Verdict::fallback(&response.text)
                }
            };
            info!(
                step = %self,
                winner = %verdict.winner,
                proponent = verdict.scores.proponent,
                opposition = verdict.scores.opposition,
                degraded = verdict.degraded,
                "verdict recorded"
            );
            (
                state.with_verdict(turn, verdict.clone()),
                TurnPayload::Verdict(verdict),
            )
        } else {
            info!(
                step = %self,
                round,
                words = word_count,
                attempts = response.attempts,
                "turn complete"
            );
            (state.with_turn(turn), TurnPayload::Argument(response.text))
        };

        let event = TurnEvent {
            step: self,
            role,
            phase,
            round,
            payload,
            attempts: response.attempts,
            warnings,
            word_count,
        };
        Ok((next, event))
    }
}

impl std::fmt::Display for AgentStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Collaborators a step needs, borrowed for the duration of one call.
#[derive(Clone, Copy)]
pub struct StepDeps<'a> {
    pub renderer: &'a dyn PromptRenderer,
    pub backend: &'a dyn ModelBackend,
    pub safeguard: &'a Safeguard,
    pub model: &'a ModelSettings,
}

/// Non-fatal problem recovered inside a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepWarning {
    /// Expected section headings were absent; the text was kept as is.
    MissingStructure { missing: Vec<String> },
    /// The judge output could not be parsed; a fallback tie was recorded.
    VerdictParseFailure { reason: String },
}

impl std::fmt::Display for StepWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingStructure { missing } => {
                write!(f, "missing structure: {}", missing.join(", "))
            }
            Self::VerdictParseFailure { reason } => write!(f, "verdict parse failure: {}", reason),
        }
    }
}

/// What a step produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TurnPayload {
    Argument(String),
    Verdict(Verdict),
}

/// Emitted once per completed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnEvent {
    pub step: AgentStep,
    pub role: Role,
    pub phase: Phase,
    pub round: u32,
    pub payload: TurnPayload,
    pub attempts: u32,
    pub warnings: Vec<StepWarning>,
    pub word_count: usize,
}

impl TurnEvent {
    pub fn argument(&self) -> Option<&str> {
        match &self.payload {
            TurnPayload::Argument(text) => Some(text),
            TurnPayload::Verdict(_) => None,
        }
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        match &self.payload {
            TurnPayload::Verdict(verdict) => Some(verdict),
            TurnPayload::Argument(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::backend::{MockModelBackend, ModelError};
    use super::super::safeguard::{SafeguardConfig, StructureMarkers};
    use super::super::verdict::Winner;
    use super::*;

    struct EchoRenderer;

    impl PromptRenderer for EchoRenderer {
        fn render(&self, ctx: &PromptContext<'_>) -> String {
            format!("{} {} {}", ctx.role, ctx.phase, ctx.transcript.len())
        }
    }

    fn deps<'a>(
        backend: &'a MockModelBackend,
        safeguard: &'a Safeguard,
        model: &'a ModelSettings,
    ) -> StepDeps<'a> {
        StepDeps {
            renderer: &EchoRenderer,
            backend,
            safeguard,
            model,
        }
    }

    #[test]
    fn test_step_roles_and_phases() {
        assert_eq!(AgentStep::ProponentRebut.role(), Role::Proponent);
        assert_eq!(AgentStep::OppositionClose.phase(), Phase::Closing);
        assert_eq!(AgentStep::Judge.phase(), Phase::Verdict);
        assert_eq!(AgentStep::OppositionOpen.to_string(), "opposition_open");
        for pair in AgentStep::ALL[..6].chunks(2) {
            assert_eq!(pair[0].role(), Role::Proponent);
            assert_eq!(pair[1].role(), Role::Opposition);
            assert_eq!(pair[0].phase(), pair[1].phase());
        }
    }

    #[tokio::test]
    async fn test_debater_step_appends_one_turn() {
        let mut backend = MockModelBackend::new();
        backend
            .expect_invoke()
            .withf(|req| req.prompt == "proponent opening 0" && req.model == "m")
            .times(1)
            .returning(|_| Ok("## Main Argument\nWe should.".to_string()));

        let safeguard = Safeguard::new(SafeguardConfig::default());
        let model = ModelSettings {
            name: "m".into(),
            ..Default::default()
        };
        let state = DebateState::new("topic", 1);
        let (next, event) = AgentStep::ProponentOpen
            .run(&state, &deps(&backend, &safeguard, &model))
            .await
            .unwrap();

        assert_eq!(next.history().len(), 1);
        assert_eq!(next.current_phase(), state.current_phase());
        assert_eq!(next.pending_step(), state.pending_step());
        assert_eq!(event.argument(), Some("## Main Argument\nWe should."));
        assert_eq!(event.word_count, 5);
        assert_eq!(event.attempts, 1);
        assert!(event.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_missing_structure_becomes_warning() {
        let mut backend = MockModelBackend::new();
        backend
            .expect_invoke()
            .returning(|_| Ok("plain text".to_string()));

        let safeguard = Safeguard::new(SafeguardConfig {
            structure_markers: StructureMarkers::standard(),
            ..Default::default()
        });
        let model = ModelSettings::default();
        let (_, event) = AgentStep::OppositionOpen
            .run(
                &DebateState::new("topic", 1),
                &deps(&backend, &safeguard, &model),
            )
            .await
            .unwrap();
        assert!(matches!(
            &event.warnings[0],
            StepWarning::MissingStructure { missing } if missing.len() == 3
        ));
    }

    #[tokio::test]
    async fn test_unparseable_verdict_falls_back_to_tie() {
        let mut backend = MockModelBackend::new();
        backend
            .expect_invoke()
            .returning(|_| Ok("I cannot decide.".to_string()));

        let safeguard = Safeguard::new(SafeguardConfig::default());
        let model = ModelSettings::default();
        let (next, event) = AgentStep::Judge
            .run(
                &DebateState::new("topic", 0),
                &deps(&backend, &safeguard, &model),
            )
            .await
            .unwrap();

        let verdict = next.verdict().unwrap();
        assert_eq!(verdict.winner, Winner::Tie);
        assert_eq!(verdict.scores.proponent, 0);
        assert_eq!(verdict.rationale, "I cannot decide.");
        assert!(verdict.degraded);
        assert_eq!(event.verdict(), Some(verdict));
        assert!(matches!(
            event.warnings[0],
            StepWarning::VerdictParseFailure { .. }
        ));
        assert_eq!(next.history()[0].role(), Role::Judge);
    }

    #[tokio::test]
    async fn test_exhausted_call_maps_to_model_unavailable() {
        let mut backend = MockModelBackend::new();
        backend
            .expect_invoke()
            .times(1)
            .returning(|_| Err(ModelError::Rejected("bad key".into())));

        let safeguard = Safeguard::new(SafeguardConfig::default());
        let model = ModelSettings::default();
        let state = DebateState::new("topic", 2).with_position(super::super::state::Position {
            phase: Phase::Rebuttal,
            round: 2,
            next: Some(AgentStep::OppositionRebut),
        });
        let err = AgentStep::OppositionRebut
            .run(&state, &deps(&backend, &safeguard, &model))
            .await
            .unwrap_err();

        match err {
            DebateError::ModelUnavailable {
                step,
                round,
                attempts,
                ..
            } => {
                assert_eq!(step, AgentStep::OppositionRebut);
                assert_eq!(round, 2);
                assert_eq!(attempts, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
