//! Debate state model: roles, phases, turn records and the run state.
//!
//! `DebateState` is a value type. Every transition builds a new state from
//! the previous one (`with_turn`, `with_verdict`, `with_position`) and the
//! old value stays valid, so a streamed snapshot can never be mutated by a
//! later step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::agent::AgentStep;
use super::verdict::Verdict;

/// Participant in the debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Argues for the proposition.
    Proponent,
    /// Argues against the proposition.
    Opposition,
    /// Neutral adjudicator.
    Judge,
}

impl Role {
    /// The other debater. The judge has no opponent.
    pub fn opponent(self) -> Option<Role> {
        match self {
            Self::Proponent => Some(Self::Opposition),
            Self::Opposition => Some(Self::Proponent),
            Self::Judge => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proponent => write!(f, "proponent"),
            Self::Opposition => write!(f, "opposition"),
            Self::Judge => write!(f, "judge"),
        }
    }
}

/// Stage of the debate state machine.
///
/// Turn records only ever carry the first four; `Done` is reserved for
/// the run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Opening,
    Rebuttal,
    Closing,
    Verdict,
    /// Terminal. The judge has ruled.
    Done,
}

impl Phase {
    /// Whether this is the terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }

    /// Phases that may follow this one.
    pub fn valid_transitions(self) -> &'static [Phase] {
        match self {
            Self::Opening => &[Self::Rebuttal, Self::Closing],
            Self::Rebuttal => &[Self::Rebuttal, Self::Closing],
            Self::Closing => &[Self::Verdict],
            Self::Verdict => &[Self::Done],
            Self::Done => &[],
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opening => write!(f, "opening"),
            Self::Rebuttal => write!(f, "rebuttal"),
            Self::Closing => write!(f, "closing"),
            Self::Verdict => write!(f, "verdict"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Count whitespace-separated words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// One agent's contribution. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    role: Role,
    phase: Phase,
    round_number: u32,
    content: String,
    word_count: usize,
    timestamp: DateTime<Utc>,
}

impl TurnRecord {
    /// Build a record. `round_number` is only kept for rebuttal turns;
    /// every other phase records round 0.
    pub fn new(role: Role, phase: Phase, round_number: u32, content: impl Into<String>) -> Self {
        let content = content.into();
        let round_number = if phase == Phase::Rebuttal {
            round_number
        } else {
            0
        };
        Self {
            role,
            phase,
            round_number,
            word_count: count_words(&content),
            content,
            timestamp: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Short label such as `proponent rebuttal (round 2)`.
    pub fn label(&self) -> String {
        if self.phase == Phase::Rebuttal {
            format!("{} {} (round {})", self.role, self.phase, self.round_number)
        } else {
            format!("{} {}", self.role, self.phase)
        }
    }
}

/// Where the router currently stands: phase, round, and the step to run next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub phase: Phase,
    pub round: u32,
    /// `None` once the debate is done.
    pub next: Option<AgentStep>,
}

impl Position {
    /// Starting position of every run.
    pub fn start() -> Self {
        Self {
            phase: Phase::Opening,
            round: 0,
            next: Some(AgentStep::ProponentOpen),
        }
    }
}

/// The run state threaded through a whole debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateState {
    id: String,
    topic: String,
    max_rounds: u32,
    current_phase: Phase,
    current_round: u32,
    pending: Option<AgentStep>,
    history: Vec<TurnRecord>,
    verdict: Option<Verdict>,
    created_at: DateTime<Utc>,
}

impl DebateState {
    /// Fresh state at the opening position. Callers validate the topic.
    pub fn new(topic: impl Into<String>, max_rounds: u32) -> Self {
        let start = Position::start();
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            max_rounds,
            current_phase: start.phase,
            current_round: start.round,
            pending: start.next,
            history: Vec::new(),
            verdict: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn current_phase(&self) -> Phase {
        self.current_phase
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    /// The step the router will run next, if any.
    pub fn pending_step(&self) -> Option<AgentStep> {
        self.pending
    }

    pub fn history(&self) -> &[TurnRecord] {
        &self.history
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn position(&self) -> Position {
        Position {
            phase: self.current_phase,
            round: self.current_round,
            next: self.pending,
        }
    }

    /// Whether the debate reached its terminal phase.
    pub fn is_done(&self) -> bool {
        self.current_phase.is_terminal()
    }

    /// New state with `turn` appended to the history.
    pub fn with_turn(&self, turn: TurnRecord) -> Self {
        let mut next = self.clone();
        next.history.push(turn);
        next
    }

    /// New state with `turn` appended and the verdict recorded.
    pub fn with_verdict(&self, turn: TurnRecord, verdict: Verdict) -> Self {
        let mut next = self.with_turn(turn);
        next.verdict = Some(verdict);
        next
    }

    /// New state moved to `position`. History and verdict are carried over.
    pub fn with_position(&self, position: Position) -> Self {
        let mut next = self.clone();
        next.current_phase = position.phase;
        next.current_round = position.round;
        next.pending = position.next;
        next
    }

    /// Most recent turn, optionally restricted to one role.
    pub fn last_turn(&self, role: Option<Role>) -> Option<&TurnRecord> {
        match role {
            Some(role) => self.history.iter().rev().find(|t| t.role == role),
            None => self.history.last(),
        }
    }

    pub fn turns_by_role(&self, role: Role) -> impl Iterator<Item = &TurnRecord> {
        self.history.iter().filter(move |t| t.role == role)
    }

    pub fn turns_by_phase(&self, phase: Phase) -> impl Iterator<Item = &TurnRecord> {
        self.history.iter().filter(move |t| t.phase == phase)
    }

    /// Total words spoken by `role`.
    pub fn word_total(&self, role: Role) -> usize {
        self.turns_by_role(role).map(TurnRecord::word_count).sum()
    }

    /// Check the structural invariants of a reachable state.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.current_round > self.max_rounds {
            return Err(format!(
                "current_round {} exceeds max_rounds {}",
                self.current_round, self.max_rounds
            ));
        }
        if self.verdict.is_some() != self.current_phase.is_terminal() {
            return Err(format!(
                "verdict present = {} in phase {}",
                self.verdict.is_some(),
                self.current_phase
            ));
        }
        if self.pending.is_none() != self.current_phase.is_terminal() {
            return Err(format!(
                "pending step {:?} in phase {}",
                self.pending, self.current_phase
            ));
        }
        if let Some(turn) = self.history.iter().find(|t| t.content.trim().is_empty()) {
            return Err(format!("empty content in {}", turn.label()));
        }
        Ok(())
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] round {}/{} | {} turns | id={}",
            self.current_phase,
            self.current_round,
            self.max_rounds,
            self.history.len(),
            self.id
        )
    }
}
