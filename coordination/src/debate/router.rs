//! Phase router: the debate state machine as an explicit transition table.
//!
//! ```text
//! Opening:  proponent_open → opposition_open ─┬─ max_rounds = 0 ─→ Closing
//!                                             └─→ Rebuttal(1)
//! Rebuttal(r): proponent_rebut → opposition_rebut ─┬─ r < max_rounds → Rebuttal(r+1)
//!                                                  └─→ Closing
//! Closing:  proponent_close → opposition_close → Verdict
//! Verdict:  judge → Done
//! ```
//!
//! Proponent always speaks before opposition. The round counter stops at
//! `max_rounds`; closing and verdict keep the last round visited.

use tracing::debug;

use super::agent::AgentStep;
use super::state::{DebateState, Phase, Position};

/// Position after `completed` finishes in `round` of a debate with
/// `max_rounds` rebuttal rounds.
pub fn transition(completed: AgentStep, round: u32, max_rounds: u32) -> Position {
    use AgentStep::*;

    let (phase, round, next) = match completed {
        ProponentOpen => (Phase::Opening, round, Some(OppositionOpen)),
        OppositionOpen if max_rounds == 0 => (Phase::Closing, round, Some(ProponentClose)),
        OppositionOpen => (Phase::Rebuttal, 1, Some(ProponentRebut)),
        ProponentRebut => (Phase::Rebuttal, round, Some(OppositionRebut)),
        OppositionRebut if round >= max_rounds => (Phase::Closing, round, Some(ProponentClose)),
        OppositionRebut => (Phase::Rebuttal, round + 1, Some(ProponentRebut)),
        ProponentClose => (Phase::Closing, round, Some(OppositionClose)),
        OppositionClose => (Phase::Verdict, round, Some(Judge)),
        Judge => (Phase::Done, round, None),
    };
    Position { phase, round, next }
}

/// Drives [`DebateState`] positions through [`transition`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseRouter;

impl PhaseRouter {
    /// The step that runs next, or `None` once the debate is done.
    pub fn next_step(&self, state: &DebateState) -> Option<AgentStep> {
        state.pending_step()
    }

    /// New state moved past `completed`.
    pub fn advance(&self, state: &DebateState, completed: AgentStep) -> DebateState {
        let from = state.current_phase();
        let position = transition(completed, state.current_round(), state.max_rounds());
        debug_assert!(
            position.phase == from || from.valid_transitions().contains(&position.phase),
            "illegal transition {from} -> {}",
            position.phase
        );
        if position.phase != from || position.round != state.current_round() {
            debug!(
                from = %from,
                to = %position.phase,
                round = position.round,
                "phase advanced"
            );
        }
        state.with_position(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Walk the table from the start position and collect every step.
    fn walk(max_rounds: u32) -> Vec<(AgentStep, u32)> {
        let mut position = Position::start();
        let mut visited = Vec::new();
        while let Some(step) = position.next {
            visited.push((step, position.round));
            position = transition(step, position.round, max_rounds);
            assert!(position.round <= max_rounds);
        }
        assert_eq!(position.phase, Phase::Done);
        visited
    }

    #[test]
    fn test_zero_rounds_skips_rebuttal() {
        let steps: Vec<_> = walk(0).into_iter().map(|(s, _)| s).collect();
        assert_eq!(
            steps,
            vec![
                AgentStep::ProponentOpen,
                AgentStep::OppositionOpen,
                AgentStep::ProponentClose,
                AgentStep::OppositionClose,
                AgentStep::Judge,
            ]
        );
    }

    #[test]
    fn test_two_rounds() {
        let visited = walk(2);
        assert_eq!(visited.len(), 9);
        let rebuttals: Vec<_> = visited
            .iter()
            .filter(|(s, _)| s.phase() == Phase::Rebuttal)
            .collect();
        assert_eq!(
            rebuttals,
            vec![
                &(AgentStep::ProponentRebut, 1),
                &(AgentStep::OppositionRebut, 1),
                &(AgentStep::ProponentRebut, 2),
                &(AgentStep::OppositionRebut, 2),
            ]
        );
    }

    #[test]
    fn test_turn_count_formula() {
        for rounds in 0..=6 {
            let visited = walk(rounds);
            let debater = visited.iter().filter(|(s, _)| *s != AgentStep::Judge).count();
            assert_eq!(debater as u32, 2 + 2 * rounds + 2);
            assert_eq!(visited.last().map(|(s, _)| *s), Some(AgentStep::Judge));
        }
    }

    #[test]
    fn test_proponent_precedes_opposition() {
        let visited = walk(3);
        for pair in visited[..visited.len() - 1].chunks(2) {
            assert_eq!(pair[0].0.role(), super::super::state::Role::Proponent);
            assert_eq!(pair[1].0.role(), super::super::state::Role::Opposition);
            assert_eq!(pair[0].1, pair[1].1);
        }
    }

    #[test]
    fn test_router_advances_state() {
        let router = PhaseRouter;
        let state = DebateState::new("topic", 1);
        assert_eq!(router.next_step(&state), Some(AgentStep::ProponentOpen));

        let state = router.advance(&state, AgentStep::ProponentOpen);
        let state = router.advance(&state, AgentStep::OppositionOpen);
        assert_eq!(state.current_phase(), Phase::Rebuttal);
        assert_eq!(state.current_round(), 1);

        let state = router.advance(&state, AgentStep::ProponentRebut);
        let state = router.advance(&state, AgentStep::OppositionRebut);
        assert_eq!(state.current_phase(), Phase::Closing);
        assert_eq!(state.current_round(), 1);
        assert_eq!(router.next_step(&state), Some(AgentStep::ProponentClose));
    }
}
