//! Streamed run that reports each turn as it lands.

use coordination::debate::{DebateError, DebateOrchestrator, DebateOutcome, TurnRecord};
use futures::StreamExt;

/// Drive a streamed debate on `topic`, handing every new turn to `on_turn`.
///
/// Step warnings are already logged by the engine, so only the turn itself
/// is surfaced here. A failed step ends the run as `Aborted` with the last
/// streamed state.
pub async fn run_streaming<F>(
    orchestrator: &DebateOrchestrator,
    topic: &str,
    mut on_turn: F,
) -> Result<DebateOutcome, DebateError>
where
    F: FnMut(&TurnRecord),
{
    let mut last = orchestrator.start(topic)?;
    let mut stream = orchestrator.stream_from(last.clone());

    while let Some(item) = stream.next().await {
        match item {
            Ok((state, _)) => {
                if let Some(turn) = state.history().last() {
                    on_turn(turn);
                }
                last = state;
            }
            Err(error) => return Ok(DebateOutcome::Aborted { state: last, error }),
        }
    }
    Ok(DebateOutcome::Completed(last))
}
