//! Console, Markdown and JSON renderings of a debate.

use std::path::{Path, PathBuf};

use coordination::debate::{DebateState, Phase, Role, TurnRecord, Verdict, Winner};
use thiserror::Error;

const RULE_WIDTH: usize = 60;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unsupported export extension for {0} (use .md or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize debate: {0}")]
    Json(#[from] serde_json::Error),
}

/// Transcript export format, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Result<Self, ReportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("md") | Some("markdown") => Ok(Self::Markdown),
            Some("json") => Ok(Self::Json),
            _ => Err(ReportError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

fn heading(turn: &TurnRecord) -> String {
    let mut heading = format!(
        "{} - {}",
        turn.role().to_string().to_uppercase(),
        turn.phase().to_string().to_uppercase()
    );
    if turn.phase() == Phase::Rebuttal {
        heading.push_str(&format!(" (Round {})", turn.round_number()));
    }
    heading
}

/// One turn as a console block.
pub fn render_turn(turn: &TurnRecord) -> String {
    let rule = "─".repeat(RULE_WIDTH);
    format!(
        "\n{rule}\n{}\n   Words: {}\n{rule}\n{}",
        heading(turn),
        turn.word_count(),
        turn.content()
    )
}

/// The verdict panel, or a notice when the run produced none.
pub fn render_verdict(verdict: Option<&Verdict>) -> String {
    let Some(verdict) = verdict else {
        return "\nNo verdict was produced.".to_string();
    };
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = format!(
        "\n{rule}\nFINAL VERDICT\n{rule}\n\nWINNER: {}\nCONFIDENCE: {}\nSCORES: proponent {} / opposition {}",
        verdict.winner.to_string().to_uppercase(),
        verdict.confidence.to_string().to_uppercase(),
        verdict.scores.proponent,
        verdict.scores.opposition,
    );
    if verdict.degraded {
        out.push_str("\n(judge output could not be parsed; defaulted to a tie)");
    }
    if let Some(summary) = &verdict.summary {
        out.push_str(&format!("\n\nSUMMARY: {}", summary));
    }
    out
}

/// Turn count and words per side.
pub fn render_summary(state: &DebateState) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!(
        "\n{rule}\nDEBATE SUMMARY\n{rule}\n\nTopic: {}\nRounds: {}\nTotal Turns: {}\n\nProponent Words: {}\nOpposition Words: {}",
        state.topic(),
        state.max_rounds(),
        state.history().len(),
        state.word_total(Role::Proponent),
        state.word_total(Role::Opposition),
    )
}

/// Full transcript as Markdown.
pub fn to_markdown(state: &DebateState) -> String {
    let mut lines = vec![
        "# Debate Transcript".to_string(),
        format!("**Topic:** {}", state.topic()),
        format!("**Date:** {}", state.created_at().format("%Y-%m-%d %H:%M UTC")),
        format!("**Rounds:** {}", state.max_rounds()),
        format!("**Run:** {}", state.id()),
        String::new(),
        "---".to_string(),
        String::new(),
    ];

    for turn in state.history().iter().filter(|t| t.role() != Role::Judge) {
        lines.push(format!("## {}", heading(turn)));
        lines.push(String::new());
        lines.push(turn.content().to_string());
        lines.push(String::new());
        lines.push("---".to_string());
        lines.push(String::new());
    }

    match state.verdict() {
        Some(verdict) => {
            lines.push("## FINAL VERDICT".to_string());
            lines.push(String::new());
            let winner = match verdict.winner {
                Winner::Tie => "TIE".to_string(),
                side => side.to_string().to_uppercase(),
            };
            lines.push(format!("**Winner:** {}", winner));
            lines.push(format!(
                "**Confidence:** {}",
                verdict.confidence.to_string().to_uppercase()
            ));
            lines.push(format!(
                "**Scores:** Proponent {} / Opposition {}",
                verdict.scores.proponent, verdict.scores.opposition
            ));
            if !verdict.dimensions.is_empty() {
                lines.push(String::new());
                lines.push("| Dimension | Proponent | Opposition | Notes |".to_string());
                lines.push("|-----------|-----------|------------|-------|".to_string());
                for d in &verdict.dimensions {
                    lines.push(format!(
                        "| {} | {} | {} | {} |",
                        d.dimension, d.proponent, d.opposition, d.notes
                    ));
                }
            }
            lines.push(String::new());
            lines.push(verdict.rationale.clone());
            if let Some(summary) = &verdict.summary {
                lines.push(String::new());
                lines.push(format!("_{}_", summary));
            }
        }
        None => {
            lines.push(format!(
                "_Debate ended in the {} phase without a verdict._",
                state.current_phase()
            ));
        }
    }

    lines.join("\n")
}

/// Full run state as pretty JSON.
pub fn to_json(state: &DebateState) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(state)?)
}

/// Write the transcript to `path` in the format its extension names.
pub fn export(state: &DebateState, path: &Path) -> Result<ExportFormat, ReportError> {
    let format = ExportFormat::from_path(path)?;
    let body = match format {
        ExportFormat::Markdown => to_markdown(state),
        ExportFormat::Json => to_json(state)?,
    };
    std::fs::write(path, body).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(format)
}
