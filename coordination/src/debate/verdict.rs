//! Judge verdict: structured model plus a lenient parser over the judge's
//! markdown output.
//!
//! The judge is asked for a score table, a `WINNER:` line, a `CONFIDENCE:`
//! line, and `Reasoning` / `Summary` sections. Only the winner and the
//! scores are required; everything else has a default. When either is
//! missing the caller substitutes [`Verdict::fallback`].

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static WINNER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bwinner\s*:?\s*\**\s*:?\s*(proponent|opposition|tie)\b",
        r"(?i)\bthe\s+winner\s+is\s+(?:the\s+)?(proponent|opposition|tie)\b",
        r"(?i)\bdeclare\s+(?:the\s+)?(proponent|opposition|tie)\s+(?:as\s+)?(?:the\s+)?winner",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("winner regex should compile"))
    .collect()
});

static CONFIDENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bconfidence\s*:?\s*\**\s*:?\s*(high|medium|low)\b")
        .expect("confidence regex should compile")
});

static SCORE_ROW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^\s*\|\s*\**\s*([A-Za-z][A-Za-z \-]*?)\s*\**\s*\|\s*\**(\d+(?:\.\d+)?)\**\s*(?:/\s*\d+(?:\.\d+)?)?\**\s*\|\s*\**(\d+(?:\.\d+)?)\**\s*(?:/\s*\d+(?:\.\d+)?)?\**\s*\|(.*)$",
    )
    .expect("score row regex should compile")
});

/// Side the judge ruled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Proponent,
    Opposition,
    Tie,
}

impl std::str::FromStr for Winner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "proponent" => Ok(Self::Proponent),
            "opposition" => Ok(Self::Opposition),
            "tie" => Ok(Self::Tie),
            other => Err(format!("unknown winner '{}'", other)),
        }
    }
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proponent => write!(f, "proponent"),
            Self::Opposition => write!(f, "opposition"),
            Self::Tie => write!(f, "tie"),
        }
    }
}

/// How sure the judge claims to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl std::str::FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown confidence '{}'", other)),
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// Total score per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub proponent: u32,
    pub opposition: u32,
}

/// One row of the judge's score table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: String,
    pub proponent: u32,
    pub opposition: u32,
    pub notes: String,
}

/// The judge's final ruling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub winner: Winner,
    pub confidence: Confidence,
    pub scores: Scores,
    /// Per-dimension rows, excluding the total row.
    pub dimensions: Vec<DimensionScore>,
    pub rationale: String,
    pub summary: Option<String>,
    /// Set when the judge output could not be parsed and this is the
    /// default tie.
    pub degraded: bool,
}

impl Verdict {
    /// Default ruling used when the judge output cannot be parsed.
    pub fn fallback(raw: &str) -> Self {
        Self {
            winner: Winner::Tie,
            confidence: Confidence::Low,
            scores: Scores::default(),
            dimensions: Vec::new(),
            rationale: raw.to_string(),
            summary: None,
            degraded: true,
        }
    }

    /// One-line summary, e.g. `proponent wins 31-27 (high confidence)`.
    pub fn headline(&self) -> String {
        let outcome = match self.winner {
            Winner::Tie => "tie".to_string(),
            side => format!("{} wins", side),
        };
        let degraded = if self.degraded { " [degraded]" } else { "" };
        format!(
            "{} {}-{} ({} confidence){}",
            outcome, self.scores.proponent, self.scores.opposition, self.confidence, degraded
        )
    }
}

/// Why the judge output could not be turned into a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerdictParseError {
    #[error("no winner declaration found")]
    MissingWinner,
    #[error("no score table rows found")]
    MissingScores,
}

/// Parse the judge's output into a [`Verdict`].
pub fn parse_verdict(raw: &str) -> Result<Verdict, VerdictParseError> {
    let winner = extract_winner(raw).ok_or(VerdictParseError::MissingWinner)?;
    let (scores, dimensions) = extract_scores(raw).ok_or(VerdictParseError::MissingScores)?;
    let confidence = extract_confidence(raw).unwrap_or_default();
    let rationale = section_body(raw, "Reasoning").unwrap_or_else(|| raw.to_string());
    let summary = section_body(raw, "Summary");

    Ok(Verdict {
        winner,
        confidence,
        scores,
        dimensions,
        rationale,
        summary,
        degraded: false,
    })
}

/// First winner declaration in `text`, trying the explicit form first.
pub fn extract_winner(text: &str) -> Option<Winner> {
    WINNER_PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps[1].parse().ok())
}

/// Stated confidence, if any.
pub fn extract_confidence(text: &str) -> Option<Confidence> {
    CONFIDENCE_PATTERN
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Totals and dimension rows from the score table.
///
/// A `TOTAL` row wins over the sum of the dimension rows.
fn extract_scores(text: &str) -> Option<(Scores, Vec<DimensionScore>)> {
    let mut dimensions = Vec::new();
    let mut total = None;

    for caps in SCORE_ROW_PATTERN.captures_iter(text) {
        let (Some(proponent), Some(opposition)) = (points(&caps[2]), points(&caps[3])) else {
            continue;
        };
        let name = caps[1].trim();
        if name.eq_ignore_ascii_case("total") {
            total = Some(Scores {
                proponent,
                opposition,
            });
            continue;
        }
        dimensions.push(DimensionScore {
            dimension: name.to_string(),
            proponent,
            opposition,
            notes: caps[4].trim().trim_end_matches('|').trim().to_string(),
        });
    }

    let scores = match total {
        Some(scores) => scores,
        None if dimensions.is_empty() => return None,
        None => Scores {
            proponent: dimensions.iter().map(|d| d.proponent).sum(),
            opposition: dimensions.iter().map(|d| d.opposition).sum(),
        },
    };
    Some((scores, dimensions))
}

/// A score cell as whole points; half points round up.
fn points(cell: &str) -> Option<u32> {
    let value: f64 = cell.parse().ok()?;
    (value.is_finite() && value >= 0.0).then(|| value.round() as u32)
}

/// Markdown heading level and title, if `line` is a heading.
fn heading(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with(' ') {
        return None;
    }
    Some((level, rest.trim().trim_matches('*').trim()))
}

/// Body of the section titled `title`, up to the next heading of the same
/// or higher level.
fn section_body(text: &str, title: &str) -> Option<String> {
    let mut level = None;
    let mut body = Vec::new();

    for line in text.lines() {
        match (level, heading(line)) {
            (Some(open), Some((lvl, _))) if lvl <= open => break,
            (None, Some((lvl, name))) if name.eq_ignore_ascii_case(title) => {
                level = Some(lvl);
                continue;
            }
            _ => {}
        }
        if level.is_some() {
            body.push(line);
        }
    }

    let body = body.join("\n").trim().to_string();
    (level.is_some() && !body.is_empty()).then_some(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JUDGE_OUTPUT: &str = "\
## Argument Analysis

### Proponent Strengths
Concrete productivity data.

## Scores

| Dimension | Proponent | Opposition | Notes |
|-----------|-----------|------------|-------|
| Logic | 8/10 | 6/10 | Tighter chain of reasoning |
| Evidence | 7/10 | 7/10 | Both cited studies |
| Rebuttal | 8/10 | 5/10 | Opposition ignored the cost argument |
| Persuasion | 8/10 | 6/10 | |
| **TOTAL** | 31/40 | 24/40 | |

## Verdict

**WINNER: Proponent**
**CONFIDENCE: High**

## Reasoning
The proponent engaged every counterargument.

It also quantified its claims.

## Summary
Evidence beat rhetoric.
";

    #[test]
    fn test_half_point_scores() {
        let raw = "| Logic | 7.5/10 | 6/10 | x |\n\
                   | **TOTAL** | 30.5/40 | 26/40 | |\n\
                   **WINNER: Proponent**";
        let verdict = parse_verdict(raw).unwrap();
        assert_eq!(verdict.winner, Winner::Proponent);
        assert_eq!(
            verdict.scores,
            Scores {
                proponent: 31,
                opposition: 26
            }
        );
        assert_eq!(verdict.dimensions[0].proponent, 8);
        assert!(!verdict.degraded);

        let bold = parse_verdict("| Logic | **8.5**/10 | 6 | |\nwinner: tie").unwrap();
        assert_eq!(bold.scores.proponent, 9);
        assert_eq!(bold.winner, Winner::Tie);
    }

    #[test]
    fn test_parse_full_verdict() {
        let verdict = parse_verdict(JUDGE_OUTPUT).unwrap();
        assert_eq!(verdict.winner, Winner::Proponent);
        assert_eq!(verdict.confidence, Confidence::High);
        assert_eq!(
            verdict.scores,
            Scores {
                proponent: 31,
                opposition: 24
            }
        );
        assert_eq!(verdict.dimensions.len(), 4);
        assert_eq!(verdict.dimensions[0].dimension, "Logic");
        assert_eq!(verdict.dimensions[0].notes, "Tighter chain of reasoning");
        assert_eq!(verdict.dimensions[3].notes, "");
        assert!(verdict.rationale.starts_with("The proponent engaged"));
        assert!(verdict.rationale.ends_with("quantified its claims."));
        assert_eq!(verdict.summary.as_deref(), Some("Evidence beat rhetoric."));
        assert!(!verdict.degraded);
    }

    #[test]
    fn test_scores_summed_without_total_row() {
        let raw = "| Logic | 5/10 | 7/10 | x |\n| Evidence | 4 | 6 | y |\nThe winner is the opposition.";
        let verdict = parse_verdict(raw).unwrap();
        assert_eq!(verdict.winner, Winner::Opposition);
        assert_eq!(verdict.scores.proponent, 9);
        assert_eq!(verdict.scores.opposition, 13);
        assert_eq!(verdict.confidence, Confidence::Medium);
        assert_eq!(verdict.rationale, raw);
        assert!(verdict.summary.is_none());
    }

    #[test]
    fn test_winner_patterns() {
        assert_eq!(extract_winner("Winner: tie"), Some(Winner::Tie));
        assert_eq!(
            extract_winner("**Winner:** Opposition"),
            Some(Winner::Opposition)
        );
        assert_eq!(
            extract_winner("I declare the proponent the winner."),
            Some(Winner::Proponent)
        );
        assert_eq!(
            extract_winner("The winner is Opposition"),
            Some(Winner::Opposition)
        );
        assert_eq!(extract_winner("WINNER: [Proponent/Opposition]"), None);
        assert_eq!(extract_winner("no ruling here"), None);
    }

    #[test]
    fn test_missing_winner_is_error() {
        let raw = "| Logic | 5/10 | 7/10 | x |";
        assert_eq!(parse_verdict(raw), Err(VerdictParseError::MissingWinner));
    }

    #[test]
    fn test_missing_scores_is_error() {
        assert_eq!(
            parse_verdict("WINNER: Proponent"),
            Err(VerdictParseError::MissingScores)
        );
    }

    #[test]
    fn test_fallback_verdict() {
        let verdict = Verdict::fallback("garbled judge text");
        assert_eq!(verdict.winner, Winner::Tie);
        assert_eq!(verdict.scores, Scores::default());
        assert_eq!(verdict.rationale, "garbled judge text");
        assert!(verdict.degraded);
        assert!(verdict.headline().contains("[degraded]"));
    }

    #[test]
    fn test_section_body_stops_at_sibling_heading() {
        let text = "## Reasoning\nline one\n### Detail\nnested\n## Summary\nshort";
        assert_eq!(
            section_body(text, "reasoning").as_deref(),
            Some("line one\n### Detail\nnested")
        );
        assert_eq!(section_body(text, "Summary").as_deref(), Some("short"));
        assert_eq!(section_body(text, "Verdict"), None);
    }

    #[test]
    fn test_headline() {
        let verdict = parse_verdict(JUDGE_OUTPUT).unwrap();
        assert_eq!(verdict.headline(), "proponent wins 31-24 (high confidence)");
    }
}
