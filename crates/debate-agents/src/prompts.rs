//! Default debate personas.
//!
//! Each prompt is a fixed persona block (role, instructions, constraints,
//! required output headings) followed by the run context for the current
//! step. The headings requested here are the ones listed by
//! `StructureMarkers::standard()`.

use coordination::debate::{Phase, PromptContext, PromptRenderer, Role, Speaker, TurnRecord};

/// How much of a previous own turn is repeated back as "do not repeat" context.
const PRIOR_TURN_PREVIEW_CHARS: usize = 200;
/// How many previous own turns are shown.
const PRIOR_TURNS_SHOWN: usize = 2;

const PROPONENT_PERSONA: &str = r#"## ROLE
You are a skilled debater arguing **IN FAVOR** of the proposition. You reason
rigorously, rely on evidence, and argue to win.

## INSTRUCTIONS
1. Make compelling arguments backed by specific evidence, examples, or data
2. Build on your earlier turns instead of restating them
3. When the opposition has spoken, attack its weakest points directly
4. Lead with your most impactful argument

## CONSTRAINTS
- Do NOT repeat your previous arguments verbatim
- Do NOT concede or compliment the opposition
- Do NOT drift from the proposition
- Do NOT exceed {max_words} words

## OUTPUT FORMAT
Use exactly these headings:

## Main Argument
[Your central claim with evidence]

## Supporting Evidence
[Two or three specific facts, examples, or lines of reasoning]

## Rebuttal
[Only when responding to the opposition: the flaw in its strongest point]

## Key Takeaway
[One sentence on why your side wins]
"#;

const OPPOSITION_PERSONA: &str = r#"## ROLE
You are a skilled debater arguing **AGAINST** the proposition. You find
fallacies, weak evidence, and gaps in reasoning, and argue to win.

## INSTRUCTIONS
1. Attack the proponent's latest argument directly
2. Offer strong counterarguments with specific examples or data
3. Build on your earlier turns instead of restating them
4. Present a convincing alternative view

## CONSTRAINTS
- Do NOT repeat your previous arguments verbatim
- Do NOT concede points or look for middle ground
- Do NOT drift from the proposition
- Do NOT exceed {max_words} words

## OUTPUT FORMAT
Use exactly these headings:

## Counter-Argument
[Your main attack on the proponent's position]

## Critical Analysis
[Two or three specific flaws in the proponent's reasoning or evidence]

## Alternative Perspective
[Why the opposite position is stronger]

## Key Takeaway
[One sentence on why the opposition wins]
"#;

const JUDGE_PERSONA: &str = r#"## ROLE
You are an impartial **JUDGE** of a formal debate. Rule on the quality of
the arguments, never on your own view of the topic.

## INSTRUCTIONS
1. Evaluate both sides on logic, evidence, rebuttal, and persuasion (1-10 each)
2. Name the strongest and weakest arguments on each side
3. Penalize ignored counterarguments, repetition, and fallacies
4. Declare a tie only if the sides are genuinely equal

## CONSTRAINTS
- Keep the whole ruling under {max_words} words
- Keep each analysis subsection to a few bullet points
- Always finish with the Verdict, Reasoning and Summary sections

## OUTPUT FORMAT
Use exactly these headings and formats:

## Argument Analysis
### Proponent Strengths
### Proponent Weaknesses
### Opposition Strengths
### Opposition Weaknesses

## Scores

| Dimension | Proponent | Opposition | Notes |
|-----------|-----------|------------|-------|
| Logic | X/10 | X/10 | [justification] |
| Evidence | X/10 | X/10 | [justification] |
| Rebuttal | X/10 | X/10 | [justification] |
| Persuasion | X/10 | X/10 | [justification] |
| **TOTAL** | XX/40 | XX/40 | |

## Verdict

**WINNER: [Proponent/Opposition/Tie]**
**CONFIDENCE: [High/Medium/Low]**

## Reasoning
[Three to five sentences citing specific arguments]

## Summary
[One sentence capturing the verdict]
"#;

/// The bundled Proponent / Opposition / Judge templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateRenderer;

impl TemplateRenderer {
    fn debater(&self, ctx: &PromptContext<'_>, persona: &str) -> String {
        let mut parts = vec![
            format!("# DEBATE TOPIC\n{}\n", ctx.topic),
            format!("# CURRENT PHASE: {}", ctx.phase.to_string().to_uppercase()),
        ];

        if ctx.phase == Phase::Rebuttal {
            parts.push(format!("\n## Round {} of {}\n", ctx.round, ctx.max_rounds));
        }

        if let Some(last) = ctx.last_opponent_turn() {
            let opponent = match ctx.role {
                Role::Proponent => "Opposition",
                _ => "Proponent",
            };
            parts.push(format!("\n## {}'s Last Argument\n{}\n", opponent, last.content()));
        }

        parts.push(format!("\n## Your Task\n{}\n", task(ctx.role, ctx.phase)));

        let own: Vec<&TurnRecord> = ctx.own_turns().collect();
        if !own.is_empty() {
            parts.push("## Your Prior Arguments (for reference, DO NOT REPEAT)\n".to_string());
            for turn in own.iter().skip(own.len().saturating_sub(PRIOR_TURNS_SHOWN)) {
                parts.push(format!(
                    "[Your {}]: {}...\n",
                    turn.phase(),
                    preview(turn.content())
                ));
            }
        }

        let persona = persona.replace("{max_words}", &ctx.max_words.to_string());
        format!("{}\n\n---\n\n{}", persona, parts.join("\n"))
    }

    fn judge(&self, ctx: &PromptContext<'_>) -> String {
        let mut parts = vec![
            format!("# DEBATE TOPIC\n**{}**\n", ctx.topic),
            "# COMPLETE DEBATE TRANSCRIPT\n".to_string(),
        ];
        for labeled in ctx.transcript.iter().filter(|t| t.speaker == Speaker::Other) {
            let turn = labeled.turn;
            let mut header = format!(
                "## {} - {}",
                turn.role().to_string().to_uppercase(),
                turn.phase().to_string().to_uppercase()
            );
            if turn.phase() == Phase::Rebuttal {
                header.push_str(&format!(" (Round {})", turn.round_number()));
            }
            parts.push(format!("{}\n{}\n", header, turn.content()));
        }
        parts.push(
            "\n---\n\n## Your Task\nAnalyze the debate above and render your verdict in the \
             required format.\n"
                .to_string(),
        );
        let persona = JUDGE_PERSONA.replace("{max_words}", &ctx.max_words.to_string());
        format!("{}\n\n---\n\n{}", persona, parts.join("\n"))
    }
}

impl PromptRenderer for TemplateRenderer {
    fn render(&self, ctx: &PromptContext<'_>) -> String {
        match ctx.role {
            Role::Proponent => self.debater(ctx, PROPONENT_PERSONA),
            Role::Opposition => self.debater(ctx, OPPOSITION_PERSONA),
            Role::Judge => self.judge(ctx),
        }
    }
}

fn task(role: Role, phase: Phase) -> &'static str {
    match (role, phase) {
        (Role::Proponent, Phase::Opening) => "Present your opening argument FOR the proposition.",
        (Role::Opposition, Phase::Opening) => {
            "Present your opening argument AGAINST the proposition, responding to the proponent."
        }
        (Role::Proponent, Phase::Rebuttal) => {
            "Rebut the opposition's arguments and strengthen your case."
        }
        (Role::Opposition, Phase::Rebuttal) => {
            "Rebut the proponent's arguments and strengthen your case."
        }
        (Role::Proponent, _) => {
            "Deliver your closing statement: your strongest points and a final appeal."
        }
        _ => "Deliver your closing statement: your strongest attacks and a final appeal.",
    }
}

fn preview(content: &str) -> &str {
    match content.char_indices().nth(PRIOR_TURN_PREVIEW_CHARS) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}
