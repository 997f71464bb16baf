/*!
 * Prompt templates for subtitle correction.
 *
 * The user prompt carries the reference excerpt and the cues as single-line
 * JSON payloads under fixed headers, so both the model and the reply parser
 * can find them again.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default system prompt. Placeholder: `{language}`.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You correct automatically transcribed {language} subtitles against a trusted reference transcript.

## Rules
- Each cue keeps its index. Never merge, split, add or drop cues.
- Replace misheard wording with the wording of the reference transcript.
- Keep each cue's text to the part of the reference it was spoken for; do not move words between cues.
- If a cue already matches the reference, return it unchanged.
- Cues listed as context are already final. Do not return them.

## Output
Return ONLY valid JSON of the form {"cues":[{"index":<cue index>,"text":"<corrected text>"}]}, one item per cue to correct, with no text outside the JSON."#;

/// Header preceding the reference excerpt
pub const REFERENCE_HEADER: &str = "## Reference transcript excerpt";

/// Header preceding the read-only context payload
pub const CONTEXT_HEADER: &str = "## Context cues (already final, do not return them)";

/// Header preceding the cues to correct
pub const CUES_HEADER: &str = "## Cues to correct";

/// `12: text` or `#12: text`, with ASCII or full-width colon
static NUMBERED_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*#?(\d+)\s*[:：]\s*(.*?)\s*$").unwrap()
});

/// One cue as exchanged with the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueItem {
    /// Cue index
    #[serde(alias = "cue_index", alias = "id")]
    pub index: usize,
    /// Cue text
    #[serde(alias = "corrected_text", alias = "corrected")]
    pub text: String,
}

/// A list of cues as exchanged with the model
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CuePayload {
    /// Cues in request order
    pub cues: Vec<CueItem>,
}

/// System prompt template
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Render the template for a subtitle language.
    pub fn render(&self, language: &str) -> String {
        self.template.replace("{language}", language)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT)
    }
}

/// Build the user prompt for one batch
pub fn build_user_prompt(reference_excerpt: &str, context: &[CueItem], cues: &[CueItem]) -> String {
    let mut prompt = String::new();
    prompt.push_str(REFERENCE_HEADER);
    prompt.push('\n');
    prompt.push_str(reference_excerpt);
    prompt.push_str("\n\n");

    if !context.is_empty() {
        prompt.push_str(CONTEXT_HEADER);
        prompt.push('\n');
        prompt.push_str(&payload_line(context));
        prompt.push_str("\n\n");
    }

    prompt.push_str(CUES_HEADER);
    prompt.push('\n');
    prompt.push_str(&payload_line(cues));
    prompt.push('\n');
    prompt
}

fn payload_line(cues: &[CueItem]) -> String {
    let payload = CuePayload { cues: cues.to_vec() };
    // Serializing plain strings and integers cannot fail
    serde_json::to_string(&payload).unwrap_or_default()
}

/// Recover the cues-to-correct payload from a user prompt
pub fn extract_cue_payload(prompt: &str) -> Option<CuePayload> {
    let lines: Vec<&str> = prompt.lines().collect();
    let header = lines.iter().rposition(|l| l.trim() == CUES_HEADER)?;
    let payload = lines[header + 1..].iter().find(|l| !l.trim().is_empty())?;
    serde_json::from_str(payload).ok()
}

/// Parse a model reply into cue items
///
/// Accepts a JSON object with a `cues` array or a bare array, optionally in a
/// code fence or surrounded by prose, and falls back to `N: text` lines.
pub fn parse_reply(reply: &str) -> Option<Vec<CueItem>> {
    if let Some(json) = extract_json(reply) {
        if let Ok(payload) = serde_json::from_str::<CuePayload>(json) {
            return Some(payload.cues);
        }
        if let Ok(items) = serde_json::from_str::<Vec<CueItem>>(json) {
            return Some(items);
        }
    }
    parse_numbered_lines(reply)
}

/// Extract JSON from a potentially wrapped response.
fn extract_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();

    // If it starts with { or [, try to parse as-is
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }

    // Look for JSON block in markdown code fence
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let body_start = after.find('\n').map_or(0, |i| i + 1);
        if let Some(end) = after[body_start..].find("```") {
            let json = after[body_start..body_start + end].trim();
            if json.starts_with('{') || json.starts_with('[') {
                return Some(json);
            }
        }
    }

    // Look for first { and last }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            return Some(&trimmed[start..=end]);
        }
    }

    None
}

fn parse_numbered_lines(reply: &str) -> Option<Vec<CueItem>> {
    let items: Vec<CueItem> = reply.lines()
        .filter_map(|line| NUMBERED_LINE_REGEX.captures(line))
        .filter_map(|caps| {
            let index = caps[1].parse().ok()?;
            Some(CueItem { index, text: caps[2].to_string() })
        })
        .collect();

    if items.is_empty() { None } else { Some(items) }
}
