//! Prompt construction for pitch-deck analysis.
//!
//! The JSON skeleton and key descriptions are generated from
//! [`ANALYSIS_FIELDS`], the same table
//! [`parse_record`](crate::pipeline::sanitize::parse_record) validates
//! against, so the requested and the accepted schema cannot drift apart.

use crate::output::{FieldKind, ANALYSIS_FIELDS};
use crate::pipeline::extract::ExtractedText;

/// Opening instruction of every analysis prompt.
pub const ANALYST_PREAMBLE: &str = "You are a startup analyst. Analyze the following pitch deck and \
return ONLY a valid JSON object with no additional text, markdown, or formatting. \
Do not wrap the object in code fences. The JSON should have these exact keys:";

/// Instruction for sections the deck does not cover.
pub const MISSING_SECTION_RULE: &str = "If any section is not available, state that clearly in the \
corresponding field instead of omitting the key. Use an empty array for redFlags only if you \
found no risks at all.";

/// Build the analysis prompt for the given deck text.
pub fn build_analysis_prompt(text: &ExtractedText) -> String {
    format!(
        "{ANALYST_PREAMBLE}\n\n{skeleton}\n\nWhere:\n{semantics}\n\n{MISSING_SECTION_RULE}\n\n\
Pitch Deck Content:\n\"\"\"\n{content}\n\"\"\"",
        skeleton = json_skeleton(),
        semantics = key_semantics(),
        content = text.as_str(),
    )
}

/// `{ "marketSize": "...", ..., "redFlags": ["..."] }`, one key per line.
fn json_skeleton() -> String {
    let lines: Vec<String> = ANALYSIS_FIELDS
        .iter()
        .map(|f| match f.kind {
            FieldKind::Text => format!("  \"{}\": \"...\"", f.key),
            FieldKind::TextList => format!("  \"{}\": [\"...\"]", f.key),
        })
        .collect();
    format!("{{\n{}\n}}", lines.join(",\n"))
}

fn key_semantics() -> String {
    ANALYSIS_FIELDS
        .iter()
        .map(|f| format!("- {} ({}): {}", f.key, f.kind.describe(), f.description))
        .collect::<Vec<_>>()
        .join("\n")
}
