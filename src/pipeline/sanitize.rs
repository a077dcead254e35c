//! Response sanitizing: turn a model's free-text reply into an
//! [`AnalysisRecord`].
//!
//! Models asked for "only JSON" still wrap it in ```` ```json ```` fences or
//! add a friendly sentence before and after the object. [`sanitize`] removes
//! the fences and keeps the span from the first `{` to the last `}`;
//! [`parse_record`] parses that span once and backfills missing keys.
//!
//! ## Known limitation
//!
//! The brace slice is a heuristic, not a balanced, string-literal-aware scan.
//! A reply with a stray `}` in trailing prose, or braces inside red-flag text
//! that end up outside the real object, is not repaired; it surfaces as a
//! [`ParseError`] with the raw and cleaned text attached.

use crate::error::{ParseError, ParseFailure};
use crate::output::{AnalysisRecord, FieldKind, NOT_AVAILABLE};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Opening or closing code fence, with an optional language tag and the
/// whitespace that follows it.
static RE_CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[A-Za-z0-9_+-]*\s*").unwrap());

/// Strip formatting noise from a model reply and isolate the JSON object.
///
/// Pure and total. Idempotent on its own output.
pub fn sanitize(raw: &str) -> String {
    let stripped = RE_CODE_FENCE.replace_all(raw, "");
    let sliced = match (stripped.find('{'), stripped.rfind('}')) {
        (Some(open), Some(close)) if close > open => &stripped[open..=close],
        _ => &stripped[..],
    };
    sliced.trim().to_string()
}

/// Parse a model reply into a record, backfilling missing mandatory keys.
///
/// One pass, no retry. On failure the error carries `raw` and the sanitized
/// text for diagnosis.
pub fn parse_record(raw: &str) -> Result<AnalysisRecord, ParseError> {
    let cleaned = sanitize(raw);
    debug!(
        "Sanitized reply: {} → {} bytes",
        raw.len(),
        cleaned.len()
    );

    match record_from_json(&cleaned) {
        Ok(record) => Ok(record),
        Err(reason) => {
            warn!("Model reply rejected ({}); raw reply: {:?}", reason, raw);
            Err(ParseError {
                raw: raw.to_string(),
                cleaned,
                reason,
            })
        }
    }
}

fn record_from_json(cleaned: &str) -> Result<AnalysisRecord, ParseFailure> {
    let value: Value =
        serde_json::from_str(cleaned).map_err(|e| ParseFailure::InvalidJson(e.to_string()))?;
    let Value::Object(mut map) = value else {
        return Err(ParseFailure::NotAnObject);
    };

    let market_size = take_text(&mut map, "marketSize")?;
    let product_summary = take_text(&mut map, "productSummary")?;
    let team_overview = take_text(&mut map, "teamOverview")?;
    let traction_summary = take_text(&mut map, "tractionSummary")?;
    let red_flags = take_text_list(&mut map, "redFlags")?;

    Ok(AnalysisRecord {
        market_size,
        product_summary,
        team_overview,
        traction_summary,
        red_flags,
        extra: map,
    })
}

// An explicit `null` counts as missing and is backfilled like an absent key.

fn take_text(map: &mut Map<String, Value>, key: &'static str) -> Result<String, ParseFailure> {
    match map.remove(key) {
        None | Some(Value::Null) => {
            debug!("Backfilling missing key '{}'", key);
            Ok(NOT_AVAILABLE.to_string())
        }
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ParseFailure::WrongType {
            key,
            expected: FieldKind::Text.describe(),
        }),
    }
}

fn take_text_list(
    map: &mut Map<String, Value>,
    key: &'static str,
) -> Result<Vec<String>, ParseFailure> {
    let wrong_type = || ParseFailure::WrongType {
        key,
        expected: FieldKind::TextList.describe(),
    };
    match map.remove(key) {
        None | Some(Value::Null) => {
            debug!("Backfilling missing key '{}'", key);
            Ok(Vec::new())
        }
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(wrong_type()),
            })
            .collect(),
        Some(_) => Err(wrong_type()),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
