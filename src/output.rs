//! Output types: the analysis record and the tagged per-request outcome.

use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Value used for a text field the model left out.
pub const NOT_AVAILABLE: &str = "Information not available in the pitch deck.";

/// JSON type of a mandatory record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A single string.
    Text,
    /// An ordered list of strings.
    TextList,
}

impl FieldKind {
    /// Human-readable JSON type, used in prompts and parse errors.
    pub fn describe(self) -> &'static str {
        match self {
            FieldKind::Text => "a string",
            FieldKind::TextList => "an array of strings",
        }
    }
}

/// One mandatory key of the analysis schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

/// The analysis schema: requested by the prompt, enforced by the parser.
pub const ANALYSIS_FIELDS: [FieldSpec; 5] = [
    FieldSpec {
        key: "marketSize",
        kind: FieldKind::Text,
        description: "size of the target market (TAM/SAM/SOM) and how it is justified",
    },
    FieldSpec {
        key: "productSummary",
        kind: FieldKind::Text,
        description: "what the product does, for whom, and how it is differentiated",
    },
    FieldSpec {
        key: "teamOverview",
        kind: FieldKind::Text,
        description: "founders and key team members and their relevant experience",
    },
    FieldSpec {
        key: "tractionSummary",
        kind: FieldKind::Text,
        description: "customers, revenue, growth and other evidence of traction",
    },
    FieldSpec {
        key: "redFlags",
        kind: FieldKind::TextList,
        description: "risks, inconsistencies or missing information an investor should question",
    },
];

/// Structured analysis of one pitch deck.
///
/// All five mandatory fields are always populated; keys the model added on
/// its own are kept in [`extra`](Self::extra) and serialized alongside.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    #[serde(rename = "marketSize")]
    pub(crate) market_size: String,
    #[serde(rename = "productSummary")]
    pub(crate) product_summary: String,
    #[serde(rename = "teamOverview")]
    pub(crate) team_overview: String,
    #[serde(rename = "tractionSummary")]
    pub(crate) traction_summary: String,
    #[serde(rename = "redFlags")]
    pub(crate) red_flags: Vec<String>,
    #[serde(flatten)]
    pub(crate) extra: Map<String, Value>,
}

impl AnalysisRecord {
    pub fn market_size(&self) -> &str {
        &self.market_size
    }

    pub fn product_summary(&self) -> &str {
        &self.product_summary
    }

    pub fn team_overview(&self) -> &str {
        &self.team_overview
    }

    pub fn traction_summary(&self) -> &str {
        &self.traction_summary
    }

    pub fn red_flags(&self) -> &[String] {
        &self.red_flags
    }

    /// Keys outside the schema, passed through unchanged.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Text field by its wire name, if it is one of the four text fields.
    pub fn text_field(&self, key: &str) -> Option<&str> {
        match key {
            "marketSize" => Some(&self.market_size),
            "productSummary" => Some(&self.product_summary),
            "teamOverview" => Some(&self.team_overview),
            "tractionSummary" => Some(&self.traction_summary),
            _ => None,
        }
    }
}

/// Facts about a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    /// Length in characters of the normalized text sent to the model.
    pub text_extracted: usize,
    pub timestamp: DateTime<Utc>,
}

/// Raw and sanitized model reply, attached to parse failures only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub raw_response: String,
    pub cleaned_response: String,
}

/// A failed run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFailure {
    pub kind: ErrorKind,
    pub message: String,
    pub debug: Option<DebugInfo>,
}

impl AnalysisFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            debug: None,
        }
    }
}

/// Result of one analysis request: exactly one variant is populated.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Success {
        record: AnalysisRecord,
        metadata: AnalysisMetadata,
    },
    Failure(AnalysisFailure),
}

impl AnalysisOutcome {
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        AnalysisOutcome::Failure(AnalysisFailure::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Success { .. })
    }

    pub fn as_failure(&self) -> Option<&AnalysisFailure> {
        match self {
            AnalysisOutcome::Success { .. } => None,
            AnalysisOutcome::Failure(f) => Some(f),
        }
    }

    /// Error kind of a failed outcome.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            AnalysisOutcome::Success { .. } => None,
            AnalysisOutcome::Failure(f) => Some(f.kind),
        }
    }

    /// HTTP status code for this outcome.
    pub fn http_status(&self) -> u16 {
        match self {
            AnalysisOutcome::Success { .. } => 200,
            AnalysisOutcome::Failure(f) => f.kind.http_status(),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum ResponseBody<'a> {
    Success {
        success: bool,
        analysis: &'a AnalysisRecord,
        metadata: &'a AnalysisMetadata,
    },
    Failure {
        success: bool,
        error: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        debug: Option<&'a DebugInfo>,
    },
}

/// Serializes to the endpoint's response body:
/// `{success, analysis, metadata}` or `{success, error, debug?}`.
impl Serialize for AnalysisOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let body = match self {
            AnalysisOutcome::Success { record, metadata } => ResponseBody::Success {
                success: true,
                analysis: record,
                metadata,
            },
            AnalysisOutcome::Failure(f) => ResponseBody::Failure {
                success: false,
                error: &f.message,
                debug: f.debug.as_ref(),
            },
        };
        body.serialize(serializer)
    }
}
