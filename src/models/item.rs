use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One validated, normalized exam item as returned to callers.
///
/// `correct_answer` is always the canonical digit string "1".."5"; every
/// accepted input encoding (digit, circled glyph, letter) has been mapped to
/// it before an item leaves the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamItem {
    pub item_type: String,
    pub question: String,
    pub passage: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Parse,
    Fidelity,
    Schema,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub kind: FailureKind,
    pub message: String,
}

/// The caller-facing result for one (passage, item type) generation request.
///
/// `ok == true` guarantees `item` is present and passed both the fidelity
/// guard and the schema validator; `ok == false` carries the failure of
/// record after the attempt budget ran out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationEnvelope {
    pub ok: bool,
    pub item_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ExamItem>,
    pub attempts_used: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeError>,
    pub generated_at: DateTime<Utc>,
}

impl GenerationEnvelope {
    pub fn success(item_type: &str, item: ExamItem, attempts_used: u32) -> Self {
        Self {
            ok: true,
            item_type: item_type.to_string(),
            item: Some(item),
            attempts_used,
            error: None,
            generated_at: Utc::now(),
        }
    }

    pub fn failure(
        item_type: &str,
        attempts_used: u32,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            ok: false,
            item_type: item_type.to_string(),
            item: None,
            attempts_used,
            error: Some(EnvelopeError {
                kind,
                message: message.into(),
            }),
            generated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionCandidate {
    pub type_key: String,
    pub fit_score: f32,
    pub reason: String,
    pub prep_hint: String,
}
