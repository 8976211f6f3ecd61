use crate::models::item::ExamItem;
use crate::models::spec::{FieldKind, ItemKind, ItemSpec, QuestionPattern};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

static BLANK_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{4,}").unwrap());
static SUMMARY_SLOT_A: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(A\)_{2,}").unwrap());
static SUMMARY_SLOT_B: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(B\)_{2,}").unwrap());

const SENTENCE_TAGS: [char; 5] = ['①', '②', '③', '④', '⑤'];

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug)]
pub enum ValidationResult {
    Valid(ExamItem),
    Invalid(Vec<FieldError>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }
}

/// Maps an accepted answer encoding (digit "1".."5", circled glyph ①–⑤, or
/// letter A–E, as string or integer) to the canonical digit string.
/// Out-of-range and unrecognized values are rejected, never defaulted.
pub fn normalize_answer(raw: &Value, option_count: usize) -> Result<String, String> {
    let position = match raw {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| format!("expected an integer position, got {}", n))?
            as usize,
        Value::String(s) => {
            let s = s.trim();
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => match c {
                    '1'..='9' => c as usize - '0' as usize,
                    '①'..='⑨' => c as usize - '①' as usize + 1,
                    'A'..='I' => c as usize - 'A' as usize + 1,
                    'a'..='i' => c as usize - 'a' as usize + 1,
                    _ => return Err(format!("unrecognized answer encoding {:?}", s)),
                },
                _ => s
                    .parse::<usize>()
                    .map_err(|_| format!("unrecognized answer encoding {:?}", s))?,
            }
        }
        other => return Err(format!("expected a string or integer, got {}", other)),
    };

    if position < 1 || position > option_count {
        return Err(format!(
            "answer position {} is outside 1..={}",
            position, option_count
        ));
    }
    Ok(position.to_string())
}

/// Validates a parsed model response against the spec's field table and the
/// kind-specific structural rules, returning either the normalized item or
/// the full list of field-level errors so a repair prompt can cite them.
pub fn validate(spec: &ItemSpec, source_passage: &str, candidate: &Value) -> ValidationResult {
    let Some(object) = candidate.as_object() else {
        return ValidationResult::Invalid(vec![FieldError::new(
            "response",
            "expected a single JSON object",
        )]);
    };

    let mut errors: Vec<FieldError> = Vec::new();
    let mut options: Vec<String> = Vec::new();
    let mut correct_answer: Option<String> = None;

    for rule in spec.fields {
        let value = object.get(rule.name);
        let Some(value) = value else {
            if rule.required {
                errors.push(FieldError::new(rule.name, "missing required field"));
            }
            continue;
        };
        if value.is_null() {
            if rule.required {
                errors.push(FieldError::new(rule.name, "missing required field"));
            }
            continue;
        }

        match rule.kind {
            FieldKind::Text { min_len, max_len } => match value.as_str() {
                Some(text) => {
                    let chars = text.chars().count();
                    if chars < min_len || chars > max_len {
                        errors.push(FieldError::new(
                            rule.name,
                            format!(
                                "length {} is outside {}..={} characters",
                                chars, min_len, max_len
                            ),
                        ));
                    }
                }
                None => errors.push(FieldError::new(rule.name, "expected a string")),
            },
            FieldKind::Options => match value.as_array() {
                Some(raw_options) => {
                    if raw_options.len() != spec.option_count {
                        errors.push(FieldError::new(
                            rule.name,
                            format!(
                                "expected exactly {} options, got {}",
                                spec.option_count,
                                raw_options.len()
                            ),
                        ));
                    }
                    for (i, raw) in raw_options.iter().enumerate() {
                        match raw.as_str() {
                            Some(text) if !text.trim().is_empty() => {
                                options.push(text.trim().to_string());
                            }
                            _ => errors.push(FieldError::new(
                                rule.name,
                                format!("option {} must be a non-empty string", i + 1),
                            )),
                        }
                    }
                }
                None => errors.push(FieldError::new(rule.name, "expected an array of strings")),
            },
            FieldKind::Answer => match normalize_answer(value, spec.option_count) {
                Ok(canonical) => correct_answer = Some(canonical),
                Err(message) => errors.push(FieldError::new(rule.name, message)),
            },
        }
    }

    check_kind_rules(spec, object, &options, &mut errors);

    if !errors.is_empty() {
        return ValidationResult::Invalid(errors);
    }

    let question = match spec.question_pattern {
        // The exam prescribes the wording; the model's phrasing is not trusted.
        QuestionPattern::Fixed(pattern) => pattern.to_string(),
        QuestionPattern::FreeForm => match object.get("question").and_then(Value::as_str) {
            Some(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => {
                return ValidationResult::Invalid(vec![FieldError::new(
                    "question",
                    "missing required field",
                )])
            }
        },
    };

    let passage = object
        .get("passage")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| source_passage.to_string());

    let item = ExamItem {
        item_type: spec.type_key.to_string(),
        question,
        passage,
        options,
        correct_answer: correct_answer.expect("field tables always carry a correct_answer rule"),
        explanation: object
            .get("explanation")
            .and_then(Value::as_str)
            .map(str::to_string),
        summary: object
            .get("summary")
            .and_then(Value::as_str)
            .map(str::to_string),
    };
    ValidationResult::Valid(item)
}

fn check_kind_rules(
    spec: &ItemSpec,
    object: &serde_json::Map<String, Value>,
    options: &[String],
    errors: &mut Vec<FieldError>,
) {
    match spec.kind {
        ItemKind::BlankFill => {
            if let Some(passage) = object.get("passage").and_then(Value::as_str) {
                let blanks = BLANK_MARKER.find_iter(passage).count();
                if blanks != 1 {
                    errors.push(FieldError::new(
                        "passage",
                        format!("expected exactly one blank marker \"______\", found {}", blanks),
                    ));
                }
            }
        }
        ItemKind::Summary => {
            if let Some(summary) = object.get("summary").and_then(Value::as_str) {
                if !SUMMARY_SLOT_A.is_match(summary) || !SUMMARY_SLOT_B.is_match(summary) {
                    errors.push(FieldError::new(
                        "summary",
                        "must contain both blanks written as \"(A)____\" and \"(B)____\"",
                    ));
                }
            }
            for (i, option) in options.iter().enumerate() {
                if !option.contains(" - ") {
                    errors.push(FieldError::new(
                        "options",
                        format!("option {} must be a pair joined with \" - \"", i + 1),
                    ));
                }
            }
        }
        ItemKind::IrrelevantSentence => {
            if let Some(passage) = object.get("passage").and_then(Value::as_str) {
                for tag in SENTENCE_TAGS {
                    let count = passage.matches(tag).count();
                    if count != 1 {
                        errors.push(FieldError::new(
                            "passage",
                            format!("sentence tag {} must appear exactly once, found {}", tag, count),
                        ));
                    }
                }
            }
            if options.len() == spec.option_count {
                let expected: Vec<String> =
                    SENTENCE_TAGS.iter().map(|t| t.to_string()).collect();
                if options != expected {
                    errors.push(FieldError::new(
                        "options",
                        "options must be the sentence tags ① ② ③ ④ ⑤ in order",
                    ));
                }
            }
        }
        _ => {}
    }
}
