use serde::{Deserialize, Serialize};

/// Closed set of supported item formats. The validator and the suggestion
/// heuristics dispatch on this tag instead of inspecting schemas at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Purpose,
    Claim,
    Gist,
    Topic,
    Title,
    BlankFill,
    IrrelevantSentence,
    Summary,
}

impl ItemKind {
    /// Options that name positions in the passage (the circled sentence tags
    /// of an irrelevant-sentence item) must keep their order.
    pub fn options_positional(self) -> bool {
        matches!(self, ItemKind::IrrelevantSentence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionPattern {
    /// The exam prescribes the exact question wording for this type.
    Fixed(&'static str),
    /// The model words the question itself; it only has to be non-empty.
    FreeForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text { min_len: usize, max_len: usize },
    Options,
    Answer,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

/// Everything the pipeline needs to know about one item type: the output
/// field constraints, the prompt template (with a `{{passage}}` marker), and
/// the fixed question wording where the exam prescribes one.
#[derive(Debug, Clone, Copy)]
pub struct ItemSpec {
    pub type_key: &'static str,
    pub kind: ItemKind,
    pub question_pattern: QuestionPattern,
    pub option_count: usize,
    pub fields: &'static [FieldRule],
    pub prompt_template: &'static str,
    pub custom_system_prompt: Option<&'static str>,
    pub prep_hint: &'static str,
}

impl ItemSpec {
    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Inclusive range of accepted answer positions, always `[1, option_count]`.
    pub fn answer_range(&self) -> (usize, usize) {
        (1, self.option_count)
    }
}
