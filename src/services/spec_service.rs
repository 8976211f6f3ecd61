use crate::error::{Error, Result};
use crate::models::spec::{FieldKind, FieldRule, ItemKind, ItemSpec, QuestionPattern};
use std::collections::HashMap;

/// Lookup table of item-type specifications. Built once at startup, shared
/// read-only afterwards, so request handlers never need a lock around it.
pub struct SpecRegistry {
    specs: Vec<ItemSpec>,
    index: HashMap<&'static str, usize>,
}

impl SpecRegistry {
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in reading-comprehension catalog.
    pub fn with_catalog() -> Self {
        let mut registry = Self::new();
        for spec in catalog() {
            registry
                .register(spec)
                .expect("built-in catalog type keys are unique");
        }
        registry
    }

    pub fn register(&mut self, spec: ItemSpec) -> Result<()> {
        if self.index.contains_key(spec.type_key) {
            return Err(Error::DuplicateSpec(spec.type_key.to_string()));
        }
        self.index.insert(spec.type_key, self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    pub fn get(&self, type_key: &str) -> Result<&ItemSpec> {
        self.index
            .get(type_key)
            .map(|&i| &self.specs[i])
            .ok_or_else(|| Error::SpecNotFound(type_key.to_string()))
    }

    /// Specs in registration order. Suggestion tie-breaking relies on this.
    pub fn iter(&self) -> impl Iterator<Item = &ItemSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for SpecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

const FIELDS_STANDARD: &[FieldRule] = &[
    FieldRule {
        name: "question",
        required: false,
        kind: FieldKind::Text {
            min_len: 5,
            max_len: 200,
        },
    },
    FieldRule {
        name: "passage",
        required: false,
        kind: FieldKind::Text {
            min_len: 40,
            max_len: 8000,
        },
    },
    FieldRule {
        name: "options",
        required: true,
        kind: FieldKind::Options,
    },
    FieldRule {
        name: "correct_answer",
        required: true,
        kind: FieldKind::Answer,
    },
    FieldRule {
        name: "explanation",
        required: false,
        kind: FieldKind::Text {
            min_len: 1,
            max_len: 2000,
        },
    },
];

// Blank-fill and irrelevant-sentence items rewrite the passage, so the model
// must return it.
const FIELDS_TRANSFORMED: &[FieldRule] = &[
    FieldRule {
        name: "question",
        required: false,
        kind: FieldKind::Text {
            min_len: 5,
            max_len: 200,
        },
    },
    FieldRule {
        name: "passage",
        required: true,
        kind: FieldKind::Text {
            min_len: 40,
            max_len: 8000,
        },
    },
    FieldRule {
        name: "options",
        required: true,
        kind: FieldKind::Options,
    },
    FieldRule {
        name: "correct_answer",
        required: true,
        kind: FieldKind::Answer,
    },
    FieldRule {
        name: "explanation",
        required: false,
        kind: FieldKind::Text {
            min_len: 1,
            max_len: 2000,
        },
    },
];

const FIELDS_SUMMARY: &[FieldRule] = &[
    FieldRule {
        name: "question",
        required: false,
        kind: FieldKind::Text {
            min_len: 5,
            max_len: 200,
        },
    },
    FieldRule {
        name: "passage",
        required: false,
        kind: FieldKind::Text {
            min_len: 40,
            max_len: 8000,
        },
    },
    FieldRule {
        name: "summary",
        required: true,
        kind: FieldKind::Text {
            min_len: 20,
            max_len: 600,
        },
    },
    FieldRule {
        name: "options",
        required: true,
        kind: FieldKind::Options,
    },
    FieldRule {
        name: "correct_answer",
        required: true,
        kind: FieldKind::Answer,
    },
    FieldRule {
        name: "explanation",
        required: false,
        kind: FieldKind::Text {
            min_len: 1,
            max_len: 2000,
        },
    },
];

const SHARED_RULES: &str = r#"Rules:
1. Use only the passage between the PASSAGE markers. Do not invent, replace, shorten, or rewrite it.
2. Return a single JSON object exactly in the shape shown above. No markdown fences, no commentary.
3. Exactly 5 options. Exactly one of them is correct; the other four must be plausible but clearly wrong on a careful reading.
4. "correct_answer" is the 1-based position of the correct option, as a digit string ("1".."5"). Vary the position across items; never default to "1".
5. Write "explanation" as one or two sentences grounded in the passage."#;

fn catalog() -> Vec<ItemSpec> {
    vec![
        ItemSpec {
            type_key: "RC18",
            kind: ItemKind::Purpose,
            question_pattern: QuestionPattern::Fixed("다음 글의 목적으로 가장 적절한 것은?"),
            option_count: 5,
            fields: FIELDS_STANDARD,
            prompt_template: r#"Write one multiple-choice question asking for the PURPOSE of the passage (usually a letter, notice, or announcement).

Shape:
{"question": "다음 글의 목적으로 가장 적절한 것은?", "options": ["...", "...", "...", "...", "..."], "correct_answer": "2", "explanation": "..."}

Write the five options in Korean, each a "~하려고" style statement of intent.

PASSAGE (use this text only):
{{passage}}"#,
            custom_system_prompt: None,
            prep_hint: "Identify who is writing to whom and what action the writer wants taken.",
        },
        ItemSpec {
            type_key: "RC20",
            kind: ItemKind::Claim,
            question_pattern: QuestionPattern::Fixed("다음 글에서 필자가 주장하는 바로 가장 적절한 것은?"),
            option_count: 5,
            fields: FIELDS_STANDARD,
            prompt_template: r#"Write one multiple-choice question asking for the writer's CLAIM in the passage.

Shape:
{"question": "다음 글에서 필자가 주장하는 바로 가장 적절한 것은?", "options": ["...", "...", "...", "...", "..."], "correct_answer": "4", "explanation": "..."}

Write the five options in Korean as "~해야 한다" style prescriptive statements.

PASSAGE (use this text only):
{{passage}}"#,
            custom_system_prompt: None,
            prep_hint: "Underline imperative or obligation language; the claim is what the writer says should be done.",
        },
        ItemSpec {
            type_key: "RC22",
            kind: ItemKind::Gist,
            question_pattern: QuestionPattern::Fixed("다음 글의 요지로 가장 적절한 것은?"),
            option_count: 5,
            fields: FIELDS_STANDARD,
            prompt_template: r#"Write one multiple-choice question asking for the GIST of the passage.

Shape:
{"question": "다음 글의 요지로 가장 적절한 것은?", "options": ["...", "...", "...", "...", "..."], "correct_answer": "3", "explanation": "..."}

Write the five options in Korean, each a one-sentence statement of the passage's main point. Wrong options should overstate, narrow, or contradict the passage.

PASSAGE (use this text only):
{{passage}}"#,
            custom_system_prompt: None,
            prep_hint: "State the main point in one sentence before drafting distractors.",
        },
        ItemSpec {
            type_key: "RC23",
            kind: ItemKind::Topic,
            question_pattern: QuestionPattern::Fixed("다음 글의 주제로 가장 적절한 것은?"),
            option_count: 5,
            fields: FIELDS_STANDARD,
            prompt_template: r#"Write one multiple-choice question asking for the TOPIC of the passage.

Shape:
{"question": "다음 글의 주제로 가장 적절한 것은?", "options": ["...", "...", "...", "...", "..."], "correct_answer": "1", "explanation": "..."}

Write the five options in English as noun phrases (e.g. "effects of urban noise on songbirds"). Distractors should name related but off-center topics.

PASSAGE (use this text only):
{{passage}}"#,
            custom_system_prompt: None,
            prep_hint: "Phrase the topic as a noun phrase; distractors come from secondary details.",
        },
        ItemSpec {
            type_key: "RC24",
            kind: ItemKind::Title,
            question_pattern: QuestionPattern::Fixed("다음 글의 제목으로 가장 적절한 것은?"),
            option_count: 5,
            fields: FIELDS_STANDARD,
            prompt_template: r#"Write one multiple-choice question asking for the best TITLE of the passage.

Shape:
{"question": "다음 글의 제목으로 가장 적절한 것은?", "options": ["...", "...", "...", "...", "..."], "correct_answer": "5", "explanation": "..."}

Write the five options in English as headline-style titles. The correct title captures the main idea; distractors are catchy but partial or misleading.

PASSAGE (use this text only):
{{passage}}"#,
            custom_system_prompt: None,
            prep_hint: "A good key title is figurative but anchored to the main idea, not a detail.",
        },
        ItemSpec {
            type_key: "RC31",
            kind: ItemKind::BlankFill,
            question_pattern: QuestionPattern::Fixed(
                "다음 빈칸에 들어갈 말로 가장 적절한 것을 고르시오.",
            ),
            option_count: 5,
            fields: FIELDS_TRANSFORMED,
            prompt_template: r#"Create one blank-fill item from the passage.

Pick one phrase that carries the passage's key reasoning, replace it with a blank written as "______" (exactly one blank in the whole passage), and offer five candidate phrases.

Shape:
{"question": "다음 빈칸에 들어갈 말로 가장 적절한 것을 고르시오.", "passage": "...the passage text with exactly one ______ ...", "options": ["...", "...", "...", "...", "..."], "correct_answer": "2", "explanation": "..."}

The "passage" field must be the supplied passage verbatim except for the single blank. Options are English phrases of similar length and register.

PASSAGE (use this text only):
{{passage}}"#,
            custom_system_prompt: None,
            prep_hint: "Blank a phrase the surrounding logic can reconstruct, not a random detail.",
        },
        ItemSpec {
            type_key: "RC35",
            kind: ItemKind::IrrelevantSentence,
            question_pattern: QuestionPattern::Fixed("다음 글에서 전체 흐름과 관계 없는 문장은?"),
            option_count: 5,
            fields: FIELDS_TRANSFORMED,
            prompt_template: r#"Create one irrelevant-sentence item from the passage.

Keep the passage's opening sentence as an untagged lead-in, then present five consecutive sentences tagged ① ② ③ ④ ⑤. Four must come from the passage in order; insert exactly one new sentence that is on-topic but breaks the flow.

Shape:
{"question": "다음 글에서 전체 흐름과 관계 없는 문장은?", "passage": "Lead-in sentence. ① ... ② ... ③ ... ④ ... ⑤ ...", "options": ["①", "②", "③", "④", "⑤"], "correct_answer": "3", "explanation": "..."}

Each tag ① through ⑤ must appear exactly once in the "passage" field, and "correct_answer" must point at the inserted sentence.

PASSAGE (use this text only):
{{passage}}"#,
            custom_system_prompt: None,
            prep_hint: "The inserted sentence should share vocabulary with the passage but not its line of argument.",
        },
        ItemSpec {
            type_key: "RC40",
            kind: ItemKind::Summary,
            question_pattern: QuestionPattern::Fixed(
                "다음 글의 내용을 한 문장으로 요약하고자 한다. 빈칸 (A), (B)에 들어갈 말로 가장 적절한 것은?",
            ),
            option_count: 5,
            fields: FIELDS_SUMMARY,
            prompt_template: r#"Create one two-blank summary item from the passage.

Write a one-sentence English summary with two blanks, written as "(A)______" and "(B)______", then offer five word pairs.

Shape:
{"question": "다음 글의 내용을 한 문장으로 요약하고자 한다. 빈칸 (A), (B)에 들어갈 말로 가장 적절한 것은?", "summary": "Because ... (A)______ ..., people tend to ... (B)______ ...", "options": ["word - word", "word - word", "word - word", "word - word", "word - word"], "correct_answer": "1", "explanation": "..."}

Each option is "(A)-word - (B)-word" joined with " - ". Exactly one pair completes the summary truthfully.

PASSAGE (use this text only):
{{passage}}"#,
            custom_system_prompt: Some(
                "You are an exam item writer specialized in two-blank summary items. Use only the passage supplied by the user; never invent or rewrite a passage. The summary sentence must compress the whole passage, not a single detail. Respond with a single JSON object and nothing else.",
            ),
            prep_hint: "Draft the full summary sentence first, then blank the two load-bearing words.",
        },
    ]
}

/// Shared hard rules appended to every initial user prompt.
pub fn shared_rules() -> &'static str {
    SHARED_RULES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup_and_unknown_key() {
        let registry = SpecRegistry::with_catalog();
        assert_eq!(registry.len(), 8);
        let spec = registry.get("RC22").unwrap();
        assert_eq!(spec.kind, ItemKind::Gist);
        assert!(matches!(
            registry.get("RC99"),
            Err(Error::SpecNotFound(_))
        ));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = SpecRegistry::with_catalog();
        let dup = *registry.get("RC22").unwrap();
        assert!(matches!(
            registry.register(dup),
            Err(Error::DuplicateSpec(_))
        ));
    }

    #[test]
    fn every_spec_requires_a_bounded_answer() {
        let registry = SpecRegistry::with_catalog();
        for spec in registry.iter() {
            assert_eq!(spec.option_count, 5, "{}", spec.type_key);
            let answer = spec
                .field("correct_answer")
                .unwrap_or_else(|| panic!("{} has no correct_answer rule", spec.type_key));
            assert!(answer.required);
            assert_eq!(answer.kind, FieldKind::Answer);
            assert_eq!(spec.answer_range(), (1, 5));
            let options = spec.field("options").expect("options rule");
            assert!(options.required);
        }
    }

    #[test]
    fn every_template_embeds_the_passage_once() {
        let registry = SpecRegistry::with_catalog();
        for spec in registry.iter() {
            let markers = spec.prompt_template.matches("{{passage}}").count();
            assert_eq!(markers, 1, "{}", spec.type_key);
        }
    }

    #[test]
    fn registration_order_is_stable() {
        let registry = SpecRegistry::with_catalog();
        let keys: Vec<_> = registry.iter().map(|s| s.type_key).collect();
        assert_eq!(
            keys,
            vec!["RC18", "RC20", "RC22", "RC23", "RC24", "RC31", "RC35", "RC40"]
        );
    }
}
