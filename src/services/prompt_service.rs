use crate::error::{Error, Result};
use crate::models::spec::ItemSpec;
use crate::services::spec_service;
use crate::services::validation_service::FieldError;

pub const PASSAGE_MARKER: &str = "{{passage}}";

const DEFAULT_SYSTEM_PROMPT: &str = "You are an exam item writer for reading-comprehension tests. \
You must work only with the passage supplied by the user: never invent, replace, shorten, or rewrite a passage. \
Respond with a single JSON object in exactly the requested shape. \
Do not add commentary, markdown fences, or any text outside the JSON object.";

/// Why the previous attempt was rejected; drives the wording of the repair
/// prompt.
#[derive(Debug, Clone)]
pub enum RepairReason {
    FabricatedPassage,
    InvalidJson(String),
    FieldErrors(Vec<FieldError>),
}

/// Builds (system_prompt, user_prompt) for the first attempt. The passage
/// replaces the template marker; a template without a marker gets the passage
/// appended as a clearly delimited block so the model cannot mistake it for
/// conversation. More than one marker is a configuration defect.
pub fn build_initial_prompt(
    spec: &ItemSpec,
    passage: &str,
    difficulty: Option<&str>,
) -> Result<(String, String)> {
    let markers = spec.prompt_template.matches(PASSAGE_MARKER).count();
    let mut user_prompt = match markers {
        0 => {
            let mut prompt = spec.prompt_template.to_string();
            if !passage.is_empty() {
                prompt.push_str("\n\nPASSAGE (use this text only):\n<<<\n");
                prompt.push_str(passage);
                prompt.push_str("\n>>>");
            }
            prompt
        }
        1 => spec.prompt_template.replace(PASSAGE_MARKER, passage),
        n => {
            return Err(Error::PromptBuild {
                type_key: spec.type_key.to_string(),
                reason: format!("template contains {} passage markers, expected at most one", n),
            })
        }
    };

    user_prompt.push_str("\n\n");
    user_prompt.push_str(spec_service::shared_rules());

    if let Some(difficulty) = difficulty {
        user_prompt.push_str(&format!(
            "\n\nDifficulty hint: target {} difficulty for the intended test-taker. This hint never excuses breaking a rule above.",
            difficulty
        ));
    }

    let system_prompt = spec
        .custom_system_prompt
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
        .to_string();

    Ok((system_prompt, user_prompt))
}

/// Builds the stricter follow-up prompt after a rejected attempt. It names
/// the specific violation, re-embeds the original passage verbatim, and
/// restates the output contract as hard rules. It is never weaker than the
/// initial prompt.
pub fn build_repair_prompt(spec: &ItemSpec, passage: &str, reason: &RepairReason) -> String {
    let mut prompt = String::from(
        "Your previous answer was rejected. Produce a corrected answer for the same request.\n\nWhat was wrong:\n",
    );
    match reason {
        RepairReason::FabricatedPassage => {
            prompt.push_str(
                "- You ignored the supplied passage and produced a new or restated passage.\n",
            );
        }
        RepairReason::InvalidJson(message) => {
            prompt.push_str(&format!("- The response was not a valid JSON object: {}\n", message));
        }
        RepairReason::FieldErrors(errors) => {
            for error in errors {
                prompt.push_str(&format!("- {}\n", error));
            }
        }
    }

    prompt.push_str(&format!(
        "\nHard rules for this retry:\n\
         1. Use ONLY the passage between the <<< >>> markers below. Do not invent, replace, shorten, or rewrite it.\n\
         2. Return ONLY a single JSON object in the shape required for item type {}. No prose, no markdown fence, no leading text.\n\
         3. Provide exactly {} options and a \"correct_answer\" that is a digit string between \"1\" and \"{}\".\n\
         4. Fix every problem listed above; everything that was already correct must stay correct.\n",
        spec.type_key, spec.option_count, spec.option_count
    ));

    prompt.push_str("\nPASSAGE (verbatim, use this and nothing else):\n<<<\n");
    prompt.push_str(passage);
    prompt.push_str("\n>>>");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::spec::{FieldKind, FieldRule, ItemKind, QuestionPattern};
    use crate::services::spec_service::SpecRegistry;

    const FIELDS: &[FieldRule] = &[
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
    ];

    fn spec_with_template(template: &'static str) -> ItemSpec {
        ItemSpec {
            type_key: "TST1",
            kind: ItemKind::Gist,
            question_pattern: QuestionPattern::Fixed("?"),
            option_count: 5,
            fields: FIELDS,
            prompt_template: template,
            custom_system_prompt: None,
            prep_hint: "",
        }
    }

    #[test]
    fn marker_is_substituted() {
        let spec = spec_with_template("Make an item.\n{{passage}}");
        let (system, user) = build_initial_prompt(&spec, "The tide rises.", None).unwrap();
        assert!(user.contains("The tide rises."));
        assert!(!user.contains(PASSAGE_MARKER));
        assert!(system.contains("never invent"));
    }

    #[test]
    fn markerless_template_gets_a_delimited_block() {
        let spec = spec_with_template("Make an item.");
        let (_, user) = build_initial_prompt(&spec, "The tide rises.", None).unwrap();
        assert!(user.contains("PASSAGE (use this text only):"));
        assert!(user.contains("<<<\nThe tide rises.\n>>>"));
    }

    #[test]
    fn duplicate_markers_are_a_configuration_defect() {
        let spec = spec_with_template("{{passage}} and again {{passage}}");
        assert!(matches!(
            build_initial_prompt(&spec, "text", None),
            Err(Error::PromptBuild { .. })
        ));
    }

    #[test]
    fn difficulty_hint_is_advisory_and_appended() {
        let spec = spec_with_template("Make an item.\n{{passage}}");
        let (_, user) = build_initial_prompt(&spec, "The tide rises.", Some("advanced")).unwrap();
        assert!(user.contains("Difficulty hint: target advanced difficulty"));
    }

    #[test]
    fn repair_prompt_cites_errors_and_reembeds_the_passage() {
        let registry = SpecRegistry::with_catalog();
        let spec = registry.get("RC31").unwrap();
        let errors = vec![FieldError {
            field: "passage".to_string(),
            message: "expected exactly one blank marker \"______\", found 0".to_string(),
        }];
        let prompt =
            build_repair_prompt(spec, "The tide rises.", &RepairReason::FieldErrors(errors));
        assert!(prompt.contains("passage: expected exactly one blank marker"));
        assert!(prompt.contains("<<<\nThe tide rises.\n>>>"));
        assert!(prompt.contains("Return ONLY a single JSON object"));
        assert!(prompt.contains("between \"1\" and \"5\""));
    }

    #[test]
    fn custom_system_prompt_overrides_the_default() {
        let registry = SpecRegistry::with_catalog();
        let spec = registry.get("RC40").unwrap();
        let (system, _) = build_initial_prompt(spec, "The tide rises over the flats.", None).unwrap();
        assert!(system.contains("two-blank summary"));
    }
}
