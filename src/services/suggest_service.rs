use crate::models::item::SuggestionCandidate;
use crate::models::spec::ItemKind;
use crate::services::spec_service::SpecRegistry;
use regex::Regex;
use std::sync::{Arc, LazyLock};

static LETTER_OPENING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*(dear|to whom it may concern)\b").unwrap());
static LETTER_CLOSING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(sincerely|best regards|yours truly|kind regards)\b").unwrap()
});

const CONNECTIVES: &[&str] = &[
    "however",
    "therefore",
    "moreover",
    "in contrast",
    "as a result",
    "for example",
    "consequently",
    "furthermore",
    "in other words",
];

const PRESCRIPTIVES: &[&str] = &["should", "must", "need to", "have to", "ought to"];

/// Structural features of a passage, computed once per suggestion request.
#[derive(Debug, Clone)]
pub struct PassageStats {
    pub word_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub has_dialogue: bool,
    pub letter_form: bool,
    pub connective_count: usize,
    pub prescriptive_count: usize,
}

impl PassageStats {
    pub fn from_passage(passage: &str) -> Self {
        let lowered = passage.to_lowercase();
        Self {
            word_count: passage.split_whitespace().count(),
            sentence_count: passage
                .split(['.', '!', '?'])
                .filter(|s| !s.trim().is_empty())
                .count(),
            paragraph_count: passage
                .split("\n\n")
                .filter(|p| !p.trim().is_empty())
                .count()
                .max(1),
            has_dialogue: passage.contains('"') || passage.contains('“'),
            letter_form: LETTER_OPENING.is_match(passage) || LETTER_CLOSING.is_match(passage),
            connective_count: CONNECTIVES.iter().map(|c| lowered.matches(c).count()).sum(),
            prescriptive_count: PRESCRIPTIVES
                .iter()
                .map(|p| lowered.matches(p).count())
                .sum(),
        }
    }
}

#[derive(Clone)]
pub struct SuggestService {
    registry: Arc<SpecRegistry>,
}

impl SuggestService {
    pub fn new(registry: Arc<SpecRegistry>) -> Self {
        Self { registry }
    }

    /// Scores every registered type against the passage and returns all
    /// candidates sorted by descending fit (stable sort, so registry order
    /// breaks ties) plus the `top_k` key prefix.
    pub fn suggest(&self, passage: &str, top_k: usize) -> (Vec<SuggestionCandidate>, Vec<String>) {
        let stats = PassageStats::from_passage(passage);

        let mut candidates: Vec<SuggestionCandidate> = self
            .registry
            .iter()
            .map(|spec| {
                let (fit_score, reason) = fit_for_kind(spec.kind, &stats);
                SuggestionCandidate {
                    type_key: spec.type_key.to_string(),
                    fit_score,
                    reason,
                    prep_hint: spec.prep_hint.to_string(),
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.fit_score
                .partial_cmp(&a.fit_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let top = candidates
            .iter()
            .take(top_k)
            .map(|c| c.type_key.clone())
            .collect();
        (candidates, top)
    }
}

/// 1.0 inside [lo, hi], falling off linearly towards 0.0 outside the band
/// (empty input scores 0.0, double `hi` scores 0.0).
fn band(value: usize, lo: usize, hi: usize) -> f32 {
    let value = value as f32;
    let (lo, hi) = (lo as f32, hi as f32);
    if value >= lo && value <= hi {
        1.0
    } else if value < lo {
        (value / lo).max(0.0)
    } else {
        (1.0 - (value - hi) / hi).max(0.0)
    }
}

fn fit_for_kind(kind: ItemKind, stats: &PassageStats) -> (f32, String) {
    let length_fit = band(stats.word_count, 90, 320);
    let (score, reason) = match kind {
        ItemKind::Purpose => {
            if stats.letter_form {
                (
                    0.9 + 0.1 * length_fit,
                    "passage reads like a letter or notice, the natural home of a purpose item".to_string(),
                )
            } else {
                (
                    0.25 * length_fit,
                    "no letter or announcement framing detected".to_string(),
                )
            }
        }
        ItemKind::Claim => {
            let strength = (stats.prescriptive_count as f32 * 0.18).min(0.55);
            (
                (0.35 + strength) * length_fit,
                format!(
                    "{} prescriptive phrases suggest an arguable stance",
                    stats.prescriptive_count
                ),
            )
        }
        ItemKind::Gist => (
            (0.6 + (stats.connective_count as f32 * 0.04).min(0.25)) * length_fit,
            format!(
                "expository flow with {} connectives supports a single-point gist",
                stats.connective_count
            ),
        ),
        ItemKind::Topic => (
            0.55 * length_fit,
            "topic items fit most expository passages of this length".to_string(),
        ),
        ItemKind::Title => (
            0.5 * length_fit,
            "title items fit most expository passages of this length".to_string(),
        ),
        ItemKind::BlankFill => {
            let dialogue_penalty = if stats.has_dialogue { 0.25 } else { 0.0 };
            (
                (0.8 * band(stats.word_count, 110, 400) - dialogue_penalty).max(0.0),
                format!(
                    "{} words of continuous prose leave room for a reconstructable blank",
                    stats.word_count
                ),
            )
        }
        ItemKind::IrrelevantSentence => {
            if stats.sentence_count >= 6 && stats.paragraph_count == 1 {
                (
                    0.75 + 0.1 * length_fit,
                    format!(
                        "{} sentences in one paragraph can be renumbered with an insertion",
                        stats.sentence_count
                    ),
                )
            } else {
                (
                    0.2,
                    format!(
                        "needs at least six sentences in one paragraph, found {} in {}",
                        stats.sentence_count, stats.paragraph_count
                    ),
                )
            }
        }
        ItemKind::Summary => (
            (0.55 + (stats.connective_count as f32 * 0.05).min(0.2))
                * band(stats.word_count, 100, 350),
            "passage compresses into a one-sentence cause/effect summary".to_string(),
        ),
    };
    (score.clamp(0.0, 1.0), reason)
}
