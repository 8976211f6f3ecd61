use regex::Regex;
use std::sync::LazyLock;

/// Phrases typical of a model that dropped the supplied passage and invented
/// its own instead of answering with the item JSON.
static FABRICATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // "Here is a passage ...", "Here's another passage ..."
        Regex::new(r"(?im)^\s*here('s| is) (a|an|another|the) (new |short |revised )?passage")
            .unwrap(),
        Regex::new(r"(?i)\bnew passage\b").unwrap(),
        Regex::new(r"(?im)^\s*consider the following (text|passage|paragraph)").unwrap(),
        // A lone "Passage:" heading line
        Regex::new(r"(?m)^\s*Passage:\s*$").unwrap(),
        Regex::new(r"(?im)^\s*i('ve| have) (written|created|composed) (a|the) passage").unwrap(),
    ]
});

/// Heuristic check that the response is built on the supplied passage rather
/// than a fabricated one. False negatives are tolerated; a false positive
/// only costs one repair cycle.
pub fn looks_fabricated(response_text: &str) -> bool {
    FABRICATION_PATTERNS
        .iter()
        .any(|p| p.is_match(response_text))
}
