//! Sentence-level structural checks

use super::{Finding, RuleCategory, Severity};

const INTENSIFIERS: &[&str] = &[
    "very",
    "really",
    "extremely",
    "incredibly",
    "truly",
    "absolutely",
    "totally",
    "utterly",
];

/// Words ending in "ly" that are not adverbs.
const NOT_ADVERBS: &[&str] = &[
    "only", "family", "early", "daily", "july", "italy", "holy", "reply", "supply", "apply",
    "belly", "ugly", "lonely", "friendly", "lovely", "silly", "jelly", "rally", "ally", "fly",
    "bully", "curly", "hilly", "likely", "elderly", "assembly", "anomaly", "monopoly",
];

#[derive(Debug, Clone)]
pub struct StructureLimits {
    /// Consecutive sentences opening with the same word before flagging.
    pub repeated_opening_run: usize,
    /// Sentences required before rhythm is judged.
    pub min_sentences_for_rhythm: usize,
    /// Word-count spread at or below which sentence rhythm is monotonous.
    pub max_length_spread: usize,
    /// Words required before the descriptive-word ratio is judged.
    pub min_words_for_ratio: usize,
    pub description_warning_ratio: f64,
    pub description_critical_ratio: f64,
}

impl Default for StructureLimits {
    fn default() -> Self {
        Self {
            repeated_opening_run: 3,
            min_sentences_for_rhythm: 4,
            max_length_spread: 2,
            min_words_for_ratio: 8,
            description_warning_ratio: 0.12,
            description_critical_ratio: 0.25,
        }
    }
}

impl StructureLimits {
    /// Limits that never trigger; useful when only pattern rules are wanted.
    pub fn disabled() -> Self {
        Self {
            repeated_opening_run: usize::MAX,
            min_sentences_for_rhythm: usize::MAX,
            max_length_spread: 0,
            min_words_for_ratio: usize::MAX,
            description_warning_ratio: f64::INFINITY,
            description_critical_ratio: f64::INFINITY,
        }
    }
}

pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| s.split_whitespace().next().is_some())
        .collect()
}

fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
        .to_lowercase()
}

pub fn check_structure(text: &str, limits: &StructureLimits) -> Vec<Finding> {
    let sentences = split_sentences(text);
    let mut findings = Vec::new();

    if let Some(finding) = repeated_openings(&sentences, limits) {
        findings.push(finding);
    }
    if let Some(finding) = monotonous_rhythm(&sentences, limits) {
        findings.push(finding);
    }
    if let Some(finding) = over_description(text, limits) {
        findings.push(finding);
    }
    findings
}

fn repeated_openings(sentences: &[&str], limits: &StructureLimits) -> Option<Finding> {
    let openings: Vec<String> = sentences
        .iter()
        .filter_map(|s| s.split_whitespace().next())
        .map(normalize_word)
        .collect();

    let mut run = 1;
    for pair in openings.windows(2) {
        if pair[0] == pair[1] {
            run += 1;
            if run >= limits.repeated_opening_run {
                return Some(Finding {
                    category: RuleCategory::RepetitiveStructure,
                    severity: Severity::Warning,
                    evidence: format!("{run} consecutive sentences open with \"{}\"", pair[0]),
                    fix_hint: "Vary how sentences begin; lead some with action or detail"
                        .to_string(),
                });
            }
        } else {
            run = 1;
        }
    }
    None
}

fn monotonous_rhythm(sentences: &[&str], limits: &StructureLimits) -> Option<Finding> {
    if sentences.len() < limits.min_sentences_for_rhythm {
        return None;
    }
    let lengths: Vec<usize> = sentences
        .iter()
        .map(|s| s.split_whitespace().count())
        .collect();
    let longest = lengths.iter().copied().max()?;
    let shortest = lengths.iter().copied().min()?;
    if longest - shortest > limits.max_length_spread {
        return None;
    }
    Some(Finding {
        category: RuleCategory::RepetitiveStructure,
        severity: Severity::Warning,
        evidence: format!(
            "{} sentences all between {shortest} and {longest} words",
            sentences.len()
        ),
        fix_hint: "Break the rhythm with one short sentence or one long one".to_string(),
    })
}

fn is_descriptive(word: &str) -> bool {
    if INTENSIFIERS.contains(&word) {
        return true;
    }
    word.len() > 4 && word.ends_with("ly") && !NOT_ADVERBS.contains(&word)
}

fn over_description(text: &str, limits: &StructureLimits) -> Option<Finding> {
    let words: Vec<String> = text.split_whitespace().map(normalize_word).collect();
    if words.len() < limits.min_words_for_ratio {
        return None;
    }
    let descriptive: Vec<&String> = words.iter().filter(|w| is_descriptive(w)).collect();
    let ratio = descriptive.len() as f64 / words.len() as f64;

    let severity = if ratio >= limits.description_critical_ratio {
        Severity::Critical
    } else if ratio >= limits.description_warning_ratio {
        Severity::Warning
    } else {
        return None;
    };

    let sample: Vec<&str> = descriptive.iter().take(5).map(|w| w.as_str()).collect();
    Some(Finding {
        category: RuleCategory::OverDescription,
        severity,
        evidence: format!(
            "{:.0}% adverbs/intensifiers ({})",
            ratio * 100.0,
            sample.join(", ")
        ),
        fix_hint: "Cut modifiers and choose a stronger verb or noun".to_string(),
    })
}
