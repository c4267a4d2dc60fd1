//! Built-in pattern rules

use once_cell::sync::Lazy;
use regex::Regex;

use super::{PatternRule, RuleCategory, Severity};

struct RuleSpec {
    name: &'static str,
    pattern: &'static str,
    category: RuleCategory,
    severity: Severity,
    hint: &'static str,
}

const RULE_SPECS: &[RuleSpec] = &[
    RuleSpec {
        name: "banned_cliche",
        pattern: r"(?i)\b(?:rich tapestry|tapestry of|a testament to|delve(?:s|d)? into|little did i know|ever since i was (?:a )?(?:child|young|little|kid)|in today'?s (?:society|world)|at the end of the day|in conclusion|webster'?s dictionary)\b",
        category: RuleCategory::Cliche,
        severity: Severity::Critical,
        hint: "Replace the stock phrase with a concrete detail only you could write",
    },
    RuleSpec {
        name: "soft_cliche",
        pattern: r"(?i)\b(?:outside (?:of )?my comfort zone|comfort zone|passion for|made me who i am|opened my eyes|changed my life|make a difference|hard work pays off|never give up|step out of my shell)\b",
        category: RuleCategory::Cliche,
        severity: Severity::Warning,
        hint: "Show the moment that earned this conclusion instead of naming it",
    },
    RuleSpec {
        name: "passive_voice",
        pattern: r"(?i)\b(?:am|is|are|was|were|be|been|being)\s+(?:\w+ly\s+)?(?:\w+ed|given|taken|made|done|seen|known|shown|written|told|thrown|brought|taught|sold|lost|held|built|caught)\b",
        category: RuleCategory::PassiveVoice,
        severity: Severity::Warning,
        hint: "Name who acted and put them at the front of the sentence",
    },
    RuleSpec {
        name: "named_emotion",
        pattern: r"(?i)\bI\s+(?:felt|feel|was|am)\s+(?:so\s+|very\s+|extremely\s+|really\s+|incredibly\s+)?(?:happy|sad|proud|excited|nervous|scared|angry|grateful|overwhelmed|inspired|determined|frustrated|devastated|thrilled)\b",
        category: RuleCategory::TellingNotShowing,
        severity: Severity::Warning,
        hint: "Replace the named emotion with what your body or hands did",
    },
    RuleSpec {
        name: "announced_lesson",
        pattern: r"(?i)\bI\s+(?:realized|learned|understood|discovered)\s+that\b",
        category: RuleCategory::TellingNotShowing,
        severity: Severity::Warning,
        hint: "Let the reader reach the insight through the scene",
    },
];

static STANDARD_RULES: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    RULE_SPECS
        .iter()
        .map(|spec| PatternRule {
            name: spec.name,
            pattern: Regex::new(spec.pattern).expect("built-in rule pattern must compile"),
            category: spec.category,
            severity: spec.severity,
            hint: spec.hint,
        })
        .collect()
});

/// The built-in rule list. Compiled once per process.
pub fn standard_rules() -> Vec<PatternRule> {
    STANDARD_RULES.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> PatternRule {
        standard_rules()
            .into_iter()
            .find(|r| r.name == name)
            .unwrap()
    }

    #[test]
    fn test_all_builtin_patterns_compile() {
        assert_eq!(standard_rules().len(), RULE_SPECS.len());
    }

    #[test]
    fn test_passive_voice_detection() {
        let passive = rule("passive_voice");
        assert!(passive.pattern.is_match("The trophy was handed to me."));
        assert!(passive.pattern.is_match("Mistakes were quietly made."));
        assert!(!passive.pattern.is_match("I handed the trophy to my coach."));
    }

    #[test]
    fn test_named_emotion_detection() {
        let emotion = rule("named_emotion");
        assert!(emotion.pattern.is_match("I felt so proud of the team."));
        assert!(emotion.pattern.is_match("i was nervous"));
        assert!(!emotion.pattern.is_match("My palms left prints on the podium."));
    }

    #[test]
    fn test_announced_lesson_detection() {
        let lesson = rule("announced_lesson");
        assert!(lesson.pattern.is_match("In the end I realized that failure teaches."));
        assert!(!lesson.pattern.is_match("I realized my shoelace was untied."));
    }

    #[test]
    fn test_banned_cliche_detection() {
        let banned = rule("banned_cliche");
        assert!(banned.pattern.is_match("Ever since I was a child, I loved science."));
        assert!(banned.pattern.is_match("In today's society, everyone is online."));
        assert!(!banned.pattern.is_match("The tapestry hung above the fireplace."));
    }
}
