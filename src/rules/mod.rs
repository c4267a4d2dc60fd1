//! Deterministic rule engine
//!
//! Offline pattern checks over a piece of prose: passive voice, telling rather
//! than showing, cliché vocabulary, repetitive sentence structure and
//! over-description. Findings marked [`Severity::Critical`] reject a suggestion
//! before any judge call; warnings are forwarded to the judge as context.
//!
//! The engine has no network dependency and no state beyond its compiled rule
//! list, so it is safe to share across concurrent validators.

pub mod patterns;
pub mod structure;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use patterns::standard_rules;
pub use structure::StructureLimits;

/// Matches reported per pattern rule before further hits are ignored.
const MAX_MATCHES_PER_RULE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Empty,
    PassiveVoice,
    TellingNotShowing,
    Cliche,
    RepetitiveStructure,
    OverDescription,
}

impl RuleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleCategory::Empty => "empty",
            RuleCategory::PassiveVoice => "passive_voice",
            RuleCategory::TellingNotShowing => "telling_not_showing",
            RuleCategory::Cliche => "cliche",
            RuleCategory::RepetitiveStructure => "repetitive_structure",
            RuleCategory::OverDescription => "over_description",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub category: RuleCategory,
    pub severity: Severity,
    /// The text that triggered the rule.
    pub evidence: String,
    pub fix_hint: String,
}

/// A single regex-driven rule.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub category: RuleCategory,
    pub severity: Severity,
    pub hint: &'static str,
}

impl PatternRule {
    fn apply(&self, text: &str, findings: &mut Vec<Finding>) {
        for m in self.pattern.find_iter(text).take(MAX_MATCHES_PER_RULE) {
            findings.push(Finding {
                category: self.category,
                severity: self.severity,
                evidence: m.as_str().to_string(),
                fix_hint: self.hint.to_string(),
            });
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<PatternRule>,
    limits: StructureLimits,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl RuleEngine {
    /// Engine loaded with the built-in rule list and structure limits.
    pub fn standard() -> Self {
        Self::new(standard_rules(), StructureLimits::default())
    }

    pub fn new(rules: Vec<PatternRule>, limits: StructureLimits) -> Self {
        Self { rules, limits }
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    /// Run every rule over `text`.
    pub fn check(&self, text: &str) -> Vec<Finding> {
        if text.trim().is_empty() {
            return vec![Finding {
                category: RuleCategory::Empty,
                severity: Severity::Critical,
                evidence: String::new(),
                fix_hint: "Provide replacement text".to_string(),
            }];
        }

        let mut findings = Vec::new();
        for rule in &self.rules {
            rule.apply(text, &mut findings);
        }
        findings.extend(structure::check_structure(text, &self.limits));
        findings
    }
}

pub fn has_critical(findings: &[Finding]) -> bool {
    findings.iter().any(|f| f.severity == Severity::Critical)
}

pub fn warnings(findings: &[Finding]) -> impl Iterator<Item = &Finding> {
    findings.iter().filter(|f| f.severity == Severity::Warning)
}
