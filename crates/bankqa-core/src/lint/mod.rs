//! Heuristic item-quality linter.
//!
//! Each item starts at 100. Every rule in [`RULES`] is a pure function of
//! the item and a read-only [`LintContext`] returning a signed delta and
//! zero or more findings. Deltas are summed and clamped to `0..=100` once,
//! after all rules have run, so rule order never changes a score.

pub mod rules;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::LintConfig;
use crate::error::BankResult;
use crate::finding::{Finding, Level};
use crate::model::{Bank, Item};
use crate::text::token_normalize;

/// Base score before any rule applies.
pub const BASE_SCORE: i32 = 100;

/// Severity mapping profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Lenient: graded checks report as info, authoring nudges are shown.
    #[default]
    Human,
    /// Graded checks report as warnings; nudges are not reported.
    Strict,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Human => write!(f, "human"),
            Profile::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "human" | "lenient" => Ok(Profile::Human),
            "strict" => Ok(Profile::Strict),
            other => Err(format!("unknown profile: {other}")),
        }
    }
}

/// Profile-independent severity a rule assigns to its finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    /// Info under [`Profile::Human`], warning under [`Profile::Strict`].
    Graded,
    /// Info under [`Profile::Human`], not reported under [`Profile::Strict`].
    Suggestion,
}

impl Severity {
    pub fn level(self, profile: Profile) -> Option<Level> {
        match (self, profile) {
            (Severity::Error, _) => Some(Level::Error),
            (Severity::Warning, _) => Some(Level::Warning),
            (Severity::Graded, Profile::Human) => Some(Level::Info),
            (Severity::Graded, Profile::Strict) => Some(Level::Warning),
            (Severity::Suggestion, Profile::Human) => Some(Level::Info),
            (Severity::Suggestion, Profile::Strict) => None,
        }
    }
}

/// A finding produced by a rule, before profile mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFinding {
    pub severity: Severity,
    pub kind: &'static str,
    pub message: String,
}

/// What one rule contributes to one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOutcome {
    pub delta: i32,
    pub findings: Vec<RuleFinding>,
}

impl RuleOutcome {
    pub fn none() -> Self {
        Self::default()
    }

    /// A single finding with its score delta.
    pub fn flag(delta: i32, severity: Severity, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            delta,
            findings: vec![RuleFinding {
                severity,
                kind,
                message: message.into(),
            }],
        }
    }

    /// Fold another outcome into this one.
    pub fn merge(mut self, other: RuleOutcome) -> Self {
        self.delta += other.delta;
        self.findings.extend(other.findings);
        self
    }
}

/// Curated word lists and patterns, built once per run.
#[derive(Debug, Clone)]
pub struct LintTables {
    pub absolute_terms: BTreeSet<&'static str>,
    pub negative_patterns: Vec<Regex>,
    pub cue_patterns: Vec<Regex>,
    pub decision_words: BTreeSet<&'static str>,
    pub context_words: BTreeSet<&'static str>,
    pub role_words: BTreeSet<&'static str>,
}

impl LintTables {
    pub fn new() -> BankResult<Self> {
        Ok(Self {
            absolute_terms: [
                "always",
                "never",
                "only",
                "all",
                "none",
                "must",
                "cannot",
                "impossible",
                "guaranteed",
                "completely",
                "entirely",
            ]
            .into(),
            negative_patterns: [r"\bNOT\b", r"\bEXCEPT\b", r"\bLEAST\b", r"\bFALSE\b"]
                .into_iter()
                .map(Regex::new)
                .collect::<Result<_, _>>()?,
            cue_patterns: [
                r"(?i)\ball of the above\b",
                r"(?i)\bnone of the above\b",
                r"(?i)\bboth [A-D] and [A-D]\b",
            ]
            .into_iter()
            .map(Regex::new)
            .collect::<Result<_, _>>()?,
            decision_words: [
                "best",
                "most",
                "first",
                "priority",
                "appropriate",
                "primary",
                "next",
                "should",
            ]
            .into(),
            context_words: [
                "organization",
                "enterprise",
                "ciso",
                "board",
                "business",
                "risk",
                "regulatory",
                "vendor",
                "incident",
                "federal",
                "privacy",
                "security",
                "management",
            ]
            .into(),
            role_words: [
                "ciso",
                "auditor",
                "analyst",
                "engineer",
                "administrator",
                "manager",
                "developer",
                "team",
                "organization",
            ]
            .into(),
        })
    }
}

/// Read-only inputs every rule may consult.
#[derive(Debug)]
pub struct LintContext<'a> {
    pub tables: &'a LintTables,
    pub config: &'a LintConfig,
    /// Normalised stem -> number of items carrying it.
    stem_counts: HashMap<String, usize>,
    item_ids: HashSet<String>,
}

impl<'a> LintContext<'a> {
    pub fn new(bank: &Bank, tables: &'a LintTables, config: &'a LintConfig) -> Self {
        let mut stem_counts = HashMap::new();
        for item in &bank.items {
            let stem = token_normalize(item.stem.text());
            if !stem.is_empty() {
                *stem_counts.entry(stem).or_insert(0) += 1;
            }
        }
        let item_ids = bank
            .items
            .iter()
            .filter(|i| !i.id.is_blank())
            .map(|i| i.id.text().to_string())
            .collect();
        Self {
            tables,
            config,
            stem_counts,
            item_ids,
        }
    }

    /// How many items in the bank share this normalised stem.
    pub fn stem_count(&self, normalized_stem: &str) -> usize {
        self.stem_counts.get(normalized_stem).copied().unwrap_or(0)
    }

    pub fn has_item(&self, id: &str) -> bool {
        self.item_ids.contains(id)
    }
}

/// A lint rule: pure function of an item and the shared context.
pub type Rule = fn(&Item, &LintContext<'_>) -> RuleOutcome;

/// Every rule the linter applies, with a name for diagnostics.
pub const RULES: &[(&str, Rule)] = &[
    ("structure", rules::structure),
    ("stem_length", rules::stem_length),
    ("negative_stem", rules::negative_stem),
    ("absolute_wording", rules::absolute_wording),
    ("duplicate_choices", rules::duplicate_choices),
    ("testwise_cue", rules::testwise_cue),
    ("choice_length_outlier", rules::choice_length_outlier),
    ("very_short_distractor", rules::very_short_distractor),
    ("keyword_cueing", rules::keyword_cueing),
    ("thin_explanation", rules::thin_explanation),
    ("judgment_metadata", rules::judgment_metadata),
    ("scenario_richness", rules::scenario_richness),
    ("duplicate_stem", rules::duplicate_stem),
    ("orphan_variant", rules::orphan_variant),
];

/// Per-item quality record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScore {
    pub item: String,
    pub quality_score: u32,
    pub domain: Option<String>,
    #[serde(rename = "questionType")]
    pub question_type: String,
    #[serde(rename = "pilotEligible")]
    pub pilot_eligible: bool,
}

/// Result of linting one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLint {
    pub score: QualityScore,
    pub findings: Vec<Finding>,
}

/// Clamp a raw summed score into `0..=100`.
pub fn clamp_score(raw: i32) -> u32 {
    raw.clamp(0, 100) as u32
}

/// Apply every rule to `item` and fold the outcomes.
pub fn lint_item(item: &Item, ctx: &LintContext<'_>) -> ItemLint {
    let outcome = RULES
        .iter()
        .map(|(_, rule)| rule(item, ctx))
        .fold(RuleOutcome::none(), RuleOutcome::merge);

    let label = item.label();
    let profile = ctx.config.profile;
    let findings = outcome
        .findings
        .into_iter()
        .filter_map(|f| {
            f.severity
                .level(profile)
                .map(|level| Finding::new(level, f.kind, &label, f.message))
        })
        .collect();

    ItemLint {
        score: QualityScore {
            item: label.clone(),
            quality_score: clamp_score(BASE_SCORE + outcome.delta),
            domain: item.canonical_domain(),
            question_type: item.question_type().to_string(),
            pilot_eligible: item.pilot_eligible.value().copied().unwrap_or(false),
        },
        findings,
    }
}

/// Linter output for a whole bank, in item order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankLint {
    pub scores: Vec<QualityScore>,
    pub findings: Vec<Finding>,
}

/// Lint every item in `bank`.
pub fn lint_bank(bank: &Bank, tables: &LintTables, config: &LintConfig) -> BankLint {
    let ctx = LintContext::new(bank, tables, config);
    let mut out = BankLint::default();
    for item in &bank.items {
        let linted = lint_item(item, &ctx);
        out.scores.push(linted.score);
        out.findings.extend(linted.findings);
    }
    tracing::debug!(
        items = out.scores.len(),
        findings = out.findings.len(),
        profile = %config.profile,
        "linted bank"
    );
    out
}
