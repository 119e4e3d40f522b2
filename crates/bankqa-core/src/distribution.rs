//! Whole-bank statistical checks.
//!
//! Domain coverage against the blueprint, answer-position bias, difficulty
//! band coverage and minimum pool size. Everything here is advisory and
//! reported as warnings.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DistributionConfig;
use crate::finding::{Finding, Level};
use crate::model::{is_blueprint_domain, Bank, ItemType, KeyStatus, BLUEPRINT};

/// Difficulty band of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyBand {
    Easy,
    Medium,
    Hard,
}

impl DifficultyBand {
    pub const ALL: [DifficultyBand; 3] = [
        DifficultyBand::Easy,
        DifficultyBand::Medium,
        DifficultyBand::Hard,
    ];

    /// `easy` at or below `easy_max`, `hard` at or above `hard_min`,
    /// otherwise `medium`. Requires `easy_max < hard_min`.
    pub fn classify(difficulty: f64, config: &DistributionConfig) -> Self {
        if difficulty <= config.easy_max {
            DifficultyBand::Easy
        } else if difficulty >= config.hard_min {
            DifficultyBand::Hard
        } else {
            DifficultyBand::Medium
        }
    }
}

impl fmt::Display for DifficultyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifficultyBand::Easy => write!(f, "easy"),
            DifficultyBand::Medium => write!(f, "medium"),
            DifficultyBand::Hard => write!(f, "hard"),
        }
    }
}

/// Counters the distribution pass produces for the report summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionStats {
    pub domain_counts: BTreeMap<String, usize>,
    /// Keyed position -> number of single-answer items keyed there.
    pub correct_position_counts: BTreeMap<usize, usize>,
    pub difficulty_band_counts: BTreeMap<DifficultyBand, usize>,
}

/// Compute the distribution counters for `bank`.
pub fn distribution_stats(bank: &Bank, config: &DistributionConfig) -> DistributionStats {
    let mut stats = DistributionStats {
        domain_counts: bank.domain_counts(),
        ..Default::default()
    };

    for item in &bank.items {
        if item.item_type() == ItemType::SingleAnswer {
            if let KeyStatus::Valid(keyed) = item.key_status() {
                *stats.correct_position_counts.entry(keyed[0]).or_insert(0) += 1;
            }
        }
        if let Some(&difficulty) = item.difficulty.value() {
            let band = DifficultyBand::classify(difficulty, config);
            *stats.difficulty_band_counts.entry(band).or_insert(0) += 1;
        }
    }

    stats
}

/// Run the distribution checks; returns findings and the counters.
pub fn analyze_distribution(
    bank: &Bank,
    config: &DistributionConfig,
) -> (Vec<Finding>, DistributionStats) {
    let stats = distribution_stats(bank, config);
    let mut findings = Vec::new();

    for item in &bank.items {
        if !item.is_object {
            continue;
        }
        match item.canonical_domain() {
            Some(domain) if is_blueprint_domain(&domain) => {}
            Some(domain) => findings.push(Finding::warning(
                "non_blueprint_domain",
                item.label(),
                format!("Non-blueprint domain: '{domain}'."),
            )),
            None => findings.push(Finding::warning(
                "non_blueprint_domain",
                item.label(),
                "Missing domain.",
            )),
        }
    }

    for (domain, _) in BLUEPRINT {
        if stats.domain_counts.get(domain).copied().unwrap_or(0) == 0 {
            findings.push(Finding::bank(
                Level::Warning,
                "missing_domain_coverage",
                format!("No questions for domain: {domain}."),
            ));
        }
    }

    if bank.item_count() < config.min_pool_size {
        findings.push(Finding::bank(
            Level::Warning,
            "small_pool",
            format!(
                "Bank has {} items, fewer than {}; too small for full adaptive-exam modeling.",
                bank.item_count(),
                config.min_pool_size
            ),
        ));
    }

    if let Some(finding) = position_bias(&stats.correct_position_counts, config) {
        findings.push(finding);
    }

    if !stats.difficulty_band_counts.is_empty() {
        for band in DifficultyBand::ALL {
            if !stats.difficulty_band_counts.contains_key(&band) {
                findings.push(Finding::bank(
                    Level::Warning,
                    "missing_difficulty_band",
                    format!("No {band} difficulty items detected."),
                ));
            }
        }
    }

    (findings, stats)
}

fn position_bias(
    counts: &BTreeMap<usize, usize>,
    config: &DistributionConfig,
) -> Option<Finding> {
    let total: usize = counts.values().sum();
    // Ties resolve to the lowest position.
    let (&position, &top) = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))?;
    let share = top as f64 / total as f64;
    if share < config.position_bias_share {
        return None;
    }
    let histogram = counts
        .iter()
        .map(|(p, n)| format!("{p}: {n}"))
        .collect::<Vec<_>>()
        .join(", ");
    Some(Finding::bank(
        Level::Warning,
        "answer_position_bias",
        format!(
            "Answer-position bias detected: position {position} holds {:.2} of {total} keys {{{histogram}}}.",
            share
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, Item};

    fn item(id: usize, domain: &str, correct: i64, difficulty: f64) -> Item {
        Item {
            ordinal: id,
            is_object: true,
            id: Field::Value(format!("q-{id}")),
            domain: Field::Value(domain.into()),
            choices: Field::Value(vec!["a".into(), "b".into(), "c".into(), "d".into()]),
            correct_index: Field::Value(correct),
            difficulty: Field::Value(difficulty),
            ..Default::default()
        }
    }

    fn full_bank(n: usize, key: impl Fn(usize) -> i64) -> Bank {
        let items = (0..n)
            .map(|i| {
                let (domain, _) = BLUEPRINT[i % BLUEPRINT.len()];
                let difficulty = [-1.0, 0.0, 1.0][i % 3];
                item(i + 1, domain, key(i), difficulty)
            })
            .collect();
        Bank {
            items,
            ..Default::default()
        }
    }

    fn kinds(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.kind.as_str()).collect()
    }

    #[test]
    fn band_partition_fixed_thresholds() {
        let config = DistributionConfig::default();
        assert_eq!(DifficultyBand::classify(-0.6, &config), DifficultyBand::Easy);
        assert_eq!(DifficultyBand::classify(-0.59, &config), DifficultyBand::Medium);
        assert_eq!(DifficultyBand::classify(0.69, &config), DifficultyBand::Medium);
        assert_eq!(DifficultyBand::classify(0.7, &config), DifficultyBand::Hard);
        assert_eq!(DifficultyBand::classify(-3.0, &config), DifficultyBand::Easy);
    }

    #[test]
    fn band_partition_is_exhaustive() {
        let config = DistributionConfig::default();
        for step in -300..=300 {
            let d = step as f64 / 100.0;
            let band = DifficultyBand::classify(d, &config);
            let in_easy = d <= -0.6;
            let in_hard = d >= 0.7;
            match band {
                DifficultyBand::Easy => assert!(in_easy && !in_hard),
                DifficultyBand::Hard => assert!(in_hard && !in_easy),
                DifficultyBand::Medium => assert!(!in_easy && !in_hard),
            }
        }
    }

    #[test]
    fn balanced_bank_is_clean() {
        let bank = full_bank(120, |i| (i % 4) as i64);
        let (findings, stats) = analyze_distribution(&bank, &DistributionConfig::default());
        assert!(findings.is_empty(), "unexpected: {findings:?}");
        assert_eq!(stats.correct_position_counts.len(), 4);
        assert_eq!(stats.difficulty_band_counts[&DifficultyBand::Hard], 40);
    }

    #[test]
    fn position_bias_names_position_zero() {
        let bank = full_bank(100, |i| if i < 95 { 0 } else { 1 });
        let (findings, stats) = analyze_distribution(&bank, &DistributionConfig::default());
        assert_eq!(kinds(&findings), vec!["answer_position_bias"]);
        assert!(findings[0].message.contains("position 0 holds 0.95"));
        assert_eq!(stats.correct_position_counts[&0], 95);
    }

    #[test]
    fn position_bias_threshold_is_inclusive() {
        let config = DistributionConfig::default();

        let at = full_bank(100, |i| if i < 70 { 0 } else { 1 });
        let (findings, _) = analyze_distribution(&at, &config);
        assert_eq!(kinds(&findings), vec!["answer_position_bias"]);
        assert!(findings[0].message.contains("position 0 holds 0.70 of 100 keys"));

        let below = full_bank(100, |i| if i < 69 { 0 } else { 1 });
        let (findings, stats) = analyze_distribution(&below, &config);
        assert!(findings.is_empty(), "unexpected: {findings:?}");
        assert_eq!(stats.correct_position_counts[&0], 69);
    }

    #[test]
    fn small_pool_and_missing_coverage() {
        let bank = Bank {
            items: vec![
                item(1, "2 Asset Security", 0, -1.0),
                item(2, "Cloud", 1, -1.0),
            ],
            ..Default::default()
        };
        let (findings, stats) = analyze_distribution(&bank, &DistributionConfig::default());
        let k = kinds(&findings);
        assert_eq!(k.iter().filter(|&&x| x == "missing_domain_coverage").count(), 7);
        assert!(k.contains(&"non_blueprint_domain"));
        assert!(k.contains(&"small_pool"));
        assert_eq!(
            k.iter().filter(|&&x| x == "missing_difficulty_band").count(),
            2
        );
        assert_eq!(stats.domain_counts["2. Asset Security"], 1);
    }

    #[test]
    fn multi_select_keys_do_not_count_toward_bias() {
        let mut bank = full_bank(100, |_| 1);
        for it in &mut bank.items {
            it.declared_type = Field::Value("dragdrop".into());
            it.correct_answers = Field::Value(vec![0, 1]);
        }
        let stats = distribution_stats(&bank, &DistributionConfig::default());
        assert!(stats.correct_position_counts.is_empty());
    }
}
