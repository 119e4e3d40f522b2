//! Report and manifest emission, gating and drift detection.
//!
//! A run is a pure function of the bank bytes and the config: the same
//! input always yields byte-identical artifacts.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::citation::{validate_citations, CitationPolicy, CitationStats};
use crate::config::QaConfig;
use crate::distribution::{analyze_distribution, DifficultyBand, DistributionStats};
use crate::error::BankResult;
use crate::finding::{count_level, Finding, Level};
use crate::lint::{lint_bank, BankLint, LintTables, Profile, QualityScore};
use crate::parser::BankFile;
use crate::schema::validate_schema;

/// Lower-case hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Summary counters of a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub item_count: usize,
    pub unique_item_ids: usize,
    pub source_catalog_count: usize,
    pub source_coverage_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_quality_score: Option<f64>,
    pub domain_counts: BTreeMap<String, usize>,
    pub correct_position_counts: BTreeMap<usize, usize>,
    pub difficulty_band_counts: BTreeMap<DifficultyBand, usize>,
}

/// The full structured report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub bank_file: String,
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    pub summary: Summary,
    pub findings: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_quality_items: Option<Vec<QualityScore>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_scores: Option<Vec<QualityScore>>,
}

impl Report {
    pub fn error_count(&self) -> usize {
        self.summary.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.summary.warning_count
    }

    /// The `SUMMARY:` console line payload.
    pub fn summary_json(&self) -> Result<String> {
        serde_json::to_string(&self.summary).context("failed to serialize summary")
    }
}

/// Content fingerprint of a bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub bank_file: String,
    pub sha256: String,
    pub item_count: usize,
    pub unique_item_ids: usize,
    pub domain_counts: BTreeMap<String, usize>,
}

impl Manifest {
    pub fn from_bank_file(file: &BankFile) -> Self {
        Self {
            bank_file: file.path.display().to_string(),
            sha256: sha256_hex(&file.bytes),
            item_count: file.bank.item_count(),
            unique_item_ids: file.bank.unique_item_ids(),
            domain_counts: file.bank.domain_counts(),
        }
    }

    /// Compare a baseline manifest (`self`) against `current`.
    pub fn compare(&self, current: &Manifest) -> DriftReport {
        let domains: BTreeSet<&String> = self
            .domain_counts
            .keys()
            .chain(current.domain_counts.keys())
            .collect();
        let domain_deltas = domains
            .into_iter()
            .filter_map(|d| {
                let before = self.domain_counts.get(d).copied().unwrap_or(0) as i64;
                let after = current.domain_counts.get(d).copied().unwrap_or(0) as i64;
                (before != after).then(|| (d.clone(), after - before))
            })
            .collect();
        DriftReport {
            baseline_sha256: self.sha256.clone(),
            current_sha256: current.sha256.clone(),
            hash_changed: self.sha256 != current.sha256,
            item_count_delta: current.item_count as i64 - self.item_count as i64,
            unique_id_delta: current.unique_item_ids as i64 - self.unique_item_ids as i64,
            domain_deltas,
        }
    }
}

/// Differences between two manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    pub baseline_sha256: String,
    pub current_sha256: String,
    pub hash_changed: bool,
    pub item_count_delta: i64,
    pub unique_id_delta: i64,
    /// Domains whose count changed, with `current - baseline`.
    pub domain_deltas: BTreeMap<String, i64>,
}

impl DriftReport {
    pub fn has_drift(&self) -> bool {
        self.hash_changed
            || self.item_count_delta != 0
            || self.unique_id_delta != 0
            || !self.domain_deltas.is_empty()
    }

    /// Format the drift report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        if !self.has_drift() {
            md.push_str("**No drift:** manifests are identical.\n");
            return md;
        }
        md.push_str(&format!(
            "**Drift detected:** hash {}, items {:+}, unique ids {:+}\n\n",
            if self.hash_changed { "changed" } else { "unchanged" },
            self.item_count_delta,
            self.unique_id_delta
        ));
        if !self.domain_deltas.is_empty() {
            md.push_str("| Domain | Delta |\n");
            md.push_str("|--------|-------|\n");
            for (domain, delta) in &self.domain_deltas {
                let name = if domain.is_empty() { "(none)" } else { domain.as_str() };
                md.push_str(&format!("| {name} | {delta:+} |\n"));
            }
        }
        md
    }
}

/// Process exit status derived from a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Clean,
    Errors,
    Warnings,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Clean => 0,
            ExitStatus::Errors => 1,
            ExitStatus::Warnings => 2,
        }
    }
}

/// How findings map to an exit status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatePolicy {
    pub fail_on_warning: bool,
}

impl GatePolicy {
    /// Errors in `gating` fail the run. With `fail_on_warning`, any
    /// warning, or an error in `advisory`, exits with
    /// [`ExitStatus::Warnings`].
    pub fn status(&self, gating: &[Finding], advisory: &[Finding]) -> ExitStatus {
        if gating.iter().any(Finding::is_error) {
            return ExitStatus::Errors;
        }
        let escalated = gating.iter().any(Finding::is_warning)
            || advisory
                .iter()
                .any(|f| f.is_warning() || f.is_error());
        if self.fail_on_warning && escalated {
            ExitStatus::Warnings
        } else {
            ExitStatus::Clean
        }
    }
}

/// Validator switches.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Skip the citation pass entirely.
    pub skip_citations: bool,
    /// Permitted source ids; selects open-origin citation mode.
    pub open_catalog: Option<BTreeSet<String>>,
}

/// A finished run: the report and the exit status it gates to.
#[derive(Debug, Clone)]
pub struct QaRun {
    pub report: Report,
    pub status: ExitStatus,
}

struct BankPass {
    findings: Vec<Finding>,
    distribution: DistributionStats,
    citations: CitationStats,
}

fn bank_pass(file: &BankFile, config: &QaConfig, options: &ValidateOptions) -> BankResult<BankPass> {
    let bank = &file.bank;
    let mut findings = validate_schema(bank);

    let (distribution_findings, distribution) = analyze_distribution(bank, &config.distribution);
    findings.extend(distribution_findings);

    let citations = if options.skip_citations {
        CitationStats {
            source_catalog_count: bank.source_catalog.len(),
            source_coverage_count: 0,
        }
    } else {
        if !bank.catalog_present {
            findings.push(Finding::bank(
                Level::Error,
                "missing_source_catalog",
                "Top-level 'sourceCatalog' is missing; citations cannot resolve.",
            ));
        }
        let policy = match &options.open_catalog {
            Some(ids) => CitationPolicy::open_origin(&config.citations, ids.clone())?,
            None => CitationPolicy::catalog_consistency(&config.citations),
        };
        tracing::debug!(open_origin = policy.is_open_origin(), "checking citations");
        let (citation_findings, stats) = validate_citations(bank, &policy);
        findings.extend(citation_findings);
        stats
    };

    tracing::debug!(findings = findings.len(), "bank checks complete");
    Ok(BankPass {
        findings,
        distribution,
        citations,
    })
}

fn summarize(
    file: &BankFile,
    findings: &[Finding],
    distribution: DistributionStats,
    citations: CitationStats,
    scores: Option<&[QualityScore]>,
) -> Summary {
    Summary {
        item_count: file.bank.item_count(),
        unique_item_ids: file.bank.unique_item_ids(),
        source_catalog_count: citations.source_catalog_count,
        source_coverage_count: citations.source_coverage_count,
        error_count: count_level(findings, Level::Error),
        warning_count: count_level(findings, Level::Warning),
        info_count: count_level(findings, Level::Info),
        average_quality_score: scores.and_then(average_score),
        domain_counts: distribution.domain_counts,
        correct_position_counts: distribution.correct_position_counts,
        difficulty_band_counts: distribution.difficulty_band_counts,
    }
}

/// Mean quality score rounded to two decimals; `None` for an empty bank.
pub fn average_score(scores: &[QualityScore]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let total: u64 = scores.iter().map(|s| u64::from(s.quality_score)).sum();
    let mean = total as f64 / scores.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

/// The `n` lowest-scoring items; ties keep bank order.
pub fn lowest_scores(scores: &[QualityScore], n: usize) -> Vec<QualityScore> {
    let mut sorted = scores.to_vec();
    sorted.sort_by_key(|s| s.quality_score);
    sorted.truncate(n);
    sorted
}

/// Schema, distribution and citation checks.
pub fn run_validator(
    file: &BankFile,
    config: &QaConfig,
    options: &ValidateOptions,
) -> BankResult<QaRun> {
    let pass = bank_pass(file, config, options)?;
    let summary = summarize(file, &pass.findings, pass.distribution, pass.citations, None);
    let status = GatePolicy::default().status(&pass.findings, &[]);
    Ok(QaRun {
        report: Report {
            bank_file: file.path.display().to_string(),
            sha256: sha256_hex(&file.bytes),
            profile: None,
            summary,
            findings: pass.findings,
            low_quality_items: None,
            item_scores: None,
        },
        status,
    })
}

fn lint_report(
    file: &BankFile,
    config: &QaConfig,
    findings: Vec<Finding>,
    linted: BankLint,
    summary: Summary,
) -> Report {
    Report {
        bank_file: file.path.display().to_string(),
        sha256: sha256_hex(&file.bytes),
        profile: Some(config.lint.profile),
        summary,
        findings,
        low_quality_items: Some(lowest_scores(&linted.scores, config.lint.low_quality_sample)),
        item_scores: Some(linted.scores),
    }
}

/// The quality linter alone.
pub fn run_linter(file: &BankFile, config: &QaConfig, gate: GatePolicy) -> BankResult<QaRun> {
    let tables = LintTables::new()?;
    let linted = lint_bank(&file.bank, &tables, &config.lint);
    let distribution = crate::distribution::distribution_stats(&file.bank, &config.distribution);
    let citations = CitationStats {
        source_catalog_count: file.bank.source_catalog.len(),
        source_coverage_count: 0,
    };
    let summary = summarize(
        file,
        &linted.findings,
        distribution,
        citations,
        Some(linted.scores.as_slice()),
    );
    let status = gate.status(&linted.findings, &[]);
    let findings = linted.findings.clone();
    Ok(QaRun {
        report: lint_report(file, config, findings, linted, summary),
        status,
    })
}

/// Validator and linter in one report. Linter findings that repeat a
/// bank-level `(item, kind)` pair are dropped.
pub fn run_check(
    file: &BankFile,
    config: &QaConfig,
    options: &ValidateOptions,
    gate: GatePolicy,
) -> BankResult<QaRun> {
    let pass = bank_pass(file, config, options)?;
    let tables = LintTables::new()?;
    let linted = lint_bank(&file.bank, &tables, &config.lint);

    // A label shared by several items cannot tell whose finding repeats
    // whose, so those items keep every linter finding.
    let mut label_counts: HashMap<String, usize> = HashMap::new();
    for item in &file.bank.items {
        *label_counts.entry(item.label()).or_insert(0) += 1;
    }
    let seen: HashSet<(&str, &str)> = pass
        .findings
        .iter()
        .map(|f| (f.item.as_str(), f.kind.as_str()))
        .collect();
    let extra: Vec<Finding> = linted
        .findings
        .iter()
        .filter(|f| {
            label_counts.get(&f.item).copied().unwrap_or(0) > 1
                || !seen.contains(&(f.item.as_str(), f.kind.as_str()))
        })
        .cloned()
        .collect();

    let status = gate.status(&pass.findings, &extra);
    let mut findings = pass.findings;
    findings.extend(extra);

    let summary = summarize(
        file,
        &findings,
        pass.distribution,
        pass.citations,
        Some(linted.scores.as_slice()),
    );
    Ok(QaRun {
        report: lint_report(file, config, findings, linted, summary),
        status,
    })
}

/// Write a value as pretty JSON with a trailing newline.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value).context("failed to serialize artifact")?;
    json.push('\n');
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Load a JSON artifact (report or manifest).
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
