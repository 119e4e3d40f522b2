pub mod check;
pub mod drift;
pub mod init;
pub mod lint;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use bankqa_core::config::{load_config_from, QaConfig};
use bankqa_core::lint::QualityScore;
use bankqa_core::parser::{load_bank, load_open_catalog, BankFile};
use bankqa_core::report::{save_json, Report, ValidateOptions};

use crate::{BankArgs, LintArgs, ValidateArgs};

/// How many low scorers the console table shows.
const TABLE_ROWS: usize = 10;

pub(crate) fn load_inputs(bank: &BankArgs, lint: Option<&LintArgs>) -> Result<(BankFile, QaConfig)> {
    let mut config = load_config_from(bank.config.as_deref())?;
    if let Some(profile) = lint.and_then(|l| l.profile) {
        config.lint.profile = profile;
    }
    let file = load_bank(&bank.bank)
        .with_context(|| format!("failed to load bank: {}", bank.bank.display()))?;
    tracing::info!(
        bank = %bank.bank.display(),
        items = file.bank.item_count(),
        "loaded bank"
    );
    Ok((file, config))
}

pub(crate) fn validate_options(args: &ValidateArgs) -> Result<ValidateOptions> {
    let open_catalog = match &args.open_catalog {
        Some(path) => Some(
            load_open_catalog(path)
                .with_context(|| format!("failed to load open catalog: {}", path.display()))?,
        ),
        None => None,
    };
    Ok(ValidateOptions {
        skip_citations: args.no_citations,
        open_catalog,
    })
}

/// Level-prefixed finding lines, then the `SUMMARY:` line.
pub(crate) fn print_report(report: &Report) -> Result<()> {
    for finding in &report.findings {
        println!("{finding}");
    }
    println!("SUMMARY: {}", report.summary_json()?);
    tracing::info!(
        errors = report.error_count(),
        warnings = report.warning_count(),
        "checks complete"
    );
    Ok(())
}

pub(crate) fn print_score_table(scores: &[QualityScore]) {
    if scores.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Item", "Score", "Domain", "Type"]);
    for s in scores.iter().take(TABLE_ROWS) {
        table.add_row(vec![
            Cell::new(&s.item),
            Cell::new(s.quality_score),
            Cell::new(s.domain.as_deref().unwrap_or("-")),
            Cell::new(&s.question_type),
        ]);
    }
    println!("\nLowest quality items:");
    println!("{table}");
}

/// Write the JSON and SARIF artifacts requested in `args`.
pub(crate) fn write_artifacts(report: &Report, args: &BankArgs) -> Result<()> {
    if let Some(path) = &args.write_report {
        save_json(report, path)?;
        log_written("report", path);
    }
    if let Some(path) = &args.write_sarif {
        bankqa_report::write_sarif_report(report, path)?;
        log_written("SARIF report", path);
    }
    Ok(())
}

pub(crate) fn log_written(what: &str, path: &Path) {
    tracing::info!(path = %path.display(), "wrote {what}");
}
