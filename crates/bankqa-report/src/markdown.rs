//! Markdown report for pull-request comments and job summaries.

use std::path::Path;

use anyhow::{Context, Result};

use bankqa_core::model::blueprint_weight;
use bankqa_core::report::Report;
use bankqa_core::Level;

/// Keep table cells on one row.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

/// Generate a markdown report.
pub fn generate_markdown(report: &Report) -> String {
    let s = &report.summary;
    let mut md = String::new();

    md.push_str(&format!("## bankqa report: `{}`\n\n", report.bank_file));
    md.push_str(&format!("sha256 `{}`", report.sha256));
    if let Some(profile) = report.profile {
        md.push_str(&format!(", profile `{profile}`"));
    }
    md.push_str("\n\n");

    md.push_str(&format!(
        "**Summary:** {} items ({} unique ids), {} errors, {} warnings, {} info",
        s.item_count, s.unique_item_ids, s.error_count, s.warning_count, s.info_count
    ));
    if let Some(avg) = s.average_quality_score {
        md.push_str(&format!(", average quality {avg:.2}"));
    }
    md.push_str("\n\n");

    if !s.domain_counts.is_empty() {
        md.push_str("### Domains\n\n");
        md.push_str("| Domain | Items | Share | Target |\n");
        md.push_str("|--------|-------|-------|--------|\n");
        for (domain, n) in &s.domain_counts {
            let name = if domain.is_empty() { "(none)" } else { domain.as_str() };
            let share = if s.item_count == 0 {
                0.0
            } else {
                *n as f64 * 100.0 / s.item_count as f64
            };
            let target = blueprint_weight(domain)
                .map(|w| format!("{w}%"))
                .unwrap_or_else(|| "-".to_string());
            md.push_str(&format!("| {} | {n} | {share:.1}% | {target} |\n", cell(name)));
        }
        md.push('\n');
    }

    for level in [Level::Error, Level::Warning, Level::Info] {
        let rows: Vec<_> = report.findings.iter().filter(|f| f.level == level).collect();
        if rows.is_empty() {
            continue;
        }
        let heading = match level {
            Level::Error => "Errors",
            Level::Warning => "Warnings",
            Level::Info => "Info",
        };
        md.push_str(&format!("### {heading} ({})\n\n", rows.len()));
        md.push_str("| Item | Kind | Message |\n");
        md.push_str("|------|------|---------|\n");
        for f in rows {
            md.push_str(&format!(
                "| {} | `{}` | {} |\n",
                cell(&f.item),
                f.kind,
                cell(&f.message)
            ));
        }
        md.push('\n');
    }

    if let Some(low) = report.low_quality_items.as_ref().filter(|l| !l.is_empty()) {
        md.push_str("### Lowest quality items\n\n");
        md.push_str("| Item | Score | Domain | Type |\n");
        md.push_str("|------|-------|--------|------|\n");
        for q in low {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                cell(&q.item),
                q.quality_score,
                cell(q.domain.as_deref().unwrap_or("-")),
                cell(&q.question_type)
            ));
        }
    }

    md
}

/// Write the markdown report to a file.
pub fn write_markdown_report(report: &Report, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, generate_markdown(report))
        .with_context(|| format!("failed to write markdown to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankqa_core::lint::{Profile, QualityScore};
    use bankqa_core::report::Summary;
    use bankqa_core::Finding;

    #[test]
    fn markdown_sections() {
        let mut summary = Summary {
            item_count: 2,
            unique_item_ids: 2,
            error_count: 1,
            average_quality_score: Some(71.5),
            ..Default::default()
        };
        summary.domain_counts.insert("3. Security Architecture and Engineering".into(), 1);
        summary.domain_counts.insert("Cloud".into(), 1);
        let report = Report {
            bank_file: "bank.json".into(),
            sha256: "ab".into(),
            profile: Some(Profile::Strict),
            summary,
            findings: vec![Finding::error(
                "invalid_choices",
                "q|1",
                "Invalid 'choices': missing.",
            )],
            low_quality_items: Some(vec![QualityScore {
                item: "q|1".into(),
                quality_score: 40,
                domain: None,
                question_type: "scenario".into(),
                pilot_eligible: false,
            }]),
            item_scores: None,
        };

        let md = generate_markdown(&report);
        assert!(md.contains("profile `strict`"));
        assert!(md.contains("average quality 71.50"));
        assert!(md.contains("| 3. Security Architecture and Engineering | 1 | 50.0% | 13% |"));
        assert!(md.contains("| Cloud | 1 | 50.0% | - |"));
        assert!(md.contains("### Errors (1)"));
        assert!(md.contains("| q\\|1 | `invalid_choices` |"));
        assert!(!md.contains("### Warnings"));
        assert!(md.contains("| q\\|1 | 40 | - | scenario |"));
    }
}
