//! SARIF (Static Analysis Results Interchange Format) output.
//!
//! Generates SARIF 2.1.0 documents so bank findings show up in code
//! scanning alongside the bank file.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use bankqa_core::finding::BANK_ITEM;
use bankqa_core::report::Report;
use bankqa_core::Level;

fn sarif_level(level: Level) -> &'static str {
    match level {
        Level::Error => "error",
        Level::Warning => "warning",
        Level::Info => "note",
    }
}

/// Human-readable rule name from a finding kind: `duplicate_choices` ->
/// `Duplicate choices`.
fn rule_name(kind: &str) -> String {
    let spaced = kind.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Generate a SARIF 2.1.0 JSON document from a report.
pub fn generate_sarif(report: &Report) -> serde_json::Value {
    let kinds: BTreeSet<&str> = report.findings.iter().map(|f| f.kind.as_str()).collect();
    let rules: Vec<serde_json::Value> = kinds
        .iter()
        .map(|kind| {
            json!({
                "id": kind,
                "name": rule_name(kind),
                "shortDescription": { "text": rule_name(kind) },
            })
        })
        .collect();

    let results: Vec<serde_json::Value> = report
        .findings
        .iter()
        .map(|f| {
            let mut location = json!({
                "physicalLocation": {
                    "artifactLocation": { "uri": report.bank_file }
                }
            });
            if f.item != BANK_ITEM {
                location["logicalLocations"] = json!([{ "name": f.item, "kind": "object" }]);
            }
            json!({
                "ruleId": f.kind,
                "level": sarif_level(f.level),
                "message": { "text": format!("[{}] {}", f.item, f.message) },
                "locations": [location]
            })
        })
        .collect();

    json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/main/sarif-2.1/schema/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "bankqa",
                    "version": env!("CARGO_PKG_VERSION"),
                    "informationUri": "https://github.com/MysterionRise/bankqa",
                    "rules": rules
                }
            },
            "results": results
        }]
    })
}

/// Write a SARIF report to a file.
pub fn write_sarif_report(report: &Report, path: &Path) -> Result<()> {
    let sarif = generate_sarif(report);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(&sarif)?;
    json.push('\n');
    std::fs::write(path, json)
        .with_context(|| format!("failed to write SARIF to {}", path.display()))?;
    Ok(())
}
