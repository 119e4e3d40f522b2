//! The `bankqa drift` command.

use std::path::PathBuf;

use anyhow::Result;

use bankqa_core::report::{load_json, Manifest};

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    fail_on_drift: bool,
    format: String,
) -> Result<i32> {
    let baseline: Manifest = load_json(&baseline_path)?;
    let current: Manifest = load_json(&current_path)?;

    let drift = baseline.compare(&current);

    match format.as_str() {
        "markdown" | "md" => {
            print!("{}", drift.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&drift)?);
        }
        _ => {
            if !drift.has_drift() {
                println!("No drift: manifests are identical.");
            } else {
                println!(
                    "Drift detected: hash {}, items {:+}, unique ids {:+}",
                    if drift.hash_changed { "changed" } else { "unchanged" },
                    drift.item_count_delta,
                    drift.unique_id_delta
                );
                for (domain, delta) in &drift.domain_deltas {
                    let name = if domain.is_empty() { "(none)" } else { domain.as_str() };
                    println!("  {name}: {delta:+}");
                }
            }
        }
    }

    if fail_on_drift && drift.has_drift() {
        return Ok(1);
    }
    Ok(0)
}
