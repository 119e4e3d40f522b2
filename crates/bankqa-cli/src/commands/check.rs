//! The `bankqa check` command: validator and linter in one pass.

use std::path::PathBuf;

use anyhow::Result;

use bankqa_core::report::{run_check, save_json, GatePolicy, Manifest};

use super::{
    load_inputs, log_written, print_report, print_score_table, validate_options, write_artifacts,
};
use crate::{BankArgs, LintArgs, ValidateArgs};

pub fn execute(
    bank: BankArgs,
    validate: ValidateArgs,
    lint: LintArgs,
    write_markdown: Option<PathBuf>,
) -> Result<i32> {
    let (file, config) = load_inputs(&bank, Some(&lint))?;
    let options = validate_options(&validate)?;
    let gate = GatePolicy {
        fail_on_warning: lint.fail_on_warning,
    };

    let run = run_check(&file, &config, &options, gate)?;
    print_report(&run.report)?;
    if let Some(low) = &run.report.low_quality_items {
        print_score_table(low);
    }
    write_artifacts(&run.report, &bank)?;

    if let Some(path) = &validate.write_manifest {
        save_json(&Manifest::from_bank_file(&file), path)?;
        log_written("manifest", path);
    }
    if let Some(path) = &write_markdown {
        bankqa_report::write_markdown_report(&run.report, path)?;
        log_written("markdown report", path);
    }

    Ok(run.status.code())
}
