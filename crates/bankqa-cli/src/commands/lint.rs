//! The `bankqa lint` command.

use anyhow::Result;

use bankqa_core::report::{run_linter, GatePolicy};

use super::{load_inputs, print_report, print_score_table, write_artifacts};
use crate::{BankArgs, LintArgs};

pub fn execute(bank: BankArgs, lint: LintArgs) -> Result<i32> {
    let (file, config) = load_inputs(&bank, Some(&lint))?;
    let gate = GatePolicy {
        fail_on_warning: lint.fail_on_warning,
    };

    let run = run_linter(&file, &config, gate)?;
    print_report(&run.report)?;
    if let Some(low) = &run.report.low_quality_items {
        print_score_table(low);
    }
    write_artifacts(&run.report, &bank)?;

    Ok(run.status.code())
}
