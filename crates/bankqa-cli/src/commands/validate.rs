//! The `bankqa validate` command.

use anyhow::Result;

use bankqa_core::report::{run_validator, save_json, Manifest};

use super::{load_inputs, log_written, print_report, validate_options, write_artifacts};
use crate::{BankArgs, ValidateArgs};

pub fn execute(bank: BankArgs, validate: ValidateArgs) -> Result<i32> {
    let (file, config) = load_inputs(&bank, None)?;
    let options = validate_options(&validate)?;

    let run = run_validator(&file, &config, &options)?;
    print_report(&run.report)?;
    write_artifacts(&run.report, &bank)?;

    if let Some(path) = &validate.write_manifest {
        save_json(&Manifest::from_bank_file(&file), path)?;
        log_written("manifest", path);
    }

    Ok(run.status.code())
}
