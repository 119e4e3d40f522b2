//! The `bankqa init` command.

use anyhow::Result;

use bankqa_core::config::SAMPLE_CONFIG;

pub fn execute() -> Result<i32> {
    if std::path::Path::new("bankqa.toml").exists() {
        println!("bankqa.toml already exists, skipping.");
    } else {
        std::fs::write("bankqa.toml", SAMPLE_CONFIG)?;
        println!("Created bankqa.toml");
    }

    println!("\nNext steps:");
    println!("  1. Tune thresholds in bankqa.toml for your bank");
    println!("  2. Run: bankqa validate bank.json --write-manifest manifest.json");
    println!("  3. Run: bankqa lint bank.json --profile strict");

    Ok(0)
}
