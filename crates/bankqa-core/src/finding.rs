//! Findings: the unit every check reports in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Item label used for findings that concern the bank as a whole.
pub const BANK_ITEM: &str = "bank";

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Info => write!(f, "info"),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Level::Error),
            "warning" | "warn" => Ok(Level::Warning),
            "info" => Ok(Level::Info),
            other => Err(format!("unknown level: {other}")),
        }
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub level: Level,
    /// Stable tag naming the rule that fired (e.g. `duplicate_choices`).
    pub kind: String,
    /// Item label, or [`BANK_ITEM`] for bank-level findings.
    pub item: String,
    pub message: String,
}

impl Finding {
    pub fn new(
        level: Level,
        kind: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            kind: kind.into(),
            item: item.into(),
            message: message.into(),
        }
    }

    pub fn error(kind: &str, item: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Error, kind, item, message)
    }

    pub fn warning(kind: &str, item: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Warning, kind, item, message)
    }

    pub fn info(kind: &str, item: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Level::Info, kind, item, message)
    }

    /// A finding about the bank rather than a single item.
    pub fn bank(level: Level, kind: &str, message: impl Into<String>) -> Self {
        Self::new(level, kind, BANK_ITEM, message)
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }

    pub fn is_warning(&self) -> bool {
        self.level == Level::Warning
    }
}

impl fmt::Display for Finding {
    /// Console form: `ERROR: [item] message`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: [{}] {}",
            self.level.to_string().to_uppercase(),
            self.item,
            self.message
        )
    }
}

/// Count findings at `level`.
pub fn count_level(findings: &[Finding], level: Level) -> usize {
    findings.iter().filter(|f| f.level == level).count()
}
