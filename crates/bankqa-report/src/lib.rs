//! bankqa-report: SARIF and Markdown renderings of a bankqa report.

pub mod markdown;
pub mod sarif;

pub use markdown::{generate_markdown, write_markdown_report};
pub use sarif::{generate_sarif, write_sarif_report};
