//! Run configuration and loader.
//!
//! Every threshold used by the checks is a heuristic default that can be
//! tuned per bank in `bankqa.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::lint::Profile;

/// Whole-bank distribution thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionConfig {
    /// Share of single-answer keys at one position that counts as bias.
    #[serde(default = "default_position_bias_share")]
    pub position_bias_share: f64,
    /// Pool size below which adaptive modeling is flagged.
    #[serde(default = "default_min_pool_size")]
    pub min_pool_size: usize,
    /// Difficulty at or below this is `easy`.
    #[serde(default = "default_easy_max")]
    pub easy_max: f64,
    /// Difficulty at or above this is `hard`.
    #[serde(default = "default_hard_min")]
    pub hard_min: f64,
}

fn default_position_bias_share() -> f64 {
    0.70
}
fn default_min_pool_size() -> usize {
    100
}
fn default_easy_max() -> f64 {
    -0.6
}
fn default_hard_min() -> f64 {
    0.7
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            position_bias_share: default_position_bias_share(),
            min_pool_size: default_min_pool_size(),
            easy_max: default_easy_max(),
            hard_min: default_hard_min(),
        }
    }
}

/// Quality-linter thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LintConfig {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default = "default_min_stem_words")]
    pub min_stem_words: usize,
    #[serde(default = "default_max_stem_words")]
    pub max_stem_words: usize,
    #[serde(default = "default_min_explanation_words")]
    pub min_explanation_words: usize,
    /// Longest choice over mean choice length that counts as an outlier.
    #[serde(default = "default_length_ratio")]
    pub length_ratio: f64,
    #[serde(default = "default_short_choice_chars")]
    pub short_choice_chars: usize,
    /// Keyed-vs-distractor stem overlap gap that counts as cueing.
    #[serde(default = "default_overlap_delta")]
    pub overlap_delta: f64,
    #[serde(default = "default_min_judgment_level")]
    pub min_judgment_level: i64,
    /// How many lowest-scoring items the report keeps.
    #[serde(default = "default_low_quality_sample")]
    pub low_quality_sample: usize,
}

fn default_min_stem_words() -> usize {
    10
}
fn default_max_stem_words() -> usize {
    120
}
fn default_min_explanation_words() -> usize {
    20
}
fn default_length_ratio() -> f64 {
    2.8
}
fn default_short_choice_chars() -> usize {
    12
}
fn default_overlap_delta() -> f64 {
    0.35
}
fn default_min_judgment_level() -> i64 {
    2
}
fn default_low_quality_sample() -> usize {
    50
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            min_stem_words: default_min_stem_words(),
            max_stem_words: default_max_stem_words(),
            min_explanation_words: default_min_explanation_words(),
            length_ratio: default_length_ratio(),
            short_choice_chars: default_short_choice_chars(),
            overlap_delta: default_overlap_delta(),
            min_judgment_level: default_min_judgment_level(),
            low_quality_sample: default_low_quality_sample(),
        }
    }
}

/// Citation policy settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationConfig {
    /// Hosts a catalog URL may point at.
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,
    /// Extra hosts permitted only in open-origin mode.
    #[serde(default = "default_open_hosts")]
    pub open_hosts: Vec<String>,
    /// Case-insensitive patterns marking proprietary material.
    #[serde(default = "default_banned_markers")]
    pub banned_markers: Vec<String>,
}

fn default_allowed_hosts() -> Vec<String> {
    [
        "nist.gov",
        "www.nist.gov",
        "csrc.nist.gov",
        "pages.nist.gov",
        "isc2.org",
        "www.isc2.org",
        "iso.org",
        "www.iso.org",
        "rfc-editor.org",
        "www.rfc-editor.org",
        "pcisecuritystandards.org",
        "www.pcisecuritystandards.org",
        "isaca.org",
        "www.isaca.org",
        "aicpa-cima.com",
        "www.aicpa-cima.com",
        "eur-lex.europa.eu",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_open_hosts() -> Vec<String> {
    [
        "owasp.org",
        "www.owasp.org",
        "enisa.europa.eu",
        "www.enisa.europa.eu",
        "cisa.gov",
        "www.cisa.gov",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_banned_markers() -> Vec<String> {
    [
        r"sybex",
        r"oreilly",
        r"o'reilly",
        r"official study guide",
        r"brain dump",
        r"braindump",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: default_allowed_hosts(),
            open_hosts: default_open_hosts(),
            banned_markers: default_banned_markers(),
        }
    }
}

/// Top-level bankqa configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QaConfig {
    #[serde(default)]
    pub distribution: DistributionConfig,
    #[serde(default)]
    pub lint: LintConfig,
    #[serde(default)]
    pub citations: CitationConfig,
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without a path:
/// 1. `bankqa.toml` in the current directory
/// 2. `~/.config/bankqa/config.toml`
///
/// Environment variable override: `BANKQA_PROFILE` (`human` or `strict`).
pub fn load_config_from(path: Option<&Path>) -> Result<QaConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("bankqa.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match &config_path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<QaConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QaConfig::default(),
    };

    if let Ok(profile) = std::env::var("BANKQA_PROFILE") {
        config.lint.profile = profile
            .parse()
            .map_err(|e: String| anyhow::anyhow!("BANKQA_PROFILE: {e}"))?;
    }

    anyhow::ensure!(
        (0.0..=1.0).contains(&config.distribution.position_bias_share),
        "distribution.position_bias_share must be between 0.0 and 1.0"
    );
    anyhow::ensure!(
        config.distribution.easy_max < config.distribution.hard_min,
        "distribution.easy_max must be below distribution.hard_min"
    );

    match &config_path {
        Some(p) => tracing::debug!(path = %p.display(), "loaded config"),
        None => tracing::debug!("using built-in config defaults"),
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("bankqa"))
}

/// Starter config written by `bankqa init`.
pub const SAMPLE_CONFIG: &str = r#"# bankqa configuration
#
# All thresholds are heuristic defaults; tune them against your bank.

[distribution]
position_bias_share = 0.70
min_pool_size = 100
easy_max = -0.6
hard_min = 0.7

[lint]
profile = "human"
min_stem_words = 10
max_stem_words = 120
min_explanation_words = 20
length_ratio = 2.8
short_choice_chars = 12
overlap_delta = 0.35
min_judgment_level = 2
low_quality_sample = 50

[citations]
# allowed_hosts = ["csrc.nist.gov", "www.rfc-editor.org"]
# banned_markers = ["braindump"]
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = QaConfig::default();
        assert_eq!(config.distribution.min_pool_size, 100);
        assert_eq!(config.lint.length_ratio, 2.8);
        assert_eq!(config.lint.profile, Profile::Human);
        assert!(config
            .citations
            .allowed_hosts
            .iter()
            .any(|h| h == "csrc.nist.gov"));
    }

    #[test]
    fn sample_config_parses_to_defaults() {
        let config: QaConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config, QaConfig::default());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let toml_str = r#"
[lint]
profile = "strict"
overlap_delta = 0.5
"#;
        let config: QaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.lint.profile, Profile::Strict);
        assert_eq!(config.lint.overlap_delta, 0.5);
        assert_eq!(config.lint.min_stem_words, 10);
        assert_eq!(config.distribution, DistributionConfig::default());
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let result = load_config_from(Some(Path::new("/no/such/bankqa.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bankqa.toml");
        std::fs::write(&path, "[distribution]\nmin_pool_size = 10\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.distribution.min_pool_size, 10);
    }

    #[test]
    fn inverted_bands_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bankqa.toml");
        std::fs::write(&path, "[distribution]\neasy_max = 1.0\nhard_min = 0.5\n").unwrap();
        assert!(load_config_from(Some(&path)).is_err());
    }
}
