//! Source citation checks.
//!
//! Items must cite catalog entries, and catalog entries must point at
//! trusted hosts. The stricter open-origin mode additionally pins both
//! sides to an externally supplied list of permitted source ids and
//! rejects text that carries proprietary-material markers. Both modes are
//! the same pass driven by a different [`CitationPolicy`].

use std::collections::BTreeSet;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::CitationConfig;
use crate::error::BankResult;
use crate::finding::Finding;
use crate::model::{Bank, Field, Item, SourceEntry};

/// Which citation policy a run enforces.
#[derive(Debug, Clone)]
pub struct CitationPolicy {
    /// Lower-cased hosts a catalog URL may use.
    pub allowed_hosts: BTreeSet<String>,
    /// Permitted source ids; `Some` selects open-origin mode.
    pub open_catalog: Option<BTreeSet<String>>,
    banned_markers: Vec<Regex>,
}

impl CitationPolicy {
    /// Catalog consistency: items vs catalog, catalog vs host allow-list.
    pub fn catalog_consistency(config: &CitationConfig) -> Self {
        Self {
            allowed_hosts: lowercase_set(&config.allowed_hosts),
            open_catalog: None,
            banned_markers: Vec::new(),
        }
    }

    /// Open-origin: catalog consistency plus the open catalog and
    /// proprietary-marker checks.
    pub fn open_origin(config: &CitationConfig, open_ids: BTreeSet<String>) -> BankResult<Self> {
        let mut allowed_hosts = lowercase_set(&config.allowed_hosts);
        allowed_hosts.extend(lowercase_set(&config.open_hosts));
        let banned_markers = config
            .banned_markers
            .iter()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            allowed_hosts,
            open_catalog: Some(open_ids),
            banned_markers,
        })
    }

    pub fn is_open_origin(&self) -> bool {
        self.open_catalog.is_some()
    }

    fn host_allowed(&self, host: &str) -> bool {
        self.allowed_hosts.contains(&host.to_ascii_lowercase())
    }

    fn in_open_catalog(&self, id: &str) -> bool {
        self.open_catalog
            .as_ref()
            .map_or(true, |ids| ids.contains(id))
    }
}

fn lowercase_set(hosts: &[String]) -> BTreeSet<String> {
    hosts.iter().map(|h| h.trim().to_ascii_lowercase()).collect()
}

/// Citation counters for the report summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationStats {
    pub source_catalog_count: usize,
    /// Items whose every sourceId resolves in the catalog.
    pub source_coverage_count: usize,
}

/// Run the citation checks under `policy`.
pub fn validate_citations(bank: &Bank, policy: &CitationPolicy) -> (Vec<Finding>, CitationStats) {
    let mut findings = Vec::new();
    let mut stats = CitationStats {
        source_catalog_count: bank.source_catalog.len(),
        source_coverage_count: 0,
    };

    for (id, entry) in &bank.source_catalog {
        check_catalog_entry(id, entry, policy, &mut findings);
    }

    for item in bank.items.iter().filter(|i| i.is_object) {
        if check_item_sources(item, bank, policy, &mut findings) {
            stats.source_coverage_count += 1;
        }
        if !policy.banned_markers.is_empty() {
            check_markers(item, policy, &mut findings);
        }
    }

    (findings, stats)
}

fn check_catalog_entry(
    id: &str,
    entry: &SourceEntry,
    policy: &CitationPolicy,
    findings: &mut Vec<Finding>,
) {
    let label = format!("source:{id}");

    if !entry.is_object {
        findings.push(Finding::error(
            "invalid_source_entry",
            &label,
            format!("sourceCatalog entry '{id}' must be an object."),
        ));
        return;
    }

    if !policy.in_open_catalog(id) {
        findings.push(Finding::error(
            "source_not_in_open_catalog",
            &label,
            format!("sourceCatalog id not in open catalog: {id}."),
        ));
    }

    if entry.title.is_blank() {
        findings.push(Finding::warning(
            "missing_source_title",
            &label,
            format!("sourceCatalog entry '{id}' has no title."),
        ));
    }

    if entry.url.is_blank() {
        findings.push(Finding::error(
            "missing_source_url",
            &label,
            format!("sourceCatalog entry '{id}' missing URL."),
        ));
        return;
    }

    let raw = entry.url.text().trim();
    let host = match Url::parse(raw) {
        Ok(url) => url.host_str().map(str::to_ascii_lowercase),
        Err(e) => {
            findings.push(Finding::error(
                "invalid_source_url",
                &label,
                format!("sourceCatalog entry '{id}' has unparseable URL '{raw}': {e}."),
            ));
            return;
        }
    };

    match host {
        None => findings.push(Finding::error(
            "invalid_source_url",
            &label,
            format!("sourceCatalog entry '{id}' URL has no host: '{raw}'."),
        )),
        Some(host) if !policy.host_allowed(&host) => findings.push(Finding::error(
            "disallowed_source_host",
            &label,
            format!("sourceCatalog entry '{id}' uses untrusted host: {host}."),
        )),
        Some(_) => {}
    }
}

/// Returns `true` when every cited id resolves in the catalog.
fn check_item_sources(
    item: &Item,
    bank: &Bank,
    policy: &CitationPolicy,
    findings: &mut Vec<Finding>,
) -> bool {
    let label = item.label();
    let ids = match &item.source_ids {
        Field::Value(ids) if !ids.is_empty() => ids,
        Field::Invalid { found } => {
            findings.push(Finding::error(
                "missing_source_ids",
                &label,
                format!("'sourceIds' must be a list of strings, found {found}."),
            ));
            return false;
        }
        _ => {
            findings.push(Finding::error(
                "missing_source_ids",
                &label,
                "Missing sourceIds citations.",
            ));
            return false;
        }
    };

    let unknown: Vec<&str> = ids
        .iter()
        .filter(|id| !bank.source_catalog.contains_key(id.as_str()))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        findings.push(Finding::error(
            "unknown_source_ids",
            &label,
            format!("References unknown sourceIds: {unknown:?}."),
        ));
    }

    let not_open: Vec<&str> = ids
        .iter()
        .filter(|id| !policy.in_open_catalog(id))
        .map(String::as_str)
        .collect();
    if !not_open.is_empty() {
        findings.push(Finding::error(
            "source_not_in_open_catalog",
            &label,
            format!("sourceIds not allowed by open catalog: {not_open:?}."),
        ));
    }

    unknown.is_empty()
}

fn check_markers(item: &Item, policy: &CitationPolicy, findings: &mut Vec<Finding>) {
    let blob = format!(
        "{} {} {}",
        item.stem.text(),
        item.explanation.text(),
        item.choices().join(" ")
    );
    if let Some(pattern) = policy.banned_markers.iter().find(|re| re.is_match(&blob)) {
        findings.push(Finding::error(
            "proprietary_marker",
            item.label(),
            format!("Banned proprietary marker matched: {}.", pattern.as_str()),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Level;
    use crate::parser::parse_bank;

    const BANK: &str = r#"{
  "items": [
    {"id": "q-1", "stem": "s", "sourceIds": ["nist"]},
    {"id": "q-2", "stem": "s", "sourceIds": ["nist", "ghost"]},
    {"id": "q-3", "stem": "s", "sourceIds": []},
    {"id": "q-4", "stem": "From the Official Study Guide, chapter 3", "sourceIds": ["blog"]}
  ],
  "sourceCatalog": {
    "blog": {"title": "A blog", "url": "https://example.com/post"},
    "broken": {"title": "Broken", "url": "not a url"},
    "nist": {"title": "SP 800-53", "url": "https://CSRC.nist.gov/pubs"},
    "nourl": {"title": "No URL"},
    "scalar": 5
  }
}"#;

    fn kinds_for<'a>(findings: &'a [Finding], item: &str) -> Vec<&'a str> {
        findings
            .iter()
            .filter(|f| f.item == item)
            .map(|f| f.kind.as_str())
            .collect()
    }

    #[test]
    fn catalog_consistency_mode() {
        let bank = parse_bank(BANK.as_bytes()).unwrap();
        let policy = CitationPolicy::catalog_consistency(&CitationConfig::default());
        let (findings, stats) = validate_citations(&bank, &policy);

        assert_eq!(kinds_for(&findings, "source:blog"), vec!["disallowed_source_host"]);
        assert_eq!(kinds_for(&findings, "source:broken"), vec!["invalid_source_url"]);
        assert!(kinds_for(&findings, "source:nist").is_empty());
        assert_eq!(kinds_for(&findings, "source:nourl"), vec!["missing_source_url"]);
        assert_eq!(kinds_for(&findings, "source:scalar"), vec!["invalid_source_entry"]);

        assert!(kinds_for(&findings, "q-1").is_empty());
        assert_eq!(kinds_for(&findings, "q-2"), vec!["unknown_source_ids"]);
        assert_eq!(kinds_for(&findings, "q-3"), vec!["missing_source_ids"]);
        assert!(kinds_for(&findings, "q-4").is_empty());
        assert!(findings.iter().all(Finding::is_error));

        assert_eq!(stats.source_catalog_count, 5);
        assert_eq!(stats.source_coverage_count, 2);
    }

    #[test]
    fn open_origin_mode() {
        let bank = parse_bank(BANK.as_bytes()).unwrap();
        let open: BTreeSet<String> = ["nist".to_string()].into_iter().collect();
        let policy = CitationPolicy::open_origin(&CitationConfig::default(), open).unwrap();
        assert!(policy.is_open_origin());
        let (findings, _) = validate_citations(&bank, &policy);

        assert_eq!(
            kinds_for(&findings, "source:blog"),
            vec!["source_not_in_open_catalog", "disallowed_source_host"]
        );
        assert!(kinds_for(&findings, "q-1").is_empty());
        assert_eq!(
            kinds_for(&findings, "q-2"),
            vec!["unknown_source_ids", "source_not_in_open_catalog"]
        );
        assert_eq!(
            kinds_for(&findings, "q-4"),
            vec!["source_not_in_open_catalog", "proprietary_marker"]
        );
    }

    #[test]
    fn untitled_source_is_a_warning() {
        let bank = parse_bank(
            br#"{"items": [], "sourceCatalog": {
                "blank": {"title": "  ", "url": "https://csrc.nist.gov/pubs"},
                "none": {"url": "not a url"}
            }}"#,
        )
        .unwrap();
        let policy = CitationPolicy::catalog_consistency(&CitationConfig::default());
        let (findings, _) = validate_citations(&bank, &policy);

        assert_eq!(kinds_for(&findings, "source:blank"), vec!["missing_source_title"]);
        assert_eq!(findings[0].level, Level::Warning);
        assert_eq!(
            kinds_for(&findings, "source:none"),
            vec!["missing_source_title", "invalid_source_url"]
        );
    }

    #[test]
    fn open_hosts_only_in_open_mode() {
        let config = CitationConfig::default();
        let strict = CitationPolicy::catalog_consistency(&config);
        assert!(!strict.host_allowed("owasp.org"));
        let open = CitationPolicy::open_origin(&config, BTreeSet::new()).unwrap();
        assert!(open.host_allowed("OWASP.org"));
    }

    #[test]
    fn bad_marker_pattern_is_error() {
        let config = CitationConfig {
            banned_markers: vec!["(unclosed".into()],
            ..Default::default()
        };
        assert!(CitationPolicy::open_origin(&config, BTreeSet::new()).is_err());
    }
}
