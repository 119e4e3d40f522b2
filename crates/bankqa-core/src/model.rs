//! Core data model types for bankqa.
//!
//! A [`Bank`] is a typed, read-only projection of one bank file. Item
//! fields are decoded into [`Field`] so that a missing value and a
//! wrong-typed value stay distinguishable all the way to the checks.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Blueprint domains with their target share of the exam (percent).
pub const BLUEPRINT: [(&str, u32); 8] = [
    ("1. Security and Risk Management", 16),
    ("2. Asset Security", 10),
    ("3. Security Architecture and Engineering", 13),
    ("4. Communication and Network Security", 13),
    ("5. Identity and Access Management (IAM)", 13),
    ("6. Security Assessment and Testing", 12),
    ("7. Security Operations", 13),
    ("8. Software Development Security", 10),
];

/// Historical spellings mapped onto blueprint names.
const DOMAIN_ALIASES: [(&str, &str); 8] = [
    (
        "1 Security and Risk Management",
        "1. Security and Risk Management",
    ),
    ("2 Asset Security", "2. Asset Security"),
    (
        "3 Security Architecture and Engineering",
        "3. Security Architecture and Engineering",
    ),
    (
        "4 Communication and Network Security",
        "4. Communication and Network Security",
    ),
    (
        "5 Identity and Access Management",
        "5. Identity and Access Management (IAM)",
    ),
    (
        "6 Security Assessment and Testing",
        "6. Security Assessment and Testing",
    ),
    ("7 Security Operations", "7. Security Operations"),
    (
        "8 Software Development Security",
        "8. Software Development Security",
    ),
];

/// Map a raw domain label onto its blueprint spelling.
///
/// Unknown labels are returned trimmed but otherwise unchanged.
pub fn canonical_domain(raw: &str) -> String {
    let raw = raw.trim();
    if is_blueprint_domain(raw) {
        return raw.to_string();
    }
    DOMAIN_ALIASES
        .iter()
        .find(|(alias, _)| *alias == raw)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| raw.to_string())
}

pub fn is_blueprint_domain(domain: &str) -> bool {
    blueprint_weight(domain).is_some()
}

/// Target exam share (percent) of a canonical blueprint domain.
pub fn blueprint_weight(domain: &str) -> Option<u32> {
    BLUEPRINT
        .iter()
        .find(|(name, _)| *name == domain)
        .map(|(_, weight)| *weight)
}

/// A decoded value that may be absent or of the wrong JSON type.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// Key absent or `null`.
    Missing,
    /// Key present with the wrong JSON type; `found` names what was seen.
    Invalid { found: &'static str },
    Value(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Missing
    }
}

impl<T> Field<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Field::Invalid { .. })
    }
}

impl Field<String> {
    /// The string value, or `""` when missing or wrong-typed.
    pub fn text(&self) -> &str {
        self.value().map(String::as_str).unwrap_or("")
    }

    /// `true` if the value is absent, wrong-typed or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.text().trim().is_empty()
    }
}

/// How an item is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    /// One correct choice, keyed by `correctIndex`.
    SingleAnswer,
    /// A set of correct choices, keyed by `correctAnswers`.
    MultiSelect,
    /// Choices to be arranged, keyed by `correctOrder`.
    Ordering,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::SingleAnswer => write!(f, "mcq"),
            ItemType::MultiSelect => write!(f, "dragdrop"),
            ItemType::Ordering => write!(f, "ordering"),
        }
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mcq" | "single" | "hotspot" => Ok(ItemType::SingleAnswer),
            "dragdrop" | "multi" | "multiselect" | "multi-select" => Ok(ItemType::MultiSelect),
            "ordering" => Ok(ItemType::Ordering),
            other => Err(format!("unknown item type: {other}")),
        }
    }
}

/// Outcome of checking an item's answer key against its choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStatus {
    /// The keyed choice indices (for ordering, the full order).
    Valid(Vec<usize>),
    /// The key field required by the item type is absent.
    Missing,
    /// The key is present but unusable; the string says why.
    Invalid(String),
}

impl KeyStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, KeyStatus::Valid(_))
    }
}

/// One test item.
#[derive(Debug, Clone, Default)]
pub struct Item {
    /// 1-based position in the bank file.
    pub ordinal: usize,
    /// `false` if the JSON value was not an object at all.
    pub is_object: bool,
    pub id: Field<String>,
    pub declared_type: Field<String>,
    pub domain: Field<String>,
    pub stem: Field<String>,
    pub choices: Field<Vec<String>>,
    pub correct_index: Field<i64>,
    pub correct_answers: Field<Vec<i64>>,
    pub correct_order: Field<Vec<i64>>,
    pub difficulty: Field<f64>,
    pub discrimination: Field<f64>,
    pub explanation: Field<String>,
    pub source_ids: Field<Vec<String>>,
    pub question_type: Field<String>,
    pub judgment_level: Field<i64>,
    pub pilot_eligible: Field<bool>,
    pub is_synthetic_variant: Field<bool>,
    pub variant_of: Field<String>,
}

impl Item {
    /// The label findings use: the id when present, else `#<ordinal>`.
    pub fn label(&self) -> String {
        if self.id.is_blank() {
            format!("#{}", self.ordinal)
        } else {
            self.id.text().to_string()
        }
    }

    /// Resolved item type; missing or unrecognised types fall back to
    /// single-answer so legacy banks keep loading.
    pub fn item_type(&self) -> ItemType {
        self.declared_type
            .value()
            .and_then(|t| t.parse().ok())
            .unwrap_or(ItemType::SingleAnswer)
    }

    pub fn choices(&self) -> &[String] {
        self.choices.value().map(Vec::as_slice).unwrap_or(&[])
    }

    /// `true` when `choices` is a list of at least two entries.
    pub fn has_valid_choices(&self) -> bool {
        self.choices.value().is_some_and(|c| c.len() >= 2)
    }

    pub fn canonical_domain(&self) -> Option<String> {
        self.domain.value().map(|d| canonical_domain(d))
    }

    /// Question style metadata, `"scenario"` when unset.
    pub fn question_type(&self) -> &str {
        self.question_type
            .value()
            .map(String::as_str)
            .unwrap_or("scenario")
    }

    /// Check the answer key required by [`Item::item_type`].
    pub fn key_status(&self) -> KeyStatus {
        let n = self.choices().len();
        match self.item_type() {
            ItemType::SingleAnswer => match &self.correct_index {
                Field::Missing => KeyStatus::Missing,
                Field::Invalid { found } => {
                    KeyStatus::Invalid(format!("correctIndex must be an integer, found {found}"))
                }
                Field::Value(ci) => match index_in_range(*ci, n) {
                    Some(i) => KeyStatus::Valid(vec![i]),
                    None => KeyStatus::Invalid(format!(
                        "correctIndex {ci} is outside 0..{n}"
                    )),
                },
            },
            ItemType::MultiSelect => match &self.correct_answers {
                Field::Missing => KeyStatus::Missing,
                Field::Invalid { found } => KeyStatus::Invalid(format!(
                    "correctAnswers must be a list of integers, found {found}"
                )),
                Field::Value(answers) => {
                    if answers.is_empty() {
                        return KeyStatus::Invalid("correctAnswers is empty".into());
                    }
                    let mut seen = vec![false; n];
                    let mut keyed = Vec::with_capacity(answers.len());
                    for &a in answers {
                        let Some(i) = index_in_range(a, n) else {
                            return KeyStatus::Invalid(format!(
                                "correctAnswers entry {a} is outside 0..{n}"
                            ));
                        };
                        if seen[i] {
                            return KeyStatus::Invalid(format!(
                                "correctAnswers repeats index {i}"
                            ));
                        }
                        seen[i] = true;
                        keyed.push(i);
                    }
                    KeyStatus::Valid(keyed)
                }
            },
            ItemType::Ordering => match &self.correct_order {
                Field::Missing => KeyStatus::Missing,
                Field::Invalid { found } => KeyStatus::Invalid(format!(
                    "correctOrder must be a list of integers, found {found}"
                )),
                Field::Value(order) => {
                    if order.len() != n {
                        return KeyStatus::Invalid(format!(
                            "correctOrder has {} entries for {n} choices",
                            order.len()
                        ));
                    }
                    let mut seen = vec![false; n];
                    let mut keyed = Vec::with_capacity(n);
                    for &o in order {
                        match index_in_range(o, n) {
                            Some(i) if !seen[i] => {
                                seen[i] = true;
                                keyed.push(i);
                            }
                            _ => {
                                return KeyStatus::Invalid(format!(
                                    "correctOrder is not a permutation of 0..{n}"
                                ))
                            }
                        }
                    }
                    KeyStatus::Valid(keyed)
                }
            },
        }
    }

    /// Indices of keyed choices that have distractors to compare against.
    /// Ordering items have none.
    pub fn keyed_choices(&self) -> Option<Vec<usize>> {
        if self.item_type() == ItemType::Ordering {
            return None;
        }
        match self.key_status() {
            KeyStatus::Valid(keyed) => Some(keyed),
            _ => None,
        }
    }
}

fn index_in_range(value: i64, len: usize) -> Option<usize> {
    usize::try_from(value).ok().filter(|&i| i < len)
}

/// A source-catalog entry.
#[derive(Debug, Clone, Default)]
pub struct SourceEntry {
    /// `false` if the catalog value was not an object.
    pub is_object: bool,
    pub title: Field<String>,
    pub url: Field<String>,
}

/// The decoded bank file.
#[derive(Debug, Clone, Default)]
pub struct Bank {
    pub items: Vec<Item>,
    /// Catalog keyed by source id, in sorted order.
    pub source_catalog: BTreeMap<String, SourceEntry>,
    /// `false` when the file had no `sourceCatalog` member.
    pub catalog_present: bool,
}

impl Bank {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Count of distinct non-blank item ids.
    pub fn unique_item_ids(&self) -> usize {
        let mut ids: Vec<&str> = self
            .items
            .iter()
            .filter(|i| !i.id.is_blank())
            .map(|i| i.id.text())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Items per canonical domain. Items without a domain count under `""`.
    pub fn domain_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.items {
            let domain = item.canonical_domain().unwrap_or_default();
            *counts.entry(domain).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_with(choices: &[&str]) -> Item {
        Item {
            ordinal: 1,
            is_object: true,
            choices: Field::Value(choices.iter().map(|c| c.to_string()).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn domain_aliases_canonicalize() {
        assert_eq!(
            canonical_domain(" 5 Identity and Access Management "),
            "5. Identity and Access Management (IAM)"
        );
        assert_eq!(canonical_domain("2. Asset Security"), "2. Asset Security");
        assert_eq!(canonical_domain("Cloud"), "Cloud");
        assert!(!is_blueprint_domain("Cloud"));
    }

    #[test]
    fn blueprint_weights_cover_the_exam() {
        assert_eq!(BLUEPRINT.iter().map(|(_, w)| w).sum::<u32>(), 100);
        assert_eq!(blueprint_weight("1. Security and Risk Management"), Some(16));
        assert_eq!(blueprint_weight("1 Security and Risk Management"), None);
    }

    #[test]
    fn item_type_parse() {
        assert_eq!("mcq".parse::<ItemType>().unwrap(), ItemType::SingleAnswer);
        assert_eq!("hotspot".parse::<ItemType>().unwrap(), ItemType::SingleAnswer);
        assert_eq!("DragDrop".parse::<ItemType>().unwrap(), ItemType::MultiSelect);
        assert_eq!("ordering".parse::<ItemType>().unwrap(), ItemType::Ordering);
        assert!("essay".parse::<ItemType>().is_err());
    }

    #[test]
    fn label_falls_back_to_ordinal() {
        let mut item = item_with(&["a", "b"]);
        item.ordinal = 7;
        assert_eq!(item.label(), "#7");
        item.id = Field::Value("q-1".into());
        assert_eq!(item.label(), "q-1");
        item.id = Field::Value("item-7".into());
        assert_ne!(item.label(), Item { ordinal: 7, ..Default::default() }.label());
    }

    #[test]
    fn single_answer_key_bounds() {
        let mut item = item_with(&["a", "b", "c"]);
        assert_eq!(item.key_status(), KeyStatus::Missing);
        item.correct_index = Field::Value(2);
        assert_eq!(item.key_status(), KeyStatus::Valid(vec![2]));
        item.correct_index = Field::Value(3);
        assert!(matches!(item.key_status(), KeyStatus::Invalid(_)));
        item.correct_index = Field::Value(-1);
        assert!(matches!(item.key_status(), KeyStatus::Invalid(_)));
    }

    #[test]
    fn multi_select_key_rejects_repeats() {
        let mut item = item_with(&["a", "b", "c", "d"]);
        item.declared_type = Field::Value("dragdrop".into());
        item.correct_answers = Field::Value(vec![0, 2]);
        assert_eq!(item.key_status(), KeyStatus::Valid(vec![0, 2]));
        item.correct_answers = Field::Value(vec![0, 0]);
        assert!(matches!(item.key_status(), KeyStatus::Invalid(_)));
        item.correct_answers = Field::Value(vec![]);
        assert!(matches!(item.key_status(), KeyStatus::Invalid(_)));
    }

    #[test]
    fn ordering_key_must_be_permutation() {
        let mut item = item_with(&["a", "b", "c"]);
        item.declared_type = Field::Value("ordering".into());
        assert_eq!(item.key_status(), KeyStatus::Missing);
        item.correct_order = Field::Value(vec![2, 0, 1]);
        assert_eq!(item.key_status(), KeyStatus::Valid(vec![2, 0, 1]));
        item.correct_order = Field::Value(vec![0, 0, 1]);
        assert!(matches!(item.key_status(), KeyStatus::Invalid(_)));
        item.correct_order = Field::Value(vec![0, 1]);
        assert!(matches!(item.key_status(), KeyStatus::Invalid(_)));
        assert!(item.keyed_choices().is_none());
    }
}
