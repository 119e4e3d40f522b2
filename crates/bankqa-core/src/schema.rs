//! Per-item structural checks.
//!
//! Every item is checked in isolation and every problem is collected;
//! nothing here stops early. Duplicate ids are reported after the pass.

use std::collections::BTreeMap;

use crate::finding::Finding;
use crate::model::{Bank, Field, Item, ItemType, KeyStatus};
use crate::text::whitespace_normalize;

/// Run the schema checks over every item in `bank`.
pub fn validate_schema(bank: &Bank) -> Vec<Finding> {
    let mut findings = Vec::new();

    for item in &bank.items {
        check_item(item, &mut findings);
    }
    findings.extend(duplicate_ids(bank));

    findings
}

/// Structural findings for one item.
pub fn check_item(item: &Item, findings: &mut Vec<Finding>) {
    let label = item.label();

    if !item.is_object {
        findings.push(Finding::error(
            "invalid_item",
            &label,
            "Item is not a JSON object.",
        ));
        return;
    }

    match &item.id {
        Field::Invalid { found } => findings.push(Finding::error(
            "missing_id",
            &label,
            format!("'id' must be a string, found {found}."),
        )),
        _ if item.id.is_blank() => {
            findings.push(Finding::error("missing_id", &label, "Missing 'id'."))
        }
        _ => {}
    }

    if let Some(declared) = item.declared_type.value() {
        if declared.parse::<ItemType>().is_err() {
            findings.push(Finding::warning(
                "unknown_item_type",
                &label,
                format!("Unknown item type '{declared}'; treated as single-answer."),
            ));
        }
    } else if let Field::Invalid { found } = item.declared_type {
        findings.push(Finding::warning(
            "unknown_item_type",
            &label,
            format!("'type' must be a string, found {found}; treated as single-answer."),
        ));
    }

    if item.stem.is_blank() {
        findings.push(Finding::error(
            "missing_stem",
            &label,
            "Missing/invalid 'stem'.",
        ));
    }

    if item.has_valid_choices() {
        check_answer_key(item, &label, findings);
        check_duplicate_choices(item, &label, findings);
    } else {
        let detail = match &item.choices {
            Field::Missing => "missing".to_string(),
            Field::Invalid { found } => format!("expected a list of strings, found {found}"),
            Field::Value(c) => format!("{} entr{}, need at least 2", c.len(), plural_y(c.len())),
        };
        findings.push(Finding::error(
            "invalid_choices",
            &label,
            format!("Invalid 'choices': {detail}."),
        ));
    }

    check_numeric(&item.difficulty, "difficulty", &label, findings);
    check_numeric(&item.discrimination, "discrimination", &label, findings);

    if item.explanation.is_blank() {
        findings.push(Finding::warning(
            "missing_explanation",
            &label,
            "Missing explanation text.",
        ));
    }
}

fn check_answer_key(item: &Item, label: &str, findings: &mut Vec<Finding>) {
    let (kind, field) = match item.item_type() {
        ItemType::SingleAnswer => ("invalid_correct_index", "correctIndex"),
        ItemType::MultiSelect => ("invalid_correct_answers", "correctAnswers"),
        ItemType::Ordering => ("invalid_correct_order", "correctOrder"),
    };
    match item.key_status() {
        KeyStatus::Valid(_) => {}
        KeyStatus::Missing if item.item_type() == ItemType::SingleAnswer => {
            findings.push(Finding::error(
                kind,
                label,
                "Invalid 'correctIndex': missing.",
            ));
        }
        KeyStatus::Missing => findings.push(Finding::error(
            "missing_answer_key",
            label,
            format!("{} item has no '{field}'.", item.item_type()),
        )),
        KeyStatus::Invalid(reason) => findings.push(Finding::error(
            kind,
            label,
            format!("Invalid '{field}': {reason}."),
        )),
    }
}

fn check_duplicate_choices(item: &Item, label: &str, findings: &mut Vec<Finding>) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for choice in item.choices() {
        *counts.entry(whitespace_normalize(choice)).or_insert(0) += 1;
    }
    let repeated: Vec<&str> = counts
        .iter()
        .filter(|(_, &n)| n > 1)
        .map(|(c, _)| c.as_str())
        .collect();
    if !repeated.is_empty() {
        findings.push(Finding::error(
            "duplicate_choices",
            label,
            format!("Duplicate choices: {repeated:?}."),
        ));
    }
}

fn check_numeric(field: &Field<f64>, name: &str, label: &str, findings: &mut Vec<Finding>) {
    match field {
        Field::Value(_) => {}
        Field::Missing => findings.push(Finding::error(
            &format!("missing_{name}"),
            label,
            format!("Missing '{name}'."),
        )),
        Field::Invalid { found } => findings.push(Finding::error(
            &format!("non_numeric_{name}"),
            label,
            format!("Non-numeric '{name}': found {found}."),
        )),
    }
}

/// One error per id value that occurs more than once.
pub fn duplicate_ids(bank: &Bank) -> Vec<Finding> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for item in &bank.items {
        if !item.id.is_blank() {
            *counts.entry(item.id.text()).or_insert(0) += 1;
        }
    }

    // First-occurrence order keeps the finding list stable across runs.
    let mut reported = Vec::new();
    for item in &bank.items {
        let id = item.id.text();
        if counts.get(id).is_some_and(|&n| n > 1) && !reported.contains(&id) {
            reported.push(id);
        }
    }

    reported
        .into_iter()
        .map(|id| {
            Finding::error(
                "duplicate_item_id",
                id,
                format!("Duplicate item id: {id} ({} occurrences).", counts[id]),
            )
        })
        .collect()
}

fn plural_y(n: usize) -> &'static str {
    if n == 1 {
        "y"
    } else {
        "ies"
    }
}
