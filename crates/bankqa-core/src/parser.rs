//! JSON bank loader.
//!
//! Decodes a bank file into a [`Bank`]. Only a top-level shape problem is
//! fatal; per-item type problems are kept as [`Field::Invalid`] so the
//! schema validator can report them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{BankError, BankResult};
use crate::model::{Bank, Field, Item, SourceEntry};

/// A bank together with the exact bytes it was decoded from.
#[derive(Debug, Clone)]
pub struct BankFile {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub bank: Bank,
}

/// Read and decode a bank file.
pub fn load_bank(path: &Path) -> BankResult<BankFile> {
    let bytes = std::fs::read(path).map_err(|source| BankError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bank = parse_bank(&bytes)?;
    tracing::debug!(
        path = %path.display(),
        items = bank.items.len(),
        sources = bank.source_catalog.len(),
        "decoded bank"
    );
    Ok(BankFile {
        path: path.to_path_buf(),
        bytes,
        bank,
    })
}

/// Decode bank bytes (useful for testing).
pub fn parse_bank(bytes: &[u8]) -> BankResult<Bank> {
    let root: Value = serde_json::from_slice(bytes)
        .map_err(|e| BankError::MalformedBank(format!("invalid JSON: {e}")))?;
    let Value::Object(root) = root else {
        return Err(BankError::MalformedBank(format!(
            "top level must be an object, found {}",
            json_type(&root)
        )));
    };

    let items = match root.get("items") {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(BankError::MalformedBank(format!(
                "top-level 'items' must be a list, found {}",
                json_type(other)
            )))
        }
        None => {
            return Err(BankError::MalformedBank(
                "top-level 'items' is missing".into(),
            ))
        }
    };

    let (source_catalog, catalog_present) = match root.get("sourceCatalog") {
        Some(Value::Object(catalog)) => (decode_catalog(catalog), true),
        None | Some(Value::Null) => (BTreeMap::new(), false),
        Some(other) => {
            return Err(BankError::MalformedBank(format!(
                "top-level 'sourceCatalog' must be an object, found {}",
                json_type(other)
            )))
        }
    };

    let items = items
        .iter()
        .enumerate()
        .map(|(i, value)| decode_item(i + 1, value))
        .collect();

    Ok(Bank {
        items,
        source_catalog,
        catalog_present,
    })
}

/// Load an open-source catalog: a JSON object whose keys are permitted
/// source ids.
pub fn load_open_catalog(path: &Path) -> BankResult<BTreeSet<String>> {
    let bytes = std::fs::read(path).map_err(|source| BankError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| BankError::OpenCatalog(format!("{}: {e}", path.display())))?;
    match value {
        Value::Object(map) => Ok(map.keys().cloned().collect()),
        other => Err(BankError::OpenCatalog(format!(
            "{}: expected an object keyed by source id, found {}",
            path.display(),
            json_type(&other)
        ))),
    }
}

fn decode_catalog(catalog: &Map<String, Value>) -> BTreeMap<String, SourceEntry> {
    catalog
        .iter()
        .map(|(id, value)| {
            let entry = match value.as_object() {
                Some(obj) => SourceEntry {
                    is_object: true,
                    title: string_field(obj, "title"),
                    url: string_field(obj, "url"),
                },
                None => SourceEntry::default(),
            };
            (id.clone(), entry)
        })
        .collect()
}

fn decode_item(ordinal: usize, value: &Value) -> Item {
    let Some(obj) = value.as_object() else {
        return Item {
            ordinal,
            ..Default::default()
        };
    };

    Item {
        ordinal,
        is_object: true,
        id: id_field(obj),
        declared_type: string_field(obj, "type"),
        domain: string_field(obj, "domain"),
        stem: string_field(obj, "stem"),
        choices: string_list_field(obj, "choices"),
        correct_index: int_field(obj, "correctIndex"),
        correct_answers: int_list_field(obj, "correctAnswers"),
        correct_order: int_list_field(obj, "correctOrder"),
        difficulty: number_field(obj, "difficulty"),
        discrimination: number_field(obj, "discrimination"),
        explanation: string_field(obj, "explanation"),
        source_ids: string_list_field(obj, "sourceIds"),
        question_type: string_field(obj, "questionType"),
        judgment_level: int_field(obj, "judgmentLevel"),
        pilot_eligible: bool_field(obj, "pilotEligible"),
        is_synthetic_variant: bool_field(obj, "isSyntheticVariant"),
        variant_of: string_field(obj, "variantOf"),
    }
}

/// Name of a JSON value's type, as reported in findings.
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn lookup<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

/// Ids may be written as integers in older banks; both decode to text.
fn id_field(obj: &Map<String, Value>) -> Field<String> {
    match lookup(obj, "id") {
        None => Field::Missing,
        Some(Value::String(s)) => Field::Value(s.clone()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Field::Value(n.to_string()),
        Some(other) => Field::Invalid {
            found: json_type(other),
        },
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Field<String> {
    match lookup(obj, key) {
        None => Field::Missing,
        Some(Value::String(s)) => Field::Value(s.clone()),
        Some(other) => Field::Invalid {
            found: json_type(other),
        },
    }
}

fn int_field(obj: &Map<String, Value>, key: &str) -> Field<i64> {
    match lookup(obj, key) {
        None => Field::Missing,
        Some(value) => match value.as_i64() {
            Some(n) => Field::Value(n),
            None => Field::Invalid {
                found: json_type(value),
            },
        },
    }
}

fn number_field(obj: &Map<String, Value>, key: &str) -> Field<f64> {
    match lookup(obj, key) {
        None => Field::Missing,
        // Numbers keep their source text, so an overflowing literal
        // lands here instead of failing the whole document.
        Some(Value::Number(n)) => match n.as_f64() {
            Some(x) if x.is_finite() => Field::Value(x),
            _ => Field::Invalid {
                found: "non-finite number",
            },
        },
        Some(other) => Field::Invalid {
            found: json_type(other),
        },
    }
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> Field<bool> {
    match lookup(obj, key) {
        None => Field::Missing,
        Some(Value::Bool(b)) => Field::Value(*b),
        Some(other) => Field::Invalid {
            found: json_type(other),
        },
    }
}

fn string_list_field(obj: &Map<String, Value>, key: &str) -> Field<Vec<String>> {
    match lookup(obj, key) {
        None => Field::Missing,
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(Field::Value)
            .unwrap_or(Field::Invalid {
                found: "array with non-string entries",
            }),
        Some(other) => Field::Invalid {
            found: json_type(other),
        },
    }
}

fn int_list_field(obj: &Map<String, Value>, key: &str) -> Field<Vec<i64>> {
    match lookup(obj, key) {
        None => Field::Missing,
        Some(Value::Array(values)) => values
            .iter()
            .map(Value::as_i64)
            .collect::<Option<Vec<_>>>()
            .map(Field::Value)
            .unwrap_or(Field::Invalid {
                found: "array with non-integer entries",
            }),
        Some(other) => Field::Invalid {
            found: json_type(other),
        },
    }
}
