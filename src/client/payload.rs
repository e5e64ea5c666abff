//! Normalisation of the response shapes the data service returns
//!
//! Bodies arrive as a bare array, a bare object, or an object wrapping the
//! real content in a `data`, `results` or `items` field. Everything is folded
//! into [`Payload`] before any field is read.

use serde_json::{Map, Value};

pub type Record = Map<String, Value>;

const ENVELOPE_KEYS: [&str; 3] = ["data", "results", "items"];

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    One(Record),
    Many(Vec<Record>),
}

impl Payload {
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(Self::Empty),
            Value::Array(values) => {
                let records = values
                    .into_iter()
                    .map(|value| match value {
                        Value::Object(record) => Ok(record),
                        other => Err(format!("array element is not an object: {other}")),
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                if records.is_empty() {
                    Ok(Self::Empty)
                } else {
                    Ok(Self::Many(records))
                }
            }
            Value::Object(mut record) => {
                if record.is_empty() || signals_absence(&record) {
                    return Ok(Self::Empty);
                }

                let envelope = ENVELOPE_KEYS.iter().find(|key| {
                    matches!(
                        record.get(**key),
                        Some(Value::Array(_) | Value::Object(_) | Value::Null)
                    )
                });

                match envelope.and_then(|key| record.remove(*key)) {
                    Some(inner) => Self::from_value(inner),
                    None => Ok(Self::One(record)),
                }
            }
            other => Err(format!("expected an object or array, got {other}")),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::One(_) => 1,
            Self::Many(records) => records.len(),
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        match self {
            Self::Empty => Vec::new(),
            Self::One(record) => vec![record],
            Self::Many(records) => records,
        }
    }
}

/// `{"error": ...}` and `{"success": false}` mean "nothing here"
fn signals_absence(record: &Record) -> bool {
    record.get("error").is_some_and(|e| !e.is_null())
        || record.get("success") == Some(&Value::Bool(false))
}
