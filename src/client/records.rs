//! Field extraction from normalised eqdb records
//!
//! eqdb and its mirrors disagree on field names and on whether numbers are
//! sent as numbers or strings, so each field is looked up under every name it
//! is known by.

use serde_json::Value;

use super::payload::Record;
use crate::models::{ItemRef, RawComponent, RawRecipeData};

const ITEM_ID: &[&str] = &["id", "item_id", "dbid"];
const ITEM_NAME: &[&str] = &["name", "item_name"];
const TRADESKILL: &[&str] = &["tradeskill", "tradeskill_code", "tradeskill_id"];
const SKILL_NEEDED: &[&str] = &["skillneeded", "skill_needed", "skill_level", "skill"];
const TRIVIAL: &[&str] = &["trivial", "trivial_level"];
const STATION: &[&str] = &["station_container_id", "container_id", "containerid"];
const COMPONENT_ID: &[&str] = &["item_id", "id"];
const QUANTITY: &[&str] = &["quantity", "componentcount", "count"];

pub fn item_from_record(record: &Record) -> Result<ItemRef, String> {
    let id = id_field(record, ITEM_ID)?.ok_or("item has no id")?;
    let name = ITEM_NAME
        .iter()
        .find_map(|key| record.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| format!("item {id} has no name"))?;

    Ok(ItemRef {
        id,
        name: name.to_string(),
    })
}

pub fn recipe_from_record(record: &Record) -> Result<RawRecipeData, String> {
    let tradeskill_code = int_field(record, TRADESKILL);
    let skill_level_required = int_field(record, SKILL_NEEDED).unwrap_or(0);
    let trivial_level = int_field(record, TRIVIAL);
    let mut station_container_id = id_field(record, STATION)?;
    let mut components = Vec::new();

    if let Some(listed) = record.get("components").and_then(Value::as_array) {
        for entry in listed {
            let entry = entry.as_object().ok_or("component entry is not an object")?;
            let item_id = id_field(entry, COMPONENT_ID)?.ok_or("component has no item id")?;
            let quantity = int_field(entry, QUANTITY).unwrap_or(1);
            components.push(RawComponent { item_id, quantity });
        }
    } else if let Some(entries) = record.get("tradeskill_entries").and_then(Value::as_array) {
        for entry in entries.iter().filter_map(Value::as_object) {
            let Some(item_id) = id_field(entry, &["item_id"])? else {
                continue;
            };

            if int_field(entry, &["iscontainer"]) == Some(1) {
                station_container_id.get_or_insert(item_id);
            } else if let Some(quantity) = int_field(entry, &["componentcount"]).filter(|q| *q > 0) {
                components.push(RawComponent { item_id, quantity });
            }
        }
    }

    Ok(RawRecipeData {
        tradeskill_code,
        skill_level_required,
        trivial_level,
        station_container_id,
        components,
    })
}

fn int_field(record: &Record, keys: &[&str]) -> Option<i64> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
        .and_then(as_int)
}

fn id_field(record: &Record, keys: &[&str]) -> Result<Option<u64>, String> {
    int_field(record, keys)
        .map(|id| u64::try_from(id).map_err(|_| format!("negative id {id}")))
        .transpose()
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
