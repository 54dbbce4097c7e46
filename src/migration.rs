//! One-time upgrade of documents written by earlier versions.
//!
//! Older documents may lack fields that are now mandatory (`savingsPot`,
//! `dailyHistory`, `temporaryDeductions`, `lastUpdated`, `currency`), may keep
//! history under a separate `pm_history` key, and record deficit days with a
//! positive `diff`. Migration rewrites the raw JSON in place so it decodes
//! into the strict schema; callers persist the result when anything changed.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::state::SettlementAction;

fn is_missing(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).map_or(true, Value::is_null)
}

fn fill(obj: &mut Map<String, Value>, key: &str, default: impl FnOnce() -> Value) -> bool {
    if is_missing(obj, key) {
        obj.insert(key.to_string(), default());
        true
    } else {
        false
    }
}

/// Upgrades a settings document. Returns true if it was modified.
pub fn migrate_settings(doc: &mut Value, default_currency: &str) -> bool {
    let Some(obj) = doc.as_object_mut() else {
        return false;
    };
    fill(obj, "currency", || Value::String(default_currency.to_string()))
}

/// Upgrades a state document, folding in entries from the legacy history key.
///
/// Returns true if the document was modified.
pub fn migrate_state(doc: &mut Value, legacy_history: Option<Value>, now: DateTime<Utc>) -> bool {
    let Some(obj) = doc.as_object_mut() else {
        return false;
    };

    let mut changed = false;
    changed |= fill(obj, "savingsPot", || Value::from(0.0));
    changed |= fill(obj, "lastUpdated", || Value::String(now.to_rfc3339()));
    changed |= fill(obj, "dailyHistory", || Value::Array(Vec::new()));
    changed |= fill(obj, "temporaryDeductions", || Value::Array(Vec::new()));

    if let Some(Value::Array(legacy)) = legacy_history {
        if !legacy.is_empty() {
            if let Some(Value::Array(history)) = obj.get_mut("dailyHistory") {
                history.extend(legacy);
                changed = true;
            }
        }
    }

    if let Some(Value::Array(history)) = obj.get_mut("dailyHistory") {
        for entry in history.iter_mut() {
            changed |= normalize_entry_sign(entry);
        }
    }

    changed
}

/// Deficit actions carry a negative `diff`; earlier versions stored the magnitude.
fn normalize_entry_sign(entry: &mut Value) -> bool {
    let Some(obj) = entry.as_object_mut() else {
        return false;
    };
    let action = obj
        .get("action")
        .and_then(Value::as_str)
        .and_then(SettlementAction::from_tag);
    let Some(action) = action else {
        return false;
    };
    if action.is_surplus_action() {
        return false;
    }
    match obj.get("diff").and_then(Value::as_f64) {
        Some(diff) if diff > 0.0 => {
            obj.insert("diff".to_string(), Value::from(-diff));
            true
        }
        _ => false,
    }
}
