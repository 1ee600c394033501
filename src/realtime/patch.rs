use serde_json::Value;

use crate::backend::value_as_text;
use crate::models::Record;

/// Merges the fields of `changed` into the row with the same id.
///
/// Order is preserved and rows with other ids are untouched. Returns
/// `Ok(false)` when no row carries that id.
pub fn merge_record<T: Record>(rows: &mut [T], changed: &Value) -> Result<bool, serde_json::Error> {
    let Some(id) = changed.get("id").map(value_as_text) else {
        return Ok(false);
    };

    let Some(slot) = rows.iter_mut().find(|row| row.record_id() == id) else {
        return Ok(false);
    };

    let mut merged = serde_json::to_value(&*slot)?;
    if let (Some(target), Some(fields)) = (merged.as_object_mut(), changed.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }

    *slot = serde_json::from_value(merged)?;
    Ok(true)
}
