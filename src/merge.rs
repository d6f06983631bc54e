//! Merging score data from two sources
//!
//! A score can be described by more than one document, e.g. the txt
//! extraction and the metadata of a linked mu2 file. The merge is a deep
//! dictionary union where the second document wins on conflicts, with every
//! overwritten leaf logged for inspection.

use serde_json::{Map, Value};

use crate::error::{ExtractorError, ExtractorResult};

/// Merge `data2` into `data1` and return the combined document
///
/// If `data2` carries a top-level `title` object it is renamed to `work` or
/// `recording` to match whichever of the two `data1` carries; a title with
/// no counterpart is dropped with a warning. Both inputs must be JSON
/// objects.
pub fn merge(data1: &Value, data2: &Value) -> ExtractorResult<Value> {
    let base = as_object(data1)?;
    let mut incoming = as_object(data2)?.clone();

    if let Some(title) = incoming.remove("title") {
        if base.contains_key("work") {
            incoming.insert("work".to_string(), title);
        } else if base.contains_key("recording") {
            incoming.insert("recording".to_string(), title);
        } else {
            log::warn!("title in the second document has no work or recording to attach to");
        }
    }

    let mut merged = base.clone();
    dict_merge(&mut merged, &incoming, "");
    Ok(Value::Object(merged))
}

fn as_object(value: &Value) -> ExtractorResult<&Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        ExtractorError::InvalidParameter("merge inputs must be JSON objects".to_string())
    })
}

fn dict_merge(base: &mut Map<String, Value>, incoming: &Map<String, Value>, path: &str) {
    for (key, new_value) in incoming {
        let key_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", path, key)
        };
        match (base.get_mut(key), new_value) {
            (Some(Value::Object(old_obj)), Value::Object(new_obj)) => {
                dict_merge(old_obj, new_obj, &key_path);
            }
            (Some(old_value), _) => {
                if old_value != new_value {
                    log::warn!("overwriting '{}': {} -> {}", key_path, old_value, new_value);
                }
                *old_value = new_value.clone();
            }
            (None, _) => {
                base.insert(key.clone(), new_value.clone());
            }
        }
    }
}
