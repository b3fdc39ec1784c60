//! Query-by-path access into device reply JSON.
//!
//! The protocol core treats JSON as opaque payload bytes; this module is
//! the accessor collaborator callers use to pull individual values out
//! of a reply. Paths are dot-separated object keys with numeric segments
//! indexing into arrays, e.g. `"result.temps.0"`.

/// Errors from the JSON accessor.
#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    /// No value exists at the path.
    #[error("no value at path {path:?}")]
    Absent { path: String },

    /// The value at the path is not an object or array.
    #[error("value at path {path:?} is not a container")]
    NotAContainer { path: String },

    /// The payload is not valid JSON.
    #[error("invalid json: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, JsonError>;

fn lookup<'a>(root: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = root;
    if path.is_empty() {
        return Some(current);
    }
    for segment in path.split('.') {
        current = match current {
            serde_json::Value::Object(map) => map.get(segment)?,
            serde_json::Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Read a number at `path`.
pub fn get_number(json: &str, path: &str) -> Result<f64> {
    let root: serde_json::Value = serde_json::from_str(json)?;
    lookup(&root, path)
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| JsonError::Absent {
            path: path.to_string(),
        })
}

/// Read a string at `path`.
pub fn get_string(json: &str, path: &str) -> Result<String> {
    let root: serde_json::Value = serde_json::from_str(json)?;
    lookup(&root, path)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| JsonError::Absent {
            path: path.to_string(),
        })
}

/// Count the keys of the object (or elements of the array) at `path`.
pub fn count_keys(json: &str, path: &str) -> Result<usize> {
    let root: serde_json::Value = serde_json::from_str(json)?;
    let value = lookup(&root, path).ok_or_else(|| JsonError::Absent {
        path: path.to_string(),
    })?;
    match value {
        serde_json::Value::Object(map) => Ok(map.len()),
        serde_json::Value::Array(items) => Ok(items.len()),
        _ => Err(JsonError::NotAContainer {
            path: path.to_string(),
        }),
    }
}
