//! JSON extraction helpers for API responses.
//!
//! Supports dot notation for navigating nested objects.
//!
//! # Examples
//!
//! ```rust
//! use mangapack::net::json;
//! use serde_json::json;
//!
//! let data = json!({
//!     "chapter": {
//!         "md_images": [{"b2key": "a.jpg"}, {"b2key": "b.jpg"}]
//!     }
//! });
//!
//! let images = json::extract_array(&data, "chapter.md_images");
//! assert_eq!(images.len(), 2);
//! ```

use serde_json::Value;

/// Extracts a value from nested JSON using dot notation.
///
/// Returns `None` if any segment of the path is missing.
///
/// # Examples
///
/// ```rust
/// use mangapack::net::json;
/// use serde_json::json;
///
/// let data = json!({"comic": {"hid": "xyz"}});
///
/// assert_eq!(json::extract_path(&data, "comic.hid").unwrap(), "xyz");
/// assert_eq!(json::extract_path(&data, "comic.slug"), None);
/// ```
pub fn extract_path<'a>(json: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = json;

    for key in path.split('.') {
        current = current.get(key)?;
    }

    Some(current)
}

/// Extracts an array from a nested JSON path.
///
/// Returns an empty vector if the path doesn't exist or isn't an array.
pub fn extract_array(json: &Value, path: &str) -> Vec<Value> {
    extract_path(json, path)
        .and_then(|v| v.as_array().cloned())
        .unwrap_or_default()
}

/// Reads a string field, treating `null`, missing and blank values as absent.
pub fn string_field(json: &Value, key: &str) -> Option<String> {
    json.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads a numeric field that the API may send as a number or a numeric string.
///
/// # Examples
///
/// ```rust
/// use mangapack::net::json;
/// use serde_json::json;
///
/// assert_eq!(json::number_field(&json!({"chap": "12.5"}), "chap"), Some(12.5));
/// assert_eq!(json::number_field(&json!({"chap": 3}), "chap"), Some(3.0));
/// assert_eq!(json::number_field(&json!({"chap": "extra"}), "chap"), None);
/// assert_eq!(json::number_field(&json!({"chap": null}), "chap"), None);
/// ```
pub fn number_field(json: &Value, key: &str) -> Option<f64> {
    let number = match json.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_array_missing_path() {
        let data = json!({"chapters": []});
        assert!(extract_array(&data, "chapters").is_empty());
        assert!(extract_array(&data, "chapter.md_images").is_empty());
    }

    #[test]
    fn test_string_field_blank_is_absent() {
        let data = json!({"title": "  ", "b2key": "k.png"});
        assert_eq!(string_field(&data, "title"), None);
        assert_eq!(string_field(&data, "b2key"), Some("k.png".to_string()));
        assert_eq!(string_field(&data, "missing"), None);
    }
}
