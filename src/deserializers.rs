//! Forgiving deserializers for question records.
//!
//! The cleaned-question store is produced by a separate extraction stage and older dumps
//! disagree on field shapes. These helpers let `QuestionRecord` accept every shape seen in
//! practice while never failing a record over a missing or null field.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accepts a string, a number, a boolean or null. Null becomes the empty string.
pub fn de_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a string, got {}",
            value_kind(&other)
        ))),
    }
}

/// Accepts a single string or a sequence of strings.
///
/// # Accepted Formats
///
/// * `null` or `""` → `[]`
/// * `"x^2"` → `["x^2"]`
/// * `["x^2", "y"]` → `["x^2", "y"]` (null elements are dropped)
pub fn de_string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s]),
        Value::Array(items) => items
            .into_iter()
            .filter(|v| !v.is_null())
            .map(|v| scalar_to_string(v).map_err(D::Error::custom))
            .collect(),
        other => Err(D::Error::custom(format!(
            "expected a string or a list of strings, got {}",
            value_kind(&other)
        ))),
    }
}

/// Accepts tags as a list, the raw forum form `"<algebra><limits>"`, or a comma string.
pub fn de_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(split_tag_string(&s)),
        Value::Array(items) => items
            .into_iter()
            .filter(|v| !v.is_null())
            .map(|v| scalar_to_string(v).map_err(D::Error::custom))
            .collect(),
        other => Err(D::Error::custom(format!(
            "expected tags as a list or string, got {}",
            value_kind(&other)
        ))),
    }
}

/// Splits `"<a><b>"` or `"a, b"` into individual tags.
pub fn split_tag_string(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    let separated = if raw.starts_with('<') {
        raw.replace("><", ",").replace(['<', '>'], "")
    } else {
        raw.to_string()
    };
    separated
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Post identifier: integer or numeric string; null maps to the missing-id sentinel.
pub fn de_post_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = Value::deserialize(deserializer)?;
    forgiving_i64(&v)
        .map(|opt| opt.unwrap_or(crate::schemas::MISSING_POST_ID))
        .map_err(D::Error::custom)
}

/// Score / view count: integer, float or numeric string; null maps to 0.
pub fn de_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = Value::deserialize(deserializer)?;
    forgiving_i64(&v)
        .map(|opt| opt.unwrap_or(0))
        .map_err(D::Error::custom)
}

fn forgiving_i64(v: &Value) -> Result<Option<i64>, String> {
    match v {
        Value::Null => Ok(None),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else if let Some(f) = n.as_f64().filter(|f| f.is_finite()) {
                Ok(Some(f.round() as i64))
            } else {
                Err(format!("numeric value {} out of range", n))
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<i64>()
                .map(Some)
                .map_err(|_| format!("'{}' is not an integer", s))
        }
        other => Err(format!("expected an integer, got {}", value_kind(other))),
    }
}

fn scalar_to_string(v: Value) -> Result<String, String> {
    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("expected a string element, got {}", value_kind(&other))),
    }
}

fn value_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::QuestionRecord;

    #[test]
    fn splits_forum_tag_format() {
        assert_eq!(
            split_tag_string("<calculus><real-analysis>"),
            vec!["calculus", "real-analysis"]
        );
        assert_eq!(split_tag_string("algebra, limits"), vec!["algebra", "limits"]);
        assert!(split_tag_string("  ").is_empty());
    }

    #[test]
    fn record_accepts_alternate_shapes() {
        let rec: QuestionRecord = serde_json::from_str(
            r#"{"post_id": "12", "title": null, "latex_title": "x^2",
                "tags": "<algebra><limits>", "body": "b", "latex": null,
                "score": 3.0, "view_count": "41"}"#,
        )
        .unwrap();
        assert_eq!(rec.post_id, 12);
        assert_eq!(rec.title, "");
        assert_eq!(rec.latex_title, vec!["x^2"]);
        assert_eq!(rec.tags, vec!["algebra", "limits"]);
        assert!(rec.latex.is_empty());
        assert_eq!(rec.score, 3);
        assert_eq!(rec.view_count, 41);
    }

    #[test]
    fn null_post_id_uses_sentinel() {
        let rec: QuestionRecord = serde_json::from_str(r#"{"post_id": null}"#).unwrap();
        assert_eq!(rec.post_id, crate::schemas::MISSING_POST_ID);
    }

    #[test]
    fn rejects_structurally_wrong_fields() {
        let res = serde_json::from_str::<QuestionRecord>(r#"{"tags": {"a": 1}}"#);
        assert!(res.is_err());
        let res = serde_json::from_str::<QuestionRecord>(r#"{"post_id": "abc"}"#);
        assert!(res.is_err());
    }
}
