use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decodes the stored `years` column. Anything that is not a JSON array of
/// strings reads back as an empty list so listings keep working.
pub fn parse_years(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

pub fn value_to_string(value: &Value) -> Option<String> {
    if let Some(text) = value.as_str() {
        return Some(text.to_string());
    }
    if let Some(num) = value.as_i64() {
        return Some(num.to_string());
    }
    if let Some(num) = value.as_u64() {
        return Some(num.to_string());
    }
    None
}

/// Trimmed year labels from strings or integers. `None` when any entry is
/// of another type.
pub fn years_from_values(values: &[Value]) -> Option<Vec<String>> {
    values
        .iter()
        .map(|value| value_to_string(value).map(|year| year.trim().to_string()))
        .collect()
}

/// Accepts `years` as a list of strings or integers, or as the serialized
/// JSON text older backups carry. `null` reads as an empty list.
pub fn deserialize_years<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::String(raw) => {
            let decoded: Vec<Value> = serde_json::from_str(&raw).unwrap_or_default();
            Ok(years_from_values(&decoded).unwrap_or_else(|| parse_years(&raw)))
        }
        Value::Array(values) => years_from_values(&values)
            .ok_or_else(|| serde::de::Error::custom("years must be strings or integers")),
        other => Err(serde::de::Error::custom(format!(
            "years must be a list, got {}",
            other
        ))),
    }
}

pub fn encode_years(years: &[String]) -> String {
    serde_json::to_string(years).unwrap_or_else(|_| "[]".to_string())
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn default_marks_label(marks: i64) -> String {
    format!("{} Markers", marks)
}

/// Type tag stored on an attachment, derived from the uploaded file name.
pub fn file_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.trim().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "pdf",
        "doc" | "docx" => "docx",
        "ppt" | "pptx" => "ppt",
        "jpg" | "jpeg" | "png" | "gif" | "webp" | "svg" => "image",
        _ => "other",
    }
}

/// Empty or whitespace-only text becomes `None`.
pub fn clean_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
