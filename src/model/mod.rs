use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Placeholder shown for run options absent from the results file.
pub const UNDEFINED: &str = "undefined";

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ResultSet {
    #[serde(default)]
    pub opts: RunOptions,
    #[serde(default)]
    pub data: Vec<DialogRecord>,
}

/// Configuration of the evaluation run that produced the results file.
///
/// Fields are kept as raw JSON values: the heading prints whatever the
/// evaluation wrote, and a missing field prints as `undefined`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RunOptions {
    pub encoder: Option<Value>,
    pub decoder: Option<Value>,
    #[serde(rename = "beamSize")]
    pub beam_size: Option<Value>,
    pub temperature: Option<Value>,
    #[serde(rename = "sampleWords")]
    pub sample_words: Option<Value>,
    pub qbot: Option<String>,
    pub abot: Option<String>,
}

impl RunOptions {
    /// Loose zero test for `sampleWords`: `0`, `"0"`, `"0x0"`, `""`, `false`
    /// and arrays joining to one of those are zero, anything else
    /// (including a missing field) is not.
    pub fn uses_sampling(&self) -> bool {
        !self.sample_words.as_ref().map(is_loose_zero).unwrap_or(false)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DialogRecord {
    /// `None` when the id is absent or not a number; it renders as `NaN`.
    #[serde(default, deserialize_with = "deserialize_image_id")]
    pub image_id: Option<u64>,
    #[serde(default = "undefined_text", deserialize_with = "deserialize_text")]
    pub caption: String,
    #[serde(default)]
    pub dialog: Vec<Turn>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Turn {
    #[serde(default = "undefined_text", deserialize_with = "deserialize_text")]
    pub question: String,
    #[serde(default = "undefined_text", deserialize_with = "deserialize_text")]
    pub answer: String,
}

fn undefined_text() -> String {
    UNDEFINED.to_string()
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(display_value(Some(&value)))
}

fn is_loose_zero_text(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lower = trimmed.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lower.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).map(|v| v == 0).unwrap_or(false);
        }
    }
    trimmed.parse::<f64>().map(|v| v == 0.0).unwrap_or(false)
}

fn is_loose_zero(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => is_loose_zero_text(s),
        Value::Bool(b) => !b,
        // Arrays compare through their joined text: `[]`, `[0]`, `[""]`.
        Value::Array(_) => is_loose_zero_text(&display_value(Some(value))),
        _ => false,
    }
}

/// Renders an optional JSON value the way it reads in the results file.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None => UNDEFINED.to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => {
            if n.is_i64() || n.is_u64() {
                return n.to_string();
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                Some(f) => f.to_string(),
                None => n.to_string(),
            }
        }
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| display_value(Some(v)))
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

/// Parses the leading decimal digits of an id string, e.g. `"42"` or `"42.jpg"`.
pub fn parse_image_id(raw: &str) -> Option<u64> {
    let trimmed = raw.trim_start();
    let digits: String = trimmed
        .trim_start_matches('+')
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawImageId {
    Number(u64),
    Float(f64),
    Text(String),
    Null,
}

fn deserialize_image_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawImageId::deserialize(deserializer)? {
        RawImageId::Number(n) => Ok(Some(n)),
        RawImageId::Float(f) if f >= 0.0 && f.is_finite() => Ok(Some(f.trunc() as u64)),
        RawImageId::Float(f) => Err(serde::de::Error::custom(format!(
            "image_id must be a non-negative integer, got {f}"
        ))),
        RawImageId::Text(s) => Ok(parse_image_id(&s)),
        RawImageId::Null => Ok(None),
    }
}
