use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub type OrganizationId = u64;
pub type AssetId = u64;
pub type ReportId = u64;
pub type ModuleId = u64;
pub type BestPracticeId = u64;
pub type EngineTestId = u64;
pub type StandardId = u64;

/// Reads an integer the way the engine and AMP emit them: a JSON number or a string with a
/// leading run of digits. Zero, negatives, and anything unparsable read as `None`.
pub fn parse_lenient_u64(value: &Value) -> Option<u64> {
    let parsed = match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| *f >= 1.0).map(|f| f.trunc() as u64)),
        Value::String(text) => parse_leading_digits(text),
        _ => None,
    };

    parsed.filter(|value| *value > 0)
}

fn parse_leading_digits(text: &str) -> Option<u64> {
    let trimmed = text.trim_start();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits: String = trimmed.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

pub fn deserialize_lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_lenient_u64))
}
