//! Serde helpers for identifiers the API sends either as numbers or strings.

use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
	String(String),
	Integer(i64),
	Float(f64),
}

/// Deserializes an identifier that may arrive as a JSON string or number.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	match StringOrNumber::deserialize(deserializer)? {
		StringOrNumber::String(s) => Ok(s),
		StringOrNumber::Integer(n) => Ok(n.to_string()),
		StringOrNumber::Float(f) if f.fract() == 0.0 => Ok(format!("{}", f as i64)),
		StringOrNumber::Float(f) => Err(de::Error::custom(format!(
			"identifier must be an integer, got {}",
			f
		))),
	}
}
