use crate::schema::{EntityType, EntityValue};
use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d[\d.,]*").unwrap());

/// Normalize an entity name for keying: lowercase, trim, collapse whitespace.
pub fn normalize(name: &str) -> String {
    WHITESPACE
        .replace_all(name.trim(), " ")
        .to_lowercase()
}

pub fn entity_key(entity_type: EntityType, name: &str) -> String {
    format!("{}:{}", entity_type, normalize(name))
}

/// Coerce the surface string into a typed value.
///
/// Counted types (`biaya`, `durasi`, `kuota`) take the first embedded number with
/// `.`/`,` thousands separators stripped; everything else keeps the raw string.
pub fn coerce_value(entity_type: EntityType, name: &str) -> EntityValue {
    if entity_type.is_counted() {
        if let Some(number) = first_number(name) {
            return EntityValue::Integer(number);
        }
    }
    EntityValue::Text(name.to_string())
}

fn first_number(text: &str) -> Option<i64> {
    let raw = DIGITS.find(text)?.as_str();
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
