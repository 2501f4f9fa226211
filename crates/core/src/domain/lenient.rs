//! Field deserializers that degrade malformed snapshot parts to defaults.
//!
//! A snapshot is exported by an external job and may be partially valid. These
//! helpers keep one bad field (or one bad array element) from failing the
//! whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// `Some` only when the value is an array; elements that fail to decode are dropped.
pub fn opt_vec_skip_invalid<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(elements) = value else {
        return Ok(None);
    };
    Ok(Some(
        elements
            .into_iter()
            .filter_map(|element| T::deserialize(element).ok())
            .collect(),
    ))
}

pub fn vec_skip_invalid<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(opt_vec_skip_invalid(deserializer)?.unwrap_or_default())
}

/// Treats blank strings like absent ones.
pub fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = or_default(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Non-negative integer count. Whole or fractional numbers are accepted
/// (`2.0` from a float-typed exporter becomes `2`); anything else is `0`.
pub fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(count_from(&value).unwrap_or_default())
}

/// `{key: count}` object; entries whose value is not a count are dropped.
pub fn count_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(entries) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|(key, value)| count_from(&value).map(|c| (key, c)))
        .collect())
}

fn count_from(value: &Value) -> Option<u64> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_u64().or_else(|| {
        n.as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.round() as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Fields {
        #[serde(deserialize_with = "or_default")]
        count: u64,
        #[serde(deserialize_with = "vec_skip_invalid")]
        values: Vec<u64>,
        #[serde(deserialize_with = "opt_vec_skip_invalid")]
        maybe: Option<Vec<String>>,
        #[serde(deserialize_with = "non_empty_string")]
        stamp: Option<String>,
    }

    #[test]
    fn wrong_shapes_fall_back_to_defaults() {
        let decoded: Fields = serde_json::from_value(json!({
            "count": "seven",
            "values": {"not": "an array"},
            "maybe": 12,
            "stamp": "   ",
        }))
        .unwrap();
        assert_eq!(decoded.count, 0);
        assert!(decoded.values.is_empty());
        assert!(decoded.maybe.is_none());
        assert!(decoded.stamp.is_none());
    }

    #[test]
    fn invalid_elements_are_dropped() {
        let decoded: Fields = serde_json::from_value(json!({
            "values": [1, "two", 3, null],
            "maybe": ["a", 2, "c"],
        }))
        .unwrap();
        assert_eq!(decoded.values, vec![1, 3]);
        assert_eq!(decoded.maybe, Some(vec!["a".to_string(), "c".to_string()]));
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Counts {
        #[serde(deserialize_with = "count")]
        mentions: u64,
        #[serde(deserialize_with = "count_map")]
        mix: BTreeMap<String, u64>,
    }

    #[test]
    fn counts_accept_float_typed_numbers() {
        let c: Counts = serde_json::from_value(json!({
            "mentions": 2.0,
            "mix": {"news": 3.0, "reddit": 1, "rss": null, "other": -4},
        }))
        .unwrap();
        assert_eq!(c.mentions, 2);
        assert_eq!(c.mix.len(), 2);
        assert_eq!(c.mix["news"], 3);
        assert_eq!(c.mix["reddit"], 1);

        for bad in [json!(null), json!("7"), json!(-1), json!([1])] {
            let c: Counts = serde_json::from_value(json!({"mentions": bad, "mix": 5})).unwrap();
            assert_eq!(c.mentions, 0);
            assert!(c.mix.is_empty());
        }
    }

    #[test]
    fn absent_fields_use_container_default() {
        let decoded: Fields = serde_json::from_value(json!({})).unwrap();
        assert_eq!(decoded.count, 0);
        assert!(decoded.maybe.is_none());
    }
}
