//! Conversions between domain structs and `aws_sdk_dynamodb` item maps.
//!
//! Every row type round-trips through `serde_json::Value` rather than
//! hand-mapping each field, so adding a field to a [`fleet_types`] struct
//! never requires touching this module.

use aws_sdk_dynamodb::types::AttributeValue;
use fleet_common::error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

pub type Item = HashMap<String, AttributeValue>;

pub fn s(v: impl Into<String>) -> AttributeValue {
    AttributeValue::S(v.into())
}

pub fn n(v: impl ToString) -> AttributeValue {
    AttributeValue::N(v.to_string())
}

pub fn get_s(item: &Item, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).cloned()
}

/// Serializes `value` to a JSON object, then to a DynamoDB item map.
/// Panics only if `T`'s `Serialize` impl itself fails, which none of this
/// crate's entity types do.
pub fn to_item<T: Serialize>(value: &T) -> Item {
    let json = serde_json::to_value(value).expect("entity types always serialize");
    match json_to_av(&json) {
        AttributeValue::M(m) => m,
        _ => Item::new(),
    }
}

pub fn from_item<T: DeserializeOwned>(item: &Item) -> Result<T> {
    let json = av_to_json(&AttributeValue::M(item.clone()));
    serde_json::from_value(json).map_err(Error::from)
}

fn json_to_av(v: &Value) -> AttributeValue {
    match v {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(json_to_av).collect()),
        Value::Object(map) => {
            AttributeValue::M(map.iter().map(|(k, v)| (k.clone(), json_to_av(v))).collect())
        }
    }
}

fn av_to_json(v: &AttributeValue) -> Value {
    match v {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::N(n) => {
            if let Ok(i) = n.parse::<i64>() {
                Value::Number(i.into())
            } else if let Ok(f) = n.parse::<f64>() {
                serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
            } else {
                Value::Null
            }
        }
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::L(items) => Value::Array(items.iter().map(av_to_json).collect()),
        AttributeValue::M(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), av_to_json(v))).collect())
        }
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: i32,
        enabled: bool,
        tags: Vec<String>,
    }

    #[test]
    fn round_trips_through_item() {
        let value = Sample {
            name: "demo".into(),
            count: 3,
            enabled: true,
            tags: vec!["a".into(), "b".into()],
        };
        let item = to_item(&value);
        let back: Sample = from_item(&item).unwrap();
        assert_eq!(value, back);
    }
}
