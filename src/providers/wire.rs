//! Normalises raw response bodies before they reach typed code.
use crate::core::error::ApiError;
use crate::core::model::{Id, Settings};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Unwraps the collection shapes the backend uses: a bare array, a paginated
/// `{"results": [...]}`, a `{"data": [...]}` envelope, a single object, or
/// nothing at all.
pub fn records(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        Value::Object(mut map) => {
            for key in ["results", "data"] {
                if let Some(Value::Array(_)) = map.get(key) {
                    if let Some(Value::Array(items)) = map.remove(key) {
                        return items;
                    }
                }
            }
            vec![Value::Object(map)]
        }
        other => vec![other],
    }
}

/// Unwraps a `{"data": {...}}` envelope around a single record.
pub fn record(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

pub fn decode_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, ApiError> {
    records(value)
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item).map_err(|e| ApiError::Decode(format!("record {i}: {e}")))
        })
        .collect()
}

pub fn decode_one<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(record(value)).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Settings come back as an object, or as a list holding the singleton.
/// No settings yet means an empty pool.
pub fn settings(value: Value) -> Result<Settings, ApiError> {
    match records(value).into_iter().next() {
        Some(first) => decode_one(first),
        None => Ok(Settings::default()),
    }
}

/// Id of a freshly created or updated record, when the body carries one.
pub fn record_id(value: &Value) -> Option<Id> {
    match value.get("id")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Funding;
    use serde_json::json;

    #[test]
    fn test_records_accepts_common_envelopes() {
        assert_eq!(records(json!([1, 2])).len(), 2);
        assert_eq!(
            records(json!({"count": 2, "next": null, "results": [{"id": 1}, {"id": 2}]})).len(),
            2
        );
        assert_eq!(records(json!({"data": [{"id": 1}]})).len(), 1);
        assert_eq!(records(json!({"id": 1, "data": "x"})).len(), 1);
        assert!(records(Value::Null).is_empty());
    }

    #[test]
    fn test_decode_list_reports_failing_record() {
        let body = json!([
            {"id": 1, "source_type": "investor", "status": "available", "shares": 2},
            {"id": 2, "source_type": "grant", "status": "available"}
        ]);
        let err = decode_list::<Funding>(body).unwrap_err();
        assert!(err.to_string().contains("record 1"), "{err}");
    }

    #[test]
    fn test_settings_shapes() {
        let from_object = settings(json!({"total_shares": 1000, "share_price": "150000"})).unwrap();
        let from_list = settings(json!([{"total_shares": "1000", "share_price": 150000}])).unwrap();
        assert_eq!(from_object, from_list);
        assert_eq!(from_object.total_shares, 1000);

        assert_eq!(settings(json!([])).unwrap(), Settings::default());
    }

    #[test]
    fn test_record_unwraps_data_envelope() {
        assert_eq!(record(json!({"data": {"id": 3}})), json!({"id": 3}));
        assert_eq!(record(json!({"id": 3})), json!({"id": 3}));
        assert_eq!(record_id(&json!({"id": "8"})), Some(8));
        assert_eq!(record_id(&json!({"ok": true})), None);
    }
}
