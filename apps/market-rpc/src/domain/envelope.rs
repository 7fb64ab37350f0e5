//! Request and Response Envelopes
//!
//! The service speaks a single unary method. Every request carries a type
//! tag and a JSON document; every response carries status fields and a JSON
//! document whose `data` member holds the result rows.

use serde_json::Value;

use super::query::QueryParameters;

/// Key under which the server places the result payload.
pub const DATA_KEY: &str = "data";

/// Outgoing request envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    /// Request type tag (`KLINE`, `AGG_TRADE`, `ORDER_BOOK` or an override).
    pub type_tag: String,
    /// Serialized [`QueryParameters`].
    pub json_data: String,
}

impl RequestEnvelope {
    /// Serialize validated parameters under `type_tag`.
    pub fn encode(
        type_tag: impl Into<String>,
        params: &QueryParameters,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            type_tag: type_tag.into(),
            json_data: serde_json::to_string(params)?,
        })
    }

    /// Decode the payload back into parameters.
    pub fn parameters(&self) -> Result<QueryParameters, serde_json::Error> {
        serde_json::from_str(&self.json_data)
    }
}

/// Incoming response envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseEnvelope {
    /// Server status code.
    pub code: i32,
    /// Server message.
    pub msg: String,
    /// Server success flag.
    pub success: bool,
    /// Echoed type tag.
    pub type_tag: String,
    /// JSON document holding `data`.
    pub json_data: String,
}

/// Why a response payload could not be unwrapped.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// Payload is not JSON.
    #[error("failed to decode JSON from server response: {0}")]
    Decode(#[source] serde_json::Error),

    /// Payload is JSON but not an object with `data`.
    #[error("invalid response format: {reason}")]
    Schema {
        /// What was wrong with the document.
        reason: String,
    },
}

impl ResponseEnvelope {
    /// Successful response carrying `{"data": data}`.
    #[must_use]
    pub fn with_data(type_tag: impl Into<String>, data: &Value) -> Self {
        let mut document = serde_json::Map::new();
        document.insert(DATA_KEY.to_string(), data.clone());
        Self {
            code: 0,
            msg: String::new(),
            success: true,
            type_tag: type_tag.into(),
            json_data: Value::Object(document).to_string(),
        }
    }

    /// Extract the `data` value as a one-element row set.
    ///
    /// Callers index 0 to reach the payload.
    pub fn into_rows(self) -> Result<Vec<Value>, PayloadError> {
        let document: Value = serde_json::from_str(&self.json_data).map_err(PayloadError::Decode)?;

        let mut object = match document {
            Value::Object(object) => object,
            other => {
                return Err(PayloadError::Schema {
                    reason: format!("expected a JSON object, got {}", json_kind(&other)),
                });
            }
        };

        object
            .remove(DATA_KEY)
            .map(|data| vec![data])
            .ok_or_else(|| PayloadError::Schema {
                reason: format!("missing '{DATA_KEY}' key"),
            })
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(json_data: &str) -> ResponseEnvelope {
        ResponseEnvelope {
            json_data: json_data.to_string(),
            ..ResponseEnvelope::default()
        }
    }

    #[test]
    fn data_is_wrapped_in_single_element() {
        let rows = response(r#"{"data": [1, 2, 3]}"#).into_rows().unwrap();
        assert_eq!(rows, vec![json!([1, 2, 3])]);
    }

    #[test]
    fn extra_keys_are_ignored() {
        let rows = response(r#"{"data": {"a": 1}, "total": 1}"#).into_rows().unwrap();
        assert_eq!(rows, vec![json!({"a": 1})]);
    }

    #[test]
    fn null_data_is_still_data() {
        let rows = response(r#"{"data": null}"#).into_rows().unwrap();
        assert_eq!(rows, vec![Value::Null]);
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        assert!(matches!(
            response("not json").into_rows(),
            Err(PayloadError::Decode(_))
        ));
        assert!(matches!(response("").into_rows(), Err(PayloadError::Decode(_))));
    }

    #[test]
    fn missing_data_is_a_schema_error() {
        let err = response(r#"{"rows": []}"#).into_rows().unwrap_err();
        assert!(matches!(err, PayloadError::Schema { .. }));
        assert!(err.to_string().starts_with("invalid response format"));
    }

    #[test]
    fn non_object_is_a_schema_error() {
        assert!(matches!(
            response("[1, 2, 3]").into_rows(),
            Err(PayloadError::Schema { .. })
        ));
    }

    #[test]
    fn with_data_round_trips() {
        let rows = ResponseEnvelope::with_data("KLINE", &json!([{"Open": 1}]))
            .into_rows()
            .unwrap();
        assert_eq!(rows, vec![json!([{"Open": 1}])]);
    }
}
