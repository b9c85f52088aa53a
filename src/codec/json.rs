use serde_json::Value;

use super::Body;
use crate::error::ParseError;

pub(super) fn decode(text: &str) -> Result<Body, ParseError> {
    if text.trim().is_empty() {
        return Ok(Body::Value(Value::Null));
    }
    serde_json::from_str(text)
        .map(Body::Value)
        .map_err(ParseError::wrap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_body_is_null_not_an_error() {
        assert_eq!(decode("").unwrap(), Body::Value(Value::Null));
        assert_eq!(decode("  \n").unwrap(), Body::Value(Value::Null));
    }

    #[test]
    fn malformed_body_is_an_error() {
        let err = decode("{\"ok\":").unwrap_err();
        assert!(err.message().contains("EOF"));
    }

    #[test]
    fn object_round_trips_into_value() {
        assert_eq!(
            decode(r#"{"ok":true,"n":[1,2]}"#).unwrap(),
            Body::Value(json!({"ok": true, "n": [1, 2]}))
        );
    }
}
