//! The `{response: {result, message, data}}` wrapper every command returns.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::UpstreamError;

const SUCCESS: &str = "success";

#[derive(Debug, Deserialize)]
struct Envelope {
    response: EnvelopeBody,
}

#[derive(Debug, Deserialize)]
struct EnvelopeBody {
    #[serde(default)]
    result: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: serde_json::Value,
}

/// Unwrap an envelope and decode its `data` member.
///
/// Any `result` other than `"success"` is an error, even when `data` is present.
pub fn decode_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<T, UpstreamError> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    let EnvelopeBody {
        result,
        message,
        data,
    } = envelope.response;

    if result != SUCCESS {
        return Err(UpstreamError::Envelope {
            result,
            message: message.unwrap_or_default(),
        });
    }

    Ok(serde_json::from_value(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_success_payload() {
        let body = br#"{"response":{"result":"success","message":null,"data":{"n":3}}}"#;
        let value: serde_json::Value = decode_envelope(body).unwrap();
        assert_eq!(value["n"], 3);
    }

    #[test]
    fn non_success_result_is_an_error() {
        let body = br#"{"response":{"result":"error","message":"Invalid apikey","data":{}}}"#;
        let err = decode_envelope::<serde_json::Value>(body).unwrap_err();
        match err {
            UpstreamError::Envelope { result, message } => {
                assert_eq!(result, "error");
                assert_eq!(message, "Invalid apikey");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_result_is_an_error() {
        let body = br#"{"response":{"data":[]}}"#;
        assert!(decode_envelope::<Vec<serde_json::Value>>(body).is_err());
    }

    #[test]
    fn garbage_body_is_a_json_error() {
        let err = decode_envelope::<serde_json::Value>(b"<html>").unwrap_err();
        assert!(matches!(err, UpstreamError::Json(_)));
    }
}
