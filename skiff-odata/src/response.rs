use serde_json::Value as Json;
use skiff_core::{Error, ErrorDetail, Result, WireResponse};

/// Decoded response body.
pub(crate) enum Payload {
    Empty,
    Json(Json),
    Text(String),
}

pub(crate) struct ServiceResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub payload: Payload,
}

impl ServiceResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Status 204 or an empty body decode to an empty payload; otherwise JSON,
/// falling back to raw text when parsing fails (malformed error bodies).
pub(crate) fn decode_response(response: WireResponse) -> ServiceResponse {
    let payload = if response.status == 204 || response.body.is_empty() {
        Payload::Empty
    } else {
        match serde_json::from_slice::<Json>(&response.body) {
            Ok(json) => Payload::Json(json),
            Err(_) => Payload::Text(response.text()),
        }
    };
    ServiceResponse {
        status: response.status,
        content_type: response.content_type,
        payload,
    }
}

/// Non-2xx responses become typed protocol errors; a success result is never
/// returned alongside an error.
pub(crate) fn ensure_success(response: ServiceResponse) -> Result<Payload> {
    if response.is_success() {
        Ok(response.payload)
    } else {
        Err(protocol_error(response.status, &response.payload))
    }
}

pub(crate) fn protocol_error(status: u16, payload: &Payload) -> Error {
    match payload {
        Payload::Json(json) => match json.get("error") {
            Some(body) => {
                let message = body
                    .get("message")
                    .and_then(|m| {
                        // Some services nest the text as {"message": {"value": ...}}.
                        m.as_str()
                            .or_else(|| m.get("value").and_then(Json::as_str))
                    })
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("service answered with status {status}"));
                let mut error = Error::protocol(message);
                if let Some(code) = body.get("code").and_then(Json::as_str) {
                    error = error.with_code(code);
                }
                if let Some(target) = body.get("target").and_then(Json::as_str) {
                    error = error.with_target(target);
                }
                if let Some(details) = body.get("details").and_then(Json::as_array) {
                    error = error.with_details(details.iter().map(|entry| {
                        let mut detail = ErrorDetail::new(
                            entry
                                .get("message")
                                .and_then(Json::as_str)
                                .unwrap_or_default(),
                        );
                        if let Some(code) = entry.get("code").and_then(Json::as_str) {
                            detail = detail.with_code(code);
                        }
                        if let Some(target) = entry.get("target").and_then(Json::as_str) {
                            detail = detail.with_target(target);
                        }
                        detail
                    }));
                }
                error
            }
            None => Error::protocol(format!("service answered with status {status}: {json}"))
                .with_code(status.to_string()),
        },
        Payload::Text(text) => {
            Error::protocol(format!("service answered with status {status}: {text}"))
                .with_code(status.to_string())
        }
        Payload::Empty => Error::protocol(format!("service answered with status {status}"))
            .with_code(status.to_string()),
    }
}
