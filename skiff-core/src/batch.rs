use serde_json::Value as Json;

/// How a "many" composite operation issues its underlying calls.
///
/// Sequential is the contract default: predictable ordering and no pressure
/// on the remote service. A concurrent strategy can be added behind this
/// name without changing the public surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionStrategy {
    #[default]
    Sequential,
}

/// One independent sub-request of an explicit batch submission.
///
/// `path` is relative to the database root; the adapter assigns each part a
/// correlation id and renders the multi-part body.
#[derive(Debug, Clone)]
pub struct BatchPart {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Json>,
}

impl BatchPart {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: impl Into<String>, body: Json) -> Self {
        Self::new("POST", path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Json) -> Self {
        Self::new("PATCH", path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new("DELETE", path)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Json) -> Self {
        self.body = Some(body);
        self
    }
}

/// Decoded sub-response of a batch submission, in submission order.
#[derive(Debug, Clone)]
pub struct BatchReply {
    /// Correlation id echoed by the service, when present.
    pub content_id: Option<String>,
    pub status: u16,
    /// Decoded JSON body, when the part carried one.
    pub body: Option<Json>,
    /// Raw body text when it was not decodable JSON.
    pub text: Option<String>,
}

impl BatchReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
