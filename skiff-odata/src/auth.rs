use base64::{Engine as _, engine::general_purpose::STANDARD};
use futures::future::BoxFuture;
use skiff_core::Result;

/// Supplies the `Authorization` header value, resolved once per request.
///
/// Concrete credential schemes live here in the adapter crate; the core only
/// sees the resolved header. A provider backed by a delegated login service
/// can refresh its token inside [`AuthProvider::authorization`].
pub trait AuthProvider: Send + Sync {
    fn authorization(&self) -> BoxFuture<'_, Result<String>>;
}

/// HTTP Basic credentials.
pub struct BasicAuth {
    username: String,
    password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl AuthProvider for BasicAuth {
    fn authorization(&self) -> BoxFuture<'_, Result<String>> {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        Box::pin(async move { Ok(format!("Basic {encoded}")) })
    }
}

/// Bearer token carrying an API key issued by the login service.
pub struct BearerAuth {
    key: String,
}

impl BearerAuth {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl AuthProvider for BearerAuth {
    fn authorization(&self) -> BoxFuture<'_, Result<String>> {
        let header = format!("Bearer {}", self.key);
        Box::pin(async move { Ok(header) })
    }
}
