use std::fmt::{self, Display, Formatter};

/// Classifies every failure this crate can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network failure before any response was obtained.
    Transport,
    /// The per-call timeout expired while the request was still in flight.
    Timeout,
    /// The service answered with a non-2xx status.
    Protocol,
    /// Input or response data did not match the declared schema.
    Validation,
    /// The addressed record does not exist.
    NotFound,
    /// A single-record query matched more than one record.
    Cardinality,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not found",
            ErrorKind::Cardinality => "cardinality",
        })
    }
}

/// One entry of a service-reported error detail list, or one field-level
/// validation issue when decoding a response against the declared schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetail {
    pub code: Option<String>,
    pub message: String,
    pub target: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// Error raised at the adapter boundary or by schema validation.
///
/// `code`, `target` and `details` carry whatever the service reported when the
/// body was decodable; they stay empty for locally produced errors.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub code: Option<String>,
    pub message: String,
    pub target: Option<String>,
    pub details: Vec<ErrorDetail>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            target: None,
            details: Vec::new(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }
    pub fn cardinality(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cardinality, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
    pub fn with_details(mut self, details: impl IntoIterator<Item = ErrorDetail>) -> Self {
        self.details.extend(details);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}
