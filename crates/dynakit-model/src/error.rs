//! Engine error taxonomy.
//!
//! Whatever adapter talks to the remote engine normalizes its failures into
//! [`EngineError`], whose [`EngineErrorKind`] is a closed set. Wire error codes
//! arrive either short (`ValidationException`) or fully-qualified
//! (`com.amazonaws.dynamodb.v20120810#ValidationException`); both map the same.

use std::fmt;

/// Closed classification of engine-originated failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineErrorKind {
    /// The request was rejected as malformed.
    ValidationError,
    /// A condition expression evaluated to false.
    ConditionalCheckFailed,
    /// Table, index, stream or shard not found.
    ResourceNotFound,
    /// Resource is being created, updated or deleted.
    ResourceInUse,
    /// Provisioned throughput or request limit exceeded.
    ThroughputExceeded,
    /// The caller was throttled.
    ThrottlingError,
    /// Credentials were rejected or lack permission.
    AccessDenied,
    /// The request never reached the engine or timed out in transit.
    NetworkError,
    /// The engine failed internally.
    InternalError,
    /// Anything not covered above.
    #[default]
    UnknownError,
}

impl EngineErrorKind {
    /// Classify a wire error code.
    ///
    /// Accepts both the short code and the fully-qualified `__type` form.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        let short = code.rsplit_once('#').map_or(code, |(_, short)| short);
        match short {
            "ValidationException" | "SerializationException" | "MissingAction" => {
                Self::ValidationError
            }
            "ConditionalCheckFailedException" => Self::ConditionalCheckFailed,
            "ResourceNotFoundException" | "TrimmedDataAccessException" => Self::ResourceNotFound,
            "ResourceInUseException" => Self::ResourceInUse,
            "ProvisionedThroughputExceededException" | "RequestLimitExceeded" => {
                Self::ThroughputExceeded
            }
            "ThrottlingException" | "LimitExceededException" => Self::ThrottlingError,
            "AccessDeniedException"
            | "UnrecognizedClientException"
            | "InvalidSignatureException"
            | "ExpiredTokenException" => Self::AccessDenied,
            "InternalServerError" | "InternalFailure" | "ServiceUnavailable" => {
                Self::InternalError
            }
            _ => Self::UnknownError,
        }
    }

    /// Returns the short name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "ValidationError",
            Self::ConditionalCheckFailed => "ConditionalCheckFailed",
            Self::ResourceNotFound => "ResourceNotFound",
            Self::ResourceInUse => "ResourceInUse",
            Self::ThroughputExceeded => "ThroughputExceeded",
            Self::ThrottlingError => "ThrottlingError",
            Self::AccessDenied => "AccessDenied",
            Self::NetworkError => "NetworkError",
            Self::InternalError => "InternalError",
            Self::UnknownError => "UnknownError",
        }
    }

    /// Whether a caller may reasonably retry the same request later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ThroughputExceeded
                | Self::ThrottlingError
                | Self::NetworkError
                | Self::InternalError
        )
    }
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized engine failure.
#[derive(Debug)]
pub struct EngineError {
    /// The error classification.
    pub kind: EngineErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// The HTTP status code, when the engine answered at all.
    pub status_code: Option<http::StatusCode>,
    /// The engine-assigned request id, when available.
    pub request_id: Option<String>,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EngineError({}): {}", self.kind, self.message)?;
        if let Some(status) = self.status_code {
            write!(f, " [status {}]", status.as_u16())?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " [request {request_id}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl EngineError {
    /// Create a new `EngineError` with a message.
    #[must_use]
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            request_id: None,
            source: None,
        }
    }

    /// Create an error from a wire error code and message.
    #[must_use]
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::from_code(code), message)
    }

    /// Attach the HTTP status code.
    #[must_use]
    pub fn with_status(mut self, status: http::StatusCode) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Attach the engine request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether this failure is worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    // -- Convenience constructors --

    /// Resource not found.
    #[must_use]
    pub fn resource_not_found(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::ResourceNotFound, message)
    }

    /// Transport-level failure.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::NetworkError, message)
    }

    /// Engine-side internal failure.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(EngineErrorKind::InternalError, message)
    }
}

/// Convenience result type for engine calls.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_classify_short_and_qualified_codes() {
        assert_eq!(
            EngineErrorKind::from_code("ValidationException"),
            EngineErrorKind::ValidationError
        );
        assert_eq!(
            EngineErrorKind::from_code("com.amazon.coral.validate#ValidationException"),
            EngineErrorKind::ValidationError
        );
        assert_eq!(
            EngineErrorKind::from_code(
                "com.amazonaws.dynamodb.v20120810#ConditionalCheckFailedException"
            ),
            EngineErrorKind::ConditionalCheckFailed
        );
    }

    #[test]
    fn test_should_classify_capacity_errors() {
        assert_eq!(
            EngineErrorKind::from_code("ProvisionedThroughputExceededException"),
            EngineErrorKind::ThroughputExceeded
        );
        assert_eq!(
            EngineErrorKind::from_code("ThrottlingException"),
            EngineErrorKind::ThrottlingError
        );
        assert!(EngineErrorKind::ThrottlingError.is_retryable());
        assert!(!EngineErrorKind::AccessDenied.is_retryable());
    }

    #[test]
    fn test_should_fall_back_to_unknown() {
        assert_eq!(
            EngineErrorKind::from_code("SomethingNew"),
            EngineErrorKind::UnknownError
        );
    }

    #[test]
    fn test_should_render_status_and_request_id() {
        let err = EngineError::from_code("ResourceNotFoundException", "Requested resource not found")
            .with_status(http::StatusCode::BAD_REQUEST)
            .with_request_id("REQ123");
        assert_eq!(err.kind, EngineErrorKind::ResourceNotFound);
        assert_eq!(
            err.to_string(),
            "EngineError(ResourceNotFound): Requested resource not found [status 400] [request REQ123]"
        );
    }
}
