//! Constants and default values.
//!
//! Centralizes the defaults shared by the policy, the sinks and the
//! request-boundary adapters.

/// Placeholder that a message format must contain exactly once.
pub const MESSAGE_PLACEHOLDER: &str = "%s";

/// Default message format for recalled records.
pub const DEFAULT_MESSAGE_FORMAT: &str = "[RECALL] %s";

/// Attribute key marking a record that was replayed from a buffer.
pub const RECALL_ATTR_KEY: &str = "recall";

/// Metadata key carrying the request id through the RPC interceptor.
pub const REQUEST_ID_KEY: &str = "x-request-id";

/// Attribute key carrying the procedure name through the RPC interceptor.
pub const PROCEDURE_KEY: &str = "procedure";

/// Default request-body capture limit (unbounded).
pub const DEFAULT_BODY_CAPTURE_LIMIT: usize = usize::MAX;

/// Header names masked by [`crate::boundary::redact_sensitive_headers`].
///
/// Matching is case-insensitive and uses substring matching.
pub const DEFAULT_SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "token",
    "api-key",
    "apikey",
    "secret",
    "password",
];

/// Replacement value for masked headers.
pub const DEFAULT_REDACTION_REPLACEMENT: &str = "[REDACTED]";
