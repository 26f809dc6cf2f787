use serde::Deserialize;
use thiserror::Error;

/// SQLSTATE raised on a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE raised when a value cannot be cast, e.g. a malformed uuid.
pub const INVALID_TEXT_REPRESENTATION: &str = "22P02";
/// SQLSTATE used by `raise exception` without an explicit errcode.
pub const RAISE_EXCEPTION: &str = "P0001";

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// A non-success response from the REST interface, kept typed so services
/// can react to specific database conditions.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("API error ({status}): {message}")]
pub struct PostgrestError {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl PostgrestError {
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

        Self {
            status,
            code: parsed.code,
            message: parsed.message.unwrap_or_else(|| body.to_string()),
            details: parsed.details,
            hint: parsed.hint,
        }
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }

    pub fn is_unique_violation(&self) -> bool {
        self.has_code(UNIQUE_VIOLATION)
    }

    pub fn is_invalid_input(&self) -> bool {
        self.has_code(INVALID_TEXT_REPRESENTATION)
    }

    /// True when a database function raised an exception whose message is `tag`.
    pub fn is_raised(&self, tag: &str) -> bool {
        self.has_code(RAISE_EXCEPTION) && self.message.trim() == tag
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Finds the typed store error inside an `anyhow` chain.
pub fn postgrest_error(err: &anyhow::Error) -> Option<&PostgrestError> {
    err.downcast_ref::<PostgrestError>()
}
