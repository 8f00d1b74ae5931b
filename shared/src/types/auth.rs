use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Auth wire types
// ---------------------------------------------------------------------------

/// Body of a successful `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Signed JWT — persisted verbatim and sent back as a bearer credential.
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

// ---------------------------------------------------------------------------
// Service error body
// ---------------------------------------------------------------------------

/// Error envelope the service attaches to non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub detail: ErrorDetail,
}

/// `detail` is a plain string on business errors (401, 409, 403) and an
/// array of field reports on 422 validation failures.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Fields(Vec<FieldError>),
}

/// One entry of a 422 validation array.  Location and error-type metadata
/// are not surfaced, only the message.
#[derive(Debug, Deserialize)]
pub struct FieldError {
    pub msg: String,
}

impl ErrorDetail {
    /// First human-readable message; remaining field-level detail is
    /// discarded.  The validator prefixes custom checks with
    /// "Value error, ", which is noise for end users.
    pub fn first_message(&self) -> String {
        match self {
            Self::Message(message) => message.clone(),
            Self::Fields(fields) => fields
                .first()
                .map(|f| f.msg.trim_start_matches("Value error, ").to_string())
                .unwrap_or_else(|| "Validation failed".to_string()),
        }
    }
}
