use http::StatusCode;
use thiserror::Error;

/// Client-side taxonomy for failed calls against the news service.
///
/// Every mutating action catches one of these at its initiation site and
/// surfaces it as a one-shot user-visible message; nothing is retried
/// automatically and nothing crashes the application.
#[derive(Error, Debug)]
pub enum ApiError {
    /// 401 from the login endpoint — bad credentials.  Carries the server's
    /// detail verbatim for display on the login form.
    #[error("{0}")]
    Authentication(String),

    /// 422 — first validation message; field-level detail discarded.
    #[error("{0}")]
    Validation(String),

    /// 409 — conflict detail shown verbatim.
    #[error("{0}")]
    Conflict(String),

    /// 401/403 on an action the UI should never have offered.  Surfaced
    /// generically; the capability check failing upstream is the real fix.
    #[error("not permitted: {0}")]
    Denied(String),

    /// Any other non-2xx status.
    #[error("request failed with status {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// Connect, write, read, or timeout failure.
    #[error("network error: {0}")]
    Network(String),

    /// 2xx response whose body did not parse as the expected shape.
    #[error("invalid response body: {0}")]
    Body(String),
}
