use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{info, warn};

use shared::types::token;
use shared::types::{ApiError, Principal, TokenError};

use crate::api::ApiClient;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SessionError {
    /// The service refused the login or the call failed in transit.  An
    /// `ApiError::Authentication` here carries the server's detail verbatim
    /// for the login form.
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("received an unusable token: {0}")]
    Token(#[from] TokenError),

    #[error("received an already-expired token")]
    ExpiredToken,

    #[error("could not persist token: {0}")]
    Storage(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Session store
// ---------------------------------------------------------------------------

/// Holder of the authenticated principal and the persisted raw token.
///
/// Built once at startup and passed down explicitly — never ambient global
/// state — so tests can run against a throwaway token file.
///
/// Invariant: the token file and the in-memory principal are updated in the
/// same step by every operation; within one call they never disagree.
#[derive(Debug)]
pub struct SessionStore {
    token_file: PathBuf,
    token: Option<String>,
    principal: Option<Principal>,
}

impl SessionStore {
    pub fn new(token_file: impl Into<PathBuf>) -> Self {
        Self {
            token_file: token_file.into(),
            token: None,
            principal: None,
        }
    }

    /// Restore a previous session from the persisted token, if any.
    ///
    /// A token that is missing leaves the store unauthenticated; one that is
    /// undecodable or expired is deleted so the next start skips it.
    pub fn restore(&mut self, now_ms: u64) {
        let raw = match fs::read_to_string(&self.token_file) {
            Ok(raw) => raw.trim().to_string(),
            Err(e) if e.kind() == ErrorKind::NotFound => return,
            Err(e) => {
                warn!("Could not read token file: {}", e);
                return;
            }
        };

        match principal_from_token(&raw, now_ms) {
            Ok(principal) => {
                info!("Session restored for user {}", principal.id);
                self.token = Some(raw);
                self.principal = Some(principal);
            }
            Err(err) => {
                warn!("Discarding persisted token: {}", err);
                self.remove_token_file();
                self.token = None;
                self.principal = None;
            }
        }
    }

    /// Authenticate against the service, persist the received token, and set
    /// the new principal — all in one step.  On any failure the store is
    /// left exactly as it was.
    pub async fn login(
        &mut self,
        api: &ApiClient,
        username: &str,
        password: &str,
        now_ms: u64,
    ) -> Result<Principal, SessionError> {
        let raw = api.login(username, password).await?;
        let principal = principal_from_token(&raw, now_ms)?;

        fs::write(&self.token_file, &raw)?;
        self.token = Some(raw);
        self.principal = Some(principal.clone());

        info!("User {} logged in", principal.id);
        Ok(principal)
    }

    /// Drop the session.  Always succeeds; calling it without a session is a
    /// no-op.
    pub fn logout(&mut self) {
        self.remove_token_file();
        self.token = None;
        self.principal = None;
        info!("Logged out");
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Raw token for the `Authorization` header, when authenticated.
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    fn remove_token_file(&self) {
        if let Err(e) = fs::remove_file(&self.token_file) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Could not remove token file: {}", e);
            }
        }
    }
}

fn principal_from_token(raw: &str, now_ms: u64) -> Result<Principal, SessionError> {
    let claims = token::decode(raw)?;
    if claims.is_expired(now_ms) {
        return Err(SessionError::ExpiredToken);
    }
    Ok(Principal::from_claims(&claims)?)
}

/// Current Unix time in milliseconds, for expiry checks.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
