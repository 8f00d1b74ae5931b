use serde::{Deserialize, Serialize};

use super::token::{TokenClaims, TokenError};

/// The authenticated identity and its capability flags.
///
/// Exists if and only if a non-expired, successfully decoded token is held
/// by the session store.  Immutable once built — a fresh login replaces it,
/// logout drops it; it is never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub is_admin: bool,
    pub is_verified: bool,
}

impl Principal {
    /// Build a principal from decoded claims.
    ///
    /// Ids are `i64` end-to-end: the subject is parsed once here, and a
    /// non-numeric subject is rejected like any other undecodable token.
    pub fn from_claims(claims: &TokenClaims) -> Result<Self, TokenError> {
        let id = claims
            .sub
            .trim()
            .parse::<i64>()
            .map_err(|_| TokenError::Subject(claims.sub.clone()))?;

        Ok(Self {
            id,
            is_admin: claims.admin,
            is_verified: claims.verified,
        })
    }
}
