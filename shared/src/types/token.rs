use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token is not in compact JWS form")]
    Malformed,

    #[error("token payload is not valid base64url: {0}")]
    PayloadEncoding(#[from] base64::DecodeError),

    #[error("token claims are not valid JSON: {0}")]
    Claims(#[from] serde_json::Error),

    #[error("token subject is not a numeric id: {0:?}")]
    Subject(String),
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// Claims embedded in every access token issued by the news service.
///
/// Decoded client-side purely for UI gating — which buttons to show, which
/// actions to offer.  The server verifies the signature and re-checks these
/// claims on every request, so no verification happens here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Standard JWT subject — the numeric user id, serialized as a string.
    pub sub: String,

    /// Whether the subject has admin privileges.
    pub admin: bool,

    /// Whether the subject is a verified author (may publish news).
    pub verified: bool,

    /// Standard JWT expiry (Unix timestamp, seconds).
    pub exp: u64,
}

impl TokenClaims {
    /// Expiry check against a millisecond clock reading.
    ///
    /// `exp` is in seconds; a token expiring exactly now counts as expired.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.exp.saturating_mul(1000) <= now_ms
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode the payload segment of a compact JWS token into [`TokenClaims`].
///
/// Accepts exactly `header.payload.signature`; the header and signature
/// segments are not inspected.
pub fn decode(token: &str) -> Result<TokenClaims, TokenError> {
    let mut segments = token.split('.');

    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(header), Some(payload), Some(_signature))
            if !header.is_empty() && !payload.is_empty() =>
        {
            payload
        }
        _ => return Err(TokenError::Malformed),
    };

    if segments.next().is_some() {
        return Err(TokenError::Malformed);
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload)?;
    let claims: TokenClaims = serde_json::from_slice(&bytes)?;

    Ok(claims)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a structurally valid token around the given claims JSON.
    /// The signature segment is junk — the decoder must not care.
    fn forge(claims_json: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims_json.as_bytes());
        format!("{}.{}.sig", header, payload)
    }

    #[test]
    fn decodes_well_formed_token() {
        let token = forge(r#"{"sub":"7","admin":false,"verified":true,"exp":4102444800}"#);
        let claims = decode(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert!(!claims.admin);
        assert!(claims.verified);
        assert_eq!(claims.exp, 4_102_444_800);
    }

    #[test]
    fn rejects_token_without_three_segments() {
        assert!(matches!(decode("just-one"), Err(TokenError::Malformed)));
        assert!(matches!(decode("two.parts"), Err(TokenError::Malformed)));
        assert!(matches!(
            decode("a.b.c.extra"),
            Err(TokenError::Malformed)
        ));
        assert!(matches!(decode(""), Err(TokenError::Malformed)));
    }

    #[test]
    fn rejects_empty_payload_segment() {
        assert!(matches!(decode("head..sig"), Err(TokenError::Malformed)));
    }

    #[test]
    fn rejects_non_base64_payload() {
        assert!(matches!(
            decode("head.!!not-base64!!.sig"),
            Err(TokenError::PayloadEncoding(_))
        ));
    }

    #[test]
    fn rejects_non_json_payload() {
        let payload = URL_SAFE_NO_PAD.encode(b"plain text");
        let token = format!("head.{}.sig", payload);
        assert!(matches!(decode(&token), Err(TokenError::Claims(_))));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let claims = TokenClaims {
            sub: "1".into(),
            admin: false,
            verified: false,
            exp: 1_000,
        };
        // exp * 1000 <= now  →  expired exactly at the boundary.
        assert!(claims.is_expired(1_000_000));
        assert!(claims.is_expired(1_000_001));
        assert!(!claims.is_expired(999_999));
    }
}
