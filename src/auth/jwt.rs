use std::time::Duration;

use axum::extract::FromRef;
use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::{
    crypto, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header,
};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use super::claims::{decode_subject, Claims, RawClaims};
use crate::{config::JwtConfig, state::AppState};

/// The only algorithm tokens are signed with or accepted under.
const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signing failed: {0}")]
    SigningFailure(String),
    #[error("token is invalid")]
    TokenInvalid,
    #[error("token is expired")]
    TokenExpired,
    #[error("token subject claim is missing or unsupported")]
    ClaimMissing,
}

#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    has_secret: bool,
    ttl: Duration,
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.as_ref().clone()
    }
}

impl TokenKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            has_secret: !secret.is_empty(),
            ttl,
        }
    }

    pub fn from_config(cfg: &JwtConfig) -> Self {
        let minutes = u64::try_from(cfg.ttl_minutes).unwrap_or(0);
        Self::new(&cfg.secret, Duration::from_secs(minutes.saturating_mul(60)))
    }

    /// Configured lifetime of tokens issued at login.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: i64, email: &str, ttl: Duration) -> Result<String, TokenError> {
        if !self.has_secret {
            return Err(TokenError::SigningFailure("signing secret is empty".into()));
        }
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| TokenError::SigningFailure("ttl out of range".into()))?;
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now,
            exp: now.saturating_add(ttl_secs),
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)
            .map_err(|e| TokenError::SigningFailure(e.to_string()))?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    /// Checks signature, algorithm and expiry, then recovers the subject id.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        if !self.has_secret {
            return Err(TokenError::TokenInvalid);
        }

        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            debug!("jwt rejected: expected three segments");
            return Err(TokenError::TokenInvalid);
        };

        let parsed = decode_header(token).map_err(|e| {
            debug!(error = %e, "jwt rejected: bad header");
            TokenError::TokenInvalid
        })?;
        if parsed.alg != ALGORITHM {
            debug!(alg = ?parsed.alg, "jwt rejected: algorithm not accepted");
            return Err(TokenError::TokenInvalid);
        }

        let message = &token[..header.len() + 1 + payload.len()];
        match crypto::verify(signature, message.as_bytes(), &self.decoding, ALGORITHM) {
            Ok(true) => {}
            Ok(false) => {
                debug!("jwt rejected: signature mismatch");
                return Err(TokenError::TokenInvalid);
            }
            Err(e) => {
                debug!(error = %e, "jwt rejected: signature check failed");
                return Err(TokenError::TokenInvalid);
            }
        }

        // Claims are read here rather than by `decode` so that any `sub` shape
        // reaches `decode_subject`.
        let claims: RawClaims = Base64UrlUnpadded::decode_vec(payload)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or_else(|| {
                debug!("jwt rejected: unreadable claims");
                TokenError::TokenInvalid
            })?;

        if claims.exp <= OffsetDateTime::now_utc().unix_timestamp() {
            return Err(TokenError::TokenExpired);
        }

        let user_id = decode_subject(claims.sub.as_ref())?;
        debug!(user_id, "jwt verified");
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    const SECRET: &str = "dev-secret";

    fn keys() -> TokenKeys {
        TokenKeys::new(SECRET, Duration::from_secs(300))
    }

    fn sign_raw<T: Serialize>(alg: Algorithm, secret: &str, claims: &T) -> String {
        encode(&Header::new(alg), claims, &EncodingKey::from_secret(secret.as_bytes()))
            .expect("encode")
    }

    fn far_future() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp() + 3600
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let keys = keys();
        let token = keys.issue(7, "ada@x.com", keys.ttl()).expect("issue");
        assert_eq!(keys.verify(&token), Ok(7));
    }

    #[test]
    fn roundtrip_preserves_ids_beyond_float_precision() {
        let keys = keys();
        for id in [1, (1_i64 << 53) + 1, i64::MAX - 1] {
            let token = keys.issue(id, "big@x.com", keys.ttl()).unwrap();
            assert_eq!(keys.verify(&token), Ok(id));
        }
    }

    #[test]
    fn zero_ttl_is_expired() {
        let keys = keys();
        let token = keys.issue(1, "a@x.com", Duration::ZERO).unwrap();
        assert_eq!(keys.verify(&token), Err(TokenError::TokenExpired));
    }

    #[test]
    fn past_expiry_is_expired() {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let token = sign_raw(ALGORITHM, SECRET, &json!({ "sub": 1, "exp": now - 300 }));
        assert_eq!(keys().verify(&token), Err(TokenError::TokenExpired));
    }

    #[test]
    fn empty_secret_cannot_sign() {
        let keys = TokenKeys::new("", Duration::from_secs(60));
        assert!(matches!(
            keys.issue(1, "a@x.com", keys.ttl()),
            Err(TokenError::SigningFailure(_))
        ));
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = keys().issue(1, "a@x.com", Duration::from_secs(60)).unwrap();
        let other = TokenKeys::new("other-secret", Duration::from_secs(60));
        assert_eq!(other.verify(&token), Err(TokenError::TokenInvalid));
    }

    #[test]
    fn rejects_other_algorithms_even_with_the_right_secret() {
        let claims = json!({ "sub": 1, "exp": far_future() });
        for alg in [Algorithm::HS384, Algorithm::HS512] {
            let token = sign_raw(alg, SECRET, &claims);
            assert_eq!(keys().verify(&token), Err(TokenError::TokenInvalid));
        }
    }

    #[test]
    fn rejects_unsigned_token() {
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.\
                     eyJzdWIiOjEsImVtYWlsIjoiYUB4LmNvbSIsImV4cCI6NDEwMjQ0NDgwMH0.";
        assert_eq!(keys().verify(token), Err(TokenError::TokenInvalid));
    }

    #[test]
    fn rejects_tampered_payload() {
        let token = keys().issue(1, "a@x.com", Duration::from_secs(60)).unwrap();
        let forged_payload = "eyJzdWIiOjEsImVtYWlsIjoiYUB4LmNvbSIsImV4cCI6NDEwMjQ0NDgwMH0";
        let parts: Vec<&str> = token.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert_eq!(keys().verify(&forged), Err(TokenError::TokenInvalid));
    }

    #[test]
    fn rejects_garbage_and_missing_exp() {
        assert_eq!(keys().verify("not.a.token"), Err(TokenError::TokenInvalid));
        let token = sign_raw(ALGORITHM, SECRET, &json!({ "sub": 1 }));
        assert_eq!(keys().verify(&token), Err(TokenError::TokenInvalid));
    }

    #[test]
    fn subject_encodings() {
        let exp = far_future();
        let float_sub = sign_raw(ALGORITHM, SECRET, &json!({ "sub": 42.0, "exp": exp }));
        assert_eq!(keys().verify(&float_sub), Ok(42));

        let string_sub = sign_raw(ALGORITHM, SECRET, &json!({ "sub": "42", "exp": exp }));
        assert_eq!(keys().verify(&string_sub), Ok(42));

        let no_sub = sign_raw(ALGORITHM, SECRET, &json!({ "email": "a@x.com", "exp": exp }));
        assert_eq!(keys().verify(&no_sub), Err(TokenError::ClaimMissing));

        for sub in [json!([1]), json!({ "id": 1 }), json!(true), json!(null), json!("abc")] {
            let token = sign_raw(ALGORITHM, SECRET, &json!({ "sub": sub, "exp": exp }));
            assert_eq!(keys().verify(&token), Err(TokenError::ClaimMissing), "sub = {sub}");
        }
    }

    #[test]
    fn unsupported_subject_still_needs_a_valid_signature() {
        let exp = far_future();
        let token = sign_raw(ALGORITHM, "other-secret", &json!({ "sub": [1], "exp": exp }));
        assert_eq!(keys().verify(&token), Err(TokenError::TokenInvalid));
    }

    #[test]
    fn rejects_extra_segments() {
        let token = keys().issue(1, "a@x.com", Duration::from_secs(60)).unwrap();
        assert_eq!(keys().verify(&format!("{token}.x")), Err(TokenError::TokenInvalid));
    }

    #[test]
    fn oversized_ttl_saturates_instead_of_overflowing() {
        let keys = TokenKeys::from_config(&JwtConfig {
            secret: SECRET.into(),
            ttl_minutes: i64::MAX,
        });
        assert_eq!(keys.ttl(), Duration::from_secs(u64::MAX));
        let negative = TokenKeys::from_config(&JwtConfig {
            secret: SECRET.into(),
            ttl_minutes: -5,
        });
        assert_eq!(negative.ttl(), Duration::ZERO);
    }
}
