use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::jwt::TokenError;

/// JWT payload issued at login.
#[derive(Debug, Clone, Serialize)]
pub struct Claims {
    pub sub: i64,      // user ID
    pub email: String, // user email
    pub iat: i64,      // issued at (unix timestamp)
    pub exp: i64,      // expires at (unix timestamp)
}

/// Claims as read back from an incoming token. `sub` stays untyped until
/// [`decode_subject`] turns it into a user id.
#[derive(Debug, Deserialize)]
pub struct RawClaims {
    #[serde(default)]
    pub sub: Option<Value>,
    pub exp: i64,
}

/// Largest integer an f64 can carry without rounding.
const MAX_SAFE_FLOAT_INT: f64 = 9_007_199_254_740_992.0; // 2^53

/// Recovers the user id from a `sub` claim.
///
/// Accepted encodings, in order: an integral float inside the exactly
/// representable range, an exact JSON integer, a decimal string.
pub fn decode_subject(sub: Option<&Value>) -> Result<i64, TokenError> {
    match sub {
        Some(Value::Number(n)) if n.is_f64() => n
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_FLOAT_INT)
            .map(|f| f as i64)
            .ok_or(TokenError::ClaimMissing),
        Some(Value::Number(n)) => n.as_i64().ok_or(TokenError::ClaimMissing),
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| TokenError::ClaimMissing),
        _ => Err(TokenError::ClaimMissing),
    }
}
