//! MFA assurance token issuance and validation.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
#[cfg(any(feature = "ISSUER", test))]
use serde::Serialize;
use uuid::Uuid;

/// Verified identity extracted from a valid assurance token.
#[derive(Debug, Clone)]
pub struct AssuranceInfo {
    pub email: String,
    pub challenge_id: Uuid,
    pub expires_at: u64,
}

/// Errors returned by [`validate_assurance_token`].
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("token encoding failed")]
    Encoding,
}

/// JWT claims proving that `sub` completed the email-code step.
///
/// | Field | JWT claim | Meaning |
/// |-------|-----------|---------|
/// | `sub` | `sub` | normalised email |
/// | `cid` | custom | id of the consumed verification challenge |
/// | `exp` | `exp` | expiration, seconds since epoch |
///
/// [`Serialize`] is only derived with the **`ISSUER`** feature: the MFA service is
/// the sole issuer, everyone else validates.
#[derive(Debug, Deserialize)]
#[cfg_attr(any(feature = "ISSUER", test), derive(Serialize))]
pub struct AssuranceClaims {
    pub sub: String,
    pub cid: String,
    pub exp: u64,
}

fn decode_jwt(token: &str, secret: &str) -> Result<AssuranceClaims, TokenError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<AssuranceClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    })?;

    Ok(data.claims)
}

/// Validate an assurance-token cookie value.
pub fn validate_assurance_token(
    cookie_value: &str,
    secret: &str,
) -> Result<AssuranceInfo, TokenError> {
    let claims = decode_jwt(cookie_value, secret)?;
    let challenge_id = claims
        .cid
        .parse::<Uuid>()
        .map_err(|_| TokenError::Malformed)?;
    Ok(AssuranceInfo {
        email: claims.sub,
        challenge_id,
        expires_at: claims.exp,
    })
}

/// Sign an assurance token for `email`, expiring at `exp` (seconds since epoch).
#[cfg(any(feature = "ISSUER", test))]
pub fn issue_assurance_token(
    email: &str,
    challenge_id: Uuid,
    exp: u64,
    secret: &str,
) -> Result<String, TokenError> {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = AssuranceClaims {
        sub: email.to_owned(),
        cid: challenge_id.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| TokenError::Encoding)
}
