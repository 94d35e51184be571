//! Structural (unverified) JWT decoding.
//!
//! Deliberately does not use `jsonwebtoken`'s verifying `decode()` — there is
//! no key material to verify against here, and reaching for a verifying API
//! without a key invites someone to wire up a "verification" that silently
//! never checks anything. Splitting the token by hand makes the lack of
//! verification obvious at the call site.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;
use sha2::{Digest, Sha256};

#[derive(Debug, Deserialize, Default)]
pub struct Claims {
    #[serde(default)]
    pub jti: String,
    #[serde(default)]
    pub sub: String,
    pub exp: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("token does not have three dot-separated parts")]
    MalformedEnvelope,
    #[error("claims segment is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("claims segment is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decodes the middle segment of a `header.claims.signature` JWT into
/// `Claims`, without checking the signature segment at all.
pub fn decode_claims(token: &str) -> Result<Claims, DecodeError> {
    let mut parts = token.split('.');
    let _header = parts.next().ok_or(DecodeError::MalformedEnvelope)?;
    let claims_part = parts.next().ok_or(DecodeError::MalformedEnvelope)?;
    let _signature = parts.next().ok_or(DecodeError::MalformedEnvelope)?;
    if parts.next().is_some() {
        return Err(DecodeError::MalformedEnvelope);
    }

    let bytes = URL_SAFE_NO_PAD.decode(claims_part)?;
    let claims: Claims = serde_json::from_slice(&bytes)?;
    Ok(claims)
}

/// Deterministic fallback session/token identity when a token carries no
/// `jti` claim (§4.3 step 6).
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

    fn make_token(claims_json: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"none\"}");
        let claims = URL_SAFE_NO_PAD.encode(claims_json.as_bytes());
        format!("{header}.{claims}.")
    }

    #[test]
    fn decodes_well_formed_claims() {
        let token = make_token(r#"{"jti":"t1","sub":"https://pod.example/u1#me","exp":9999999999}"#);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.jti, "t1");
        assert_eq!(claims.sub, "https://pod.example/u1#me");
        assert_eq!(claims.exp, Some(9999999999));
    }

    #[test]
    fn missing_claims_default_to_empty() {
        let token = make_token(r#"{}"#);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.jti, "");
        assert_eq!(claims.sub, "");
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn rejects_wrong_part_count() {
        assert!(matches!(
            decode_claims("only.two"),
            Err(DecodeError::MalformedEnvelope)
        ));
        assert!(matches!(
            decode_claims("a.b.c.d"),
            Err(DecodeError::MalformedEnvelope)
        ));
    }

    #[test]
    fn hash_is_stable_and_deterministic() {
        let a = hash_token("same-token");
        let b = hash_token("same-token");
        let c = hash_token("different-token");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
