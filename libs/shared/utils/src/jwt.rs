use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

type HmacSha256 = Hmac<Sha256>;

/// Verifies an HS256 token against `jwt_secret` and returns the caller.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let (header_b64, claims_b64, signature_b64) = (parts[0], parts[1], parts[2]);

    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        "Invalid signature encoding".to_string()
    })?;

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_json = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| "Invalid claims encoding".to_string())?;

    let claims: JwtClaims = serde_json::from_str(&claims_json).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        "Invalid claims format".to_string()
    })?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp().max(0) as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    let created_at = claims
        .iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = User {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        metadata: claims.user_metadata,
        created_at,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TokenBuilder, TEST_JWT_SECRET};

    #[test]
    fn accepts_token_signed_with_secret() {
        let builder = TokenBuilder::doctor().subject("doctor-42");

        let user = validate_token(&builder.build(), TEST_JWT_SECRET).unwrap();
        assert_eq!(user.id, "doctor-42");
        assert_eq!(user.role.as_deref(), Some("doctor"));
        assert!(user.created_at.is_some());
    }

    #[test]
    fn token_without_role_has_no_role() {
        let user = validate_token(&TokenBuilder::without_role().build(), TEST_JWT_SECRET).unwrap();
        assert_eq!(user.role, None);
    }

    #[test]
    fn rejects_wrong_signature() {
        let token = TokenBuilder::doctor().signed_with("wrong-secret").build();
        assert_eq!(validate_token(&token, TEST_JWT_SECRET).unwrap_err(), "Invalid token signature");
    }

    #[test]
    fn rejects_expired_token() {
        let token = TokenBuilder::doctor().expired().build();
        assert_eq!(validate_token(&token, TEST_JWT_SECRET).unwrap_err(), "Token expired");
    }

    #[test]
    fn rejects_malformed_token_and_missing_secret() {
        assert!(validate_token("invalid.token.format", TEST_JWT_SECRET).is_err());
        assert!(validate_token("onlyonepart", TEST_JWT_SECRET).is_err());

        let token = TokenBuilder::doctor().build();
        assert_eq!(validate_token(&token, "").unwrap_err(), "JWT secret is not set");
    }
}
