use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::{rngs::OsRng, RngCore};

use crate::error::Result;
use crate::middleware::auth::Claims;
use crate::models::user::Role;

/// 32 random bytes, hex encoded. Used for email verification and password reset links.
pub fn generate_verification_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Signs a session JWT and returns it with its expiry.
pub fn issue_jwt(
    user_id: i64,
    email: &str,
    role: Option<Role>,
    secret: &str,
    ttl_hours: i64,
) -> Result<(String, DateTime<Utc>)> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(ttl_hours);
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.map(|r| r.as_str().to_string()),
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, expires_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_claims;

    #[test]
    fn verification_tokens_are_64_hex_chars_and_unique() {
        let a = generate_verification_token();
        let b = generate_verification_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn issued_jwt_decodes_with_same_secret_only() {
        let (token, expires_at) =
            issue_jwt(42, "dev@example.com", Some(Role::Developer), "secret", 1).unwrap();
        assert!(expires_at > Utc::now());

        let claims = decode_claims(&token, "secret").unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.role.as_deref(), Some("developer"));
        assert!(decode_claims(&token, "other").is_err());
    }
}
