use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims minted by the identity provider after the SSO exchange. The
/// service trusts them as given; it never re-authenticates.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id (uuid string).
    pub sub: String,
    pub email: String,
    pub name: String,
    /// "ADMIN" | "USER"
    pub role: String,
    pub exp: usize,
    pub jti: String,
}

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

/// Mint a token the way the identity provider would. Used by operational
/// tooling and tests; the production path only verifies.
pub fn generate_token(
    user_id: String,
    email: String,
    name: String,
    role: String,
    secret: &str,
    ttl: usize,
) -> String {
    let claims = Claims {
        sub: user_id,
        email,
        name,
        role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_round_trips_claims() {
        let token = generate_token(
            "u-123".into(),
            "u@example.com".into(),
            "U. Ser".into(),
            "USER".into(),
            "secret",
            300,
        );
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "u-123");
        assert_eq!(claims.role, "USER");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_token(
            "u-123".into(),
            "u@example.com".into(),
            "U. Ser".into(),
            "USER".into(),
            "secret",
            300,
        );
        assert!(verify_token(&token, "other").is_err());
    }
}
