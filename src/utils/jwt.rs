use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey, Algorithm};
use serde::{Deserialize, Serialize};
use chrono::{Utc, Duration};
use uuid::Uuid;

use crate::models::enums::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,        // user_id
    pub email: String,
    pub role: Role,
    pub exp: i64,        // expiration timestamp
    pub jti: String,     // identifiant unique du token (traces)
}

/// Génère un JWT token pour un utilisateur
pub fn generate_token(
    secret: &str,
    ttl_hours: i64,
    user_id: i32,
    email: &str,
    role: Role,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        exp: (Utc::now() + Duration::hours(ttl_hours)).timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Vérifie et décode un JWT token
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
        .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify_token() {
        let token = generate_token("secret", 1, 123, "pharma@pharmia.tn", Role::Pharmacien).unwrap();
        let claims = verify_token("secret", &token).unwrap();

        assert_eq!(claims.sub, 123);
        assert_eq!(claims.email, "pharma@pharmia.tn");
        assert_eq!(claims.role, Role::Pharmacien);
    }

    #[test]
    fn test_invalid_token() {
        assert!(verify_token("secret", "invalid.token.here").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let token = generate_token("secret", 1, 1, "a@pharmia.tn", Role::Admin).unwrap();
        assert!(verify_token("other-secret", &token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let token = generate_token("secret", -2, 1, "a@pharmia.tn", Role::Admin).unwrap();
        assert!(verify_token("secret", &token).is_err());
    }
}
