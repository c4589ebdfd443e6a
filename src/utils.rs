use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::models::user::Role;

pub const AUTH_COOKIE: &str = "auth_token";
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("{} access required", role)))
        }
    }

    pub fn object_id(&self) -> Result<bson::oid::ObjectId, AppError> {
        bson::oid::ObjectId::parse_str(&self.user_id)
            .map_err(|_| AppError::Unauthorized("Invalid token payload".to_string()))
    }
}

/// Credentials kept on the user document: the encoded hash and the salt it was made with.
pub struct HashedPassword {
    pub hash: String,
    pub salt: String,
}

pub fn hash_password(password: &str) -> Result<HashedPassword, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))?
        .to_string();
    Ok(HashedPassword { hash, salt: salt.as_str().to_string() })
}

pub fn verify_password(password: &str, hash: &str, salt: &str) -> bool {
    let Ok(salt) = SaltString::from_b64(salt) else {
        return false;
    };
    match Argon2::default().hash_password(password.as_bytes(), &salt) {
        Ok(candidate) => candidate.to_string() == hash,
        Err(_) => false,
    }
}

pub fn generate_jwt(
    user_id: &str,
    email: &str,
    username: &str,
    role: Role,
    secret: &str,
) -> Result<String, AppError> {
    let now = chrono::Utc::now();
    let expiration = now + chrono::Duration::hours(TOKEN_TTL_HOURS);
    let claims = Claims {
        user_id: user_id.to_string(),
        email: email.to_string(),
        username: username.to_string(),
        role,
        exp: expiration.timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
        .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))
}

pub fn validate_jwt(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &Validation::default())
        .map(|data| data.claims)
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trips_with_stored_salt() {
        let hashed = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hashed.hash, &hashed.salt));
        assert!(!verify_password("hunter23", &hashed.hash, &hashed.salt));
    }

    #[test]
    fn token_carries_identity_and_role() {
        let token = generate_jwt("abc", "a@b.c", "ana", Role::Mentee, "secret").unwrap();
        let claims = validate_jwt(&token, "secret").unwrap();
        assert_eq!(claims.user_id, "abc");
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.role, Role::Mentee);
        assert_eq!(claims.exp - claims.iat, (TOKEN_TTL_HOURS * 3600) as usize);
        assert!(validate_jwt(&token, "other").is_none());
    }

    #[test]
    fn role_guard_rejects_other_role() {
        let token = generate_jwt("abc", "a@b.c", "ana", Role::Mentee, "secret").unwrap();
        let claims = validate_jwt(&token, "secret").unwrap();
        assert!(claims.require_role(Role::Mentee).is_ok());
        assert!(matches!(claims.require_role(Role::Mentor), Err(AppError::Forbidden(_))));
    }
}
