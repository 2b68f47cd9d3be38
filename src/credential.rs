// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Credential Store: PBKDF2-HMAC-SHA1 password hashing and HMAC-SHA256
//! bearer-token issuance/verification.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{PanelError, Result};
use crate::persistence::models::Role;
use crate::persistence::Persistence;

const SALT_SIZE: usize = 24;
const HASH_SIZE: usize = 24;
const ITERATIONS: u32 = 1000;

/// Claims embedded in every issued bearer token. `pwd` and `role` are pinned
/// at issuance time so [`verify`] can detect a password change or role
/// change without parsing the token again — it just reloads the user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
    pub sub: String,
    pub uid: i64,
    pub pwd: String,
    pub role: i64,
}

/// Derives a fresh random salt and the PBKDF2-HMAC-SHA1 hash of `password`
/// under it, both base64-encoded for storage.
pub fn hash_password(password: &str) -> (String, String) {
    let mut salt_bytes = [0u8; SALT_SIZE];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = BASE64.encode(salt_bytes);
    let hash = derive(password, &salt);
    (hash, salt)
}

/// Re-derives the PBKDF2 hash of `password` under an already-stored salt.
pub fn derive(password: &str, salt_b64: &str) -> String {
    let salt_bytes = BASE64.decode(salt_b64).unwrap_or_default();
    let mut out = [0u8; HASH_SIZE];
    pbkdf2::pbkdf2_hmac::<sha1::Sha1>(password.as_bytes(), &salt_bytes, ITERATIONS, &mut out);
    BASE64.encode(out)
}

/// Looks up `username` (case-insensitive via `LIKE`), verifies the password —
/// salted compare if a salt is stored, legacy verbatim compare otherwise —
/// and issues a bearer token on success. Login failures (unknown username,
/// wrong password) are indistinguishable: both return `InvalidCredentials`.
pub async fn login(persistence: &Persistence, username: &str, password: &str, jwt_secret: &str) -> Result<(String, Role)> {
    let user = persistence
        .find_user_by_username_like(username)
        .await?
        .ok_or(PanelError::InvalidCredentials)?;

    let matches = match &user.salt {
        Some(salt) => derive(password, salt) == user.password,
        None => password == user.password,
    };
    if !matches {
        return Err(PanelError::InvalidCredentials);
    }

    let token = issue_token(&user.username, user.id, &user.password, user.role, jwt_secret)?;
    Ok((token, user.role))
}

/// Signs a bearer token for an already-authenticated user. `exp` is set far
/// in the future per the legacy contract this store preserves.
pub fn issue_token(username: &str, user_id: i64, stored_hash: &str, role: Role, jwt_secret: &str) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        exp: i32::MAX as i64,
        nbf: now,
        iat: now,
        sub: username.to_string(),
        uid: user_id,
        pwd: stored_hash.to_string(),
        role: role.as_i64(),
    };
    Ok(encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(jwt_secret.as_bytes()))?)
}

fn decode_claims(token: &str, jwt_secret: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    let data = decode::<Claims>(token, &DecodingKey::from_secret(jwt_secret.as_bytes()), &validation)
        .map_err(|_| PanelError::InvalidCredentials)?;
    Ok(data.claims)
}

/// The authentication middleware's post-JWT check: reloads the user by id and
/// confirms the token's pinned password hash and role still match. Returns
/// `false` (never an error) on any mismatch or decode failure, so the caller
/// maps it straight to `401` without distinguishing the cause.
pub async fn verify(persistence: &Persistence, token: &str, jwt_secret: &str) -> bool {
    let claims = match decode_claims(token, jwt_secret) {
        Ok(c) => c,
        Err(_) => return false,
    };
    let user = match persistence.get_user(claims.uid).await {
        Ok(u) => u,
        Err(_) => return false,
    };
    user.password == claims.pwd && user.role.as_i64() == claims.role
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Persistence {
        let file = tempfile::NamedTempFile::new().unwrap();
        Persistence::connect(file.path()).await.unwrap()
    }

    #[tokio::test]
    async fn login_with_legacy_unsalted_seed_row_succeeds() {
        let db = test_db().await;
        let (token, role) = login(&db, "admin", "admin1", "secret").await.unwrap();
        assert_eq!(role, Role::Admin);
        assert!(verify(&db, &token, "secret").await);
    }

    #[tokio::test]
    async fn unknown_username_and_wrong_password_both_fail_the_same_way() {
        let db = test_db().await;
        let unknown = login(&db, "nobody", "whatever", "secret").await;
        let wrong = login(&db, "admin", "wrong", "secret").await;
        assert!(matches!(unknown, Err(PanelError::InvalidCredentials)));
        assert!(matches!(wrong, Err(PanelError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn password_update_invalidates_prior_tokens() {
        let db = test_db().await;
        let (token, _) = login(&db, "admin", "admin1", "secret").await.unwrap();
        assert!(verify(&db, &token, "secret").await);

        let user = db.find_user_by_username_like("admin").await.unwrap().unwrap();
        let (new_hash, new_salt) = hash_password("newpassword");
        db.update_user_password(user.id, &new_hash, Some(&new_salt)).await.unwrap();

        assert!(!verify(&db, &token, "secret").await);
    }
}
