// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the panelctl project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! User Device Service: account management plus the login/verify pair the
//! (out-of-scope) authentication middleware relies on.

use std::sync::Arc;

use log::info;

use crate::credential;
use crate::error::{PanelError, Result};
use crate::persistence::models::Role;
use crate::persistence::Persistence;
use crate::validate::{validate_name, validate_password};

pub struct UserService {
    persistence: Arc<Persistence>,
    jwt_secret: String,
}

impl UserService {
    pub fn new(persistence: Arc<Persistence>, jwt_secret: String) -> Self {
        Self { persistence, jwt_secret }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(String, Role)> {
        credential::login(&self.persistence, username, password, &self.jwt_secret).await
    }

    pub async fn verify(&self, token: &str) -> bool {
        credential::verify(&self.persistence, token, &self.jwt_secret).await
    }

    pub async fn create(&self, username: &str, password: &str, role: Role) -> Result<i64> {
        let username = validate_name(username)?;
        let password = validate_password(&password)?;
        reject_none_role(role)?;

        let (hash, salt) = credential::hash_password(&password);
        let id = self.persistence.insert_user(&username, &hash, &salt, role).await?;
        info!("created user '{id}' with username {username}");
        Ok(id)
    }

    pub async fn update_role(&self, id: i64, role: Role) -> Result<()> {
        reject_none_role(role)?;
        self.persistence.update_user_role(id, role).await?;
        info!("updated role of user '{id}'");
        Ok(())
    }

    /// Re-derives the hash under the existing salt, if any. A legacy no-salt
    /// row is migrated to a freshly salted hash on this first password change.
    pub async fn update_password(&self, id: i64, password: &str) -> Result<()> {
        let password = validate_password(password)?;
        let user = self.persistence.get_user(id).await?;
        let (hash, salt) = match &user.salt {
            Some(salt) => (credential::derive(&password, salt), None),
            None => {
                let (hash, salt) = credential::hash_password(&password);
                (hash, Some(salt))
            }
        };
        self.persistence.update_user_password(id, &hash, salt.as_deref()).await?;
        info!("updated password of user '{id}'");
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.persistence.delete_user(id).await?;
        info!("deleted user '{id}'");
        Ok(())
    }
}

fn reject_none_role(role: Role) -> Result<()> {
    if role == Role::None {
        return Err(PanelError::InvalidInput { reason: "role must not be None".to_string() });
    }
    Ok(())
}
