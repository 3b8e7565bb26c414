//! Account registration, login and lookup.
//!
//! Passwords are stored as a single fast SHA-256 digest; the store is local
//! to one machine and the digest is never exposed past this module.

use std::fmt::Write as _;

use sea_orm::{ActiveValue, DbErr, QueryFilter, SqlErr, prelude::*};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::{EngineError, ResultEngine, User, UserUpdate, users};

use super::Engine;

fn password_digest(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

fn normalize_username(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(
            "username must not be empty".to_string(),
        ));
    }
    Ok(trimmed.nfc().collect())
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl Engine {
    /// Creates an account and returns it without the password digest.
    ///
    /// The generated `user_id` is the handle other users reference when
    /// settling splits.
    pub async fn register(&self, username: &str, password: &str) -> ResultEngine<User> {
        let username = normalize_username(username)?;
        if password.trim().is_empty() {
            return Err(EngineError::Validation(
                "password must not be empty".to_string(),
            ));
        }

        let now = self.clock.now();
        let model = users::Model {
            username: username.clone(),
            password_digest: password_digest(password),
            user_id: self.ids.user_token(now),
            created_at: now,
            login_time: now,
            avatar: None,
        };

        let active: users::ActiveModel = model.into();
        let inserted = active.insert(&self.database).await.map_err(|err| {
            if is_unique_violation(&err) {
                EngineError::UsernameTaken(username.clone())
            } else {
                EngineError::from(err)
            }
        })?;

        Ok(User::from(inserted))
    }

    /// Verifies the credentials, refreshes `login_time` and returns the
    /// digest-free account.
    pub async fn login(&self, username: &str, password: &str) -> ResultEngine<User> {
        let username = normalize_username(username)?;
        let model = users::Entity::find_by_id(username.clone())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::UserNotFound(username.clone()))?;

        // Exact match on the full digest, never a prefix check.
        if password_digest(password) != model.password_digest {
            return Err(EngineError::InvalidPassword);
        }

        let mut active: users::ActiveModel = model.into();
        active.login_time = ActiveValue::Set(self.clock.now());
        let updated = active.update(&self.database).await?;

        Ok(User::from(updated))
    }

    /// Digest-free lookup by login handle.
    pub async fn user_by_username(&self, username: &str) -> ResultEngine<Option<User>> {
        let username = normalize_username(username)?;
        let model = users::Entity::find_by_id(username)
            .one(&self.database)
            .await?;
        Ok(model.map(User::from))
    }

    /// Merges the given profile fields into an existing account.
    pub async fn update_user(&self, username: &str, update: UserUpdate) -> ResultEngine<User> {
        let username = normalize_username(username)?;
        let model = users::Entity::find_by_id(username.clone())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::UserNotFound(username))?;

        if update.login_time.is_none() && update.avatar.is_none() {
            return Ok(User::from(model));
        }

        let mut active: users::ActiveModel = model.into();
        if let Some(login_time) = update.login_time {
            active.login_time = ActiveValue::Set(login_time);
        }
        if let Some(avatar) = update.avatar {
            active.avatar = ActiveValue::Set(Some(avatar));
        }
        let updated = active.update(&self.database).await?;

        Ok(User::from(updated))
    }

    /// Existence check on the `user_id` index; used to validate split
    /// counterparties before anything is persisted.
    pub async fn user_id_exists(&self, user_id: &str) -> ResultEngine<bool> {
        let found = users::Entity::find()
            .filter(users::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?;
        Ok(found.is_some())
    }
}
