//! Users table and the digest-free account view.
//!
//! `username` is only a login handle; `user_id` is the stable key every
//! other record points at.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account record with the password digest stripped.
///
/// This is the only user shape the engine hands out; the digest never leaves
/// the store layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub login_time: DateTime<Utc>,
    pub avatar: Option<String>,
}

/// Partial profile update; `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct UserUpdate {
    pub login_time: Option<DateTime<Utc>>,
    pub avatar: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password_digest: String,
    #[sea_orm(unique)]
    pub user_id: String,
    pub created_at: DateTimeUtc,
    pub login_time: DateTimeUtc,
    pub avatar: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        Self {
            username: model.username,
            user_id: model.user_id,
            created_at: model.created_at,
            login_time: model.login_time,
            avatar: model.avatar,
        }
    }
}
