//! Per-user settings record.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::MoneyCents;

/// Reserved pseudo-user id whose settings row only carries the one-shot
/// legacy import flag. Never a real account.
pub(crate) const IMPORT_FLAG_USER_ID: &str = "migration";

/// One settings record per user; all fields optional until first saved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    /// Advisory ceiling on the total owed to this user; never blocks writes.
    pub owe_limit: Option<MoneyCents>,
    pub currency: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserSettings {
    /// The defaults served when no record has been saved yet.
    #[must_use]
    pub fn defaults(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            owe_limit: None,
            currency: None,
            updated_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub owe_limit_minor: Option<i64>,
    pub currency: Option<String>,
    pub migrated: bool,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for UserSettings {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            owe_limit: model.owe_limit_minor.map(MoneyCents::new),
            currency: model.currency,
            updated_at: model.updated_at,
        }
    }
}
