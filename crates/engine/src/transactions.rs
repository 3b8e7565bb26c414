//! Ledger entry primitives.
//!
//! A `Transaction` is a single income or expense event on one user's ledger.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::Validation(format!(
                "invalid entry kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub kind: EntryKind,
    pub title: String,
    pub amount: MoneyCents,
    pub category: String,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub is_recurring: bool,
    /// Stamped by the store on first save when absent.
    pub created_at: Option<DateTime<Utc>>,
    /// Links an expense recorded alongside a settlement to its split group.
    pub split_group_id: Option<String>,
}

impl Transaction {
    pub(crate) fn validate(&self) -> ResultEngine<()> {
        if self.title.trim().is_empty() {
            return Err(EngineError::Validation(
                "transaction title must not be empty".to_string(),
            ));
        }
        if self.amount.is_negative() {
            return Err(EngineError::Validation(
                "transaction amount must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn to_active(&self, created_at: DateTime<Utc>) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(self.id.clone()),
            user_id: ActiveValue::Set(self.user_id.clone()),
            kind: ActiveValue::Set(self.kind.as_str().to_string()),
            title: ActiveValue::Set(self.title.clone()),
            amount_minor: ActiveValue::Set(self.amount.cents()),
            category: ActiveValue::Set(self.category.clone()),
            date: ActiveValue::Set(self.date),
            description: ActiveValue::Set(self.description.clone()),
            is_recurring: ActiveValue::Set(self.is_recurring),
            created_at: ActiveValue::Set(created_at),
            split_group_id: ActiveValue::Set(self.split_group_id.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub amount_minor: i64,
    pub category: String,
    pub date: Date,
    pub description: Option<String>,
    pub is_recurring: bool,
    pub created_at: DateTimeUtc,
    pub split_group_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            kind: EntryKind::try_from(model.kind.as_str())?,
            title: model.title,
            amount: MoneyCents::new(model.amount_minor),
            category: model.category,
            date: model.date,
            description: model.description,
            is_recurring: model.is_recurring,
            created_at: Some(model.created_at),
            split_group_id: model.split_group_id,
        })
    }
}
