//! Split primitives.
//!
//! A `Split` is one participant's share of a shared expense, recorded on one
//! user's ledger. Each settlement action produces a batch of splits linked by
//! `group_id`; known counterparties additionally receive a mirrored record in
//! their own partition with the direction inverted.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, MoneyCents, ResultEngine};

/// Direction of a split relative to the record's owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitKind {
    /// The counterparty owes the record's owner.
    Owed,
    /// The record's owner owes the counterparty.
    Owe,
}

impl SplitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owed => "owed",
            Self::Owe => "owe",
        }
    }

    /// The opposite direction, as seen from the counterparty's ledger.
    #[must_use]
    pub fn inverted(self) -> Self {
        match self {
            Self::Owed => Self::Owe,
            Self::Owe => Self::Owed,
        }
    }
}

impl TryFrom<&str> for SplitKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "owed" => Ok(Self::Owed),
            "owe" => Ok(Self::Owe),
            other => Err(EngineError::Validation(format!(
                "invalid split kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub id: String,
    /// Shared by every record created from one settlement action.
    pub group_id: String,
    pub user_id: String,
    pub title: String,
    pub amount: MoneyCents,
    pub kind: SplitKind,
    pub counterparty_name: String,
    pub counterparty_id: String,
    pub date: NaiveDate,
    pub description: Option<String>,
    /// True on the counterparty-side copy written by the mirroring protocol.
    pub is_mirrored: bool,
}

impl Split {
    pub(crate) fn validate(&self) -> ResultEngine<()> {
        if self.amount.is_negative() {
            return Err(EngineError::Validation(
                "split amount must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "splits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub title: String,
    pub amount_minor: i64,
    pub kind: String,
    pub counterparty_name: String,
    pub counterparty_id: String,
    pub date: Date,
    pub description: Option<String>,
    pub is_mirrored: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Split> for ActiveModel {
    fn from(split: &Split) -> Self {
        Self {
            id: ActiveValue::Set(split.id.clone()),
            group_id: ActiveValue::Set(split.group_id.clone()),
            user_id: ActiveValue::Set(split.user_id.clone()),
            title: ActiveValue::Set(split.title.clone()),
            amount_minor: ActiveValue::Set(split.amount.cents()),
            kind: ActiveValue::Set(split.kind.as_str().to_string()),
            counterparty_name: ActiveValue::Set(split.counterparty_name.clone()),
            counterparty_id: ActiveValue::Set(split.counterparty_id.clone()),
            date: ActiveValue::Set(split.date),
            description: ActiveValue::Set(split.description.clone()),
            is_mirrored: ActiveValue::Set(split.is_mirrored),
        }
    }
}

impl TryFrom<Model> for Split {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            group_id: model.group_id,
            user_id: model.user_id,
            title: model.title,
            amount: MoneyCents::new(model.amount_minor),
            kind: SplitKind::try_from(model.kind.as_str())?,
            counterparty_name: model.counterparty_name,
            counterparty_id: model.counterparty_id,
            date: model.date,
            description: model.description,
            is_mirrored: model.is_mirrored,
        })
    }
}
