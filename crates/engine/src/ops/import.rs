//! One-shot import of the prior flat-file ledger format.
//!
//! The old storage kept a single unpartitioned blob of transactions. On
//! first run the entries lacking a user id are stamped with the current
//! user's and inserted through the regular ledger path; a flag on a reserved
//! settings row keeps the import from ever running twice.

use chrono::NaiveDate;
use sea_orm::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    EntryKind, MoneyCents, ResultEngine, Transaction,
    settings::{self, IMPORT_FLAG_USER_ID},
};

use super::Engine;

/// Deserialized prior-format blob.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LegacyLedger {
    #[serde(default)]
    pub transactions: Vec<LegacyTransaction>,
}

/// One entry of the old format. Ids were ad-hoc (often numbers), amounts
/// were decimal floats, and `userId` only exists on entries written after
/// partitioning was introduced.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTransaction {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Entries inserted into the ledger by this run.
    pub imported: usize,
    /// True when a previous run already completed and nothing was done.
    pub already_migrated: bool,
}

impl Engine {
    /// Imports the legacy blob into `user_id`'s partition, once.
    ///
    /// Entries that already carry a user id were written post-partitioning
    /// and are skipped; malformed entries are logged and skipped rather than
    /// aborting the rest.
    pub async fn import_legacy(
        &self,
        user_id: &str,
        legacy: &LegacyLedger,
    ) -> ResultEngine<ImportOutcome> {
        if self.import_flag().await? {
            return Ok(ImportOutcome {
                imported: 0,
                already_migrated: true,
            });
        }

        let mut imported = 0;
        for entry in &legacy.transactions {
            if entry.user_id.is_some() {
                continue;
            }
            let kind = match EntryKind::try_from(entry.kind.as_str()) {
                Ok(kind) => kind,
                Err(err) => {
                    tracing::warn!(title = %entry.title, "legacy entry skipped: {err}");
                    continue;
                }
            };

            let id = match &entry.id {
                Some(serde_json::Value::String(id)) => id.clone(),
                Some(other) => other.to_string(),
                None => self.ids.entry_id(),
            };
            let transaction = Transaction {
                id,
                user_id: user_id.to_string(),
                kind,
                title: entry.title.clone(),
                amount: MoneyCents::from_major_units(entry.amount),
                category: entry.category.clone().unwrap_or_default(),
                date: entry.date,
                description: entry.description.clone(),
                is_recurring: entry.is_recurring,
                created_at: None,
                split_group_id: None,
            };
            self.save_transaction(user_id, transaction).await?;
            imported += 1;
        }

        self.set_import_flag().await?;
        Ok(ImportOutcome {
            imported,
            already_migrated: false,
        })
    }

    async fn import_flag(&self) -> ResultEngine<bool> {
        let row = settings::Entity::find_by_id(IMPORT_FLAG_USER_ID.to_string())
            .one(&self.database)
            .await?;
        Ok(row.is_some_and(|row| row.migrated))
    }

    async fn set_import_flag(&self) -> ResultEngine<()> {
        let now = self.clock.now();
        let existing = settings::Entity::find_by_id(IMPORT_FLAG_USER_ID.to_string())
            .one(&self.database)
            .await?;
        match existing {
            Some(model) => {
                let mut active: settings::ActiveModel = model.into();
                active.migrated = ActiveValue::Set(true);
                active.updated_at = ActiveValue::Set(Some(now));
                active.update(&self.database).await?;
            }
            None => {
                let active = settings::ActiveModel {
                    user_id: ActiveValue::Set(IMPORT_FLAG_USER_ID.to_string()),
                    owe_limit_minor: ActiveValue::Set(None),
                    currency: ActiveValue::Set(None),
                    migrated: ActiveValue::Set(true),
                    updated_at: ActiveValue::Set(Some(now)),
                };
                active.insert(&self.database).await?;
            }
        }
        Ok(())
    }
}
