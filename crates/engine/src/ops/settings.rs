//! Per-user settings storage.

use sea_orm::{ActiveValue, prelude::*};

use crate::{EngineError, MoneyCents, ResultEngine, UserSettings, settings};

use super::Engine;

impl Engine {
    /// The user's settings, or the defaults when nothing was saved yet.
    pub async fn user_settings(&self, user_id: &str) -> ResultEngine<UserSettings> {
        let model = settings::Entity::find_by_id(user_id.to_string())
            .one(&self.database)
            .await?;
        Ok(model
            .map(UserSettings::from)
            .unwrap_or_else(|| UserSettings::defaults(user_id)))
    }

    /// Overwrites the user's settings record, stamping `updated_at`.
    pub async fn save_settings(
        &self,
        user_id: &str,
        owe_limit: Option<MoneyCents>,
        currency: Option<String>,
    ) -> ResultEngine<UserSettings> {
        if let Some(limit) = owe_limit
            && limit.is_negative()
        {
            return Err(EngineError::Validation(
                "owe limit must not be negative".to_string(),
            ));
        }

        let now = self.clock.now();
        let existing = settings::Entity::find_by_id(user_id.to_string())
            .one(&self.database)
            .await?;
        let model = match existing {
            Some(model) => {
                let mut active: settings::ActiveModel = model.into();
                active.owe_limit_minor = ActiveValue::Set(owe_limit.map(MoneyCents::cents));
                active.currency = ActiveValue::Set(currency);
                active.updated_at = ActiveValue::Set(Some(now));
                active.update(&self.database).await?
            }
            None => {
                let active = settings::ActiveModel {
                    user_id: ActiveValue::Set(user_id.to_string()),
                    owe_limit_minor: ActiveValue::Set(owe_limit.map(MoneyCents::cents)),
                    currency: ActiveValue::Set(currency),
                    migrated: ActiveValue::Set(false),
                    updated_at: ActiveValue::Set(Some(now)),
                };
                active.insert(&self.database).await?
            }
        };

        Ok(UserSettings::from(model))
    }

    /// Sets or clears the advisory owe limit, keeping the other settings.
    pub async fn set_owe_limit(
        &self,
        user_id: &str,
        owe_limit: Option<MoneyCents>,
    ) -> ResultEngine<UserSettings> {
        let current = self.user_settings(user_id).await?;
        self.save_settings(user_id, owe_limit, current.currency).await
    }
}
