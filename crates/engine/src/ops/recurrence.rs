//! Recurring rule storage and the monthly materialization pass.

use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, prelude::*};

use crate::{
    EngineError, EntryKind, RecurringRule, ResultEngine, Transaction, recurring, users,
};

use super::Engine;

impl Engine {
    /// Upserts a recurring rule under the owner's partition.
    pub async fn save_recurring_rule(
        &self,
        user_id: &str,
        rule: RecurringRule,
    ) -> ResultEngine<RecurringRule> {
        let mut rule = rule;
        rule.user_id = user_id.to_string();
        if rule.id.is_empty() {
            rule.id = self.ids.entry_id();
        }
        if rule.amount.is_negative() {
            return Err(EngineError::Validation(
                "rule amount must not be negative".to_string(),
            ));
        }

        let existing = recurring::Entity::find_by_id(rule.id.clone())
            .one(&self.database)
            .await?;
        match existing {
            Some(model) if model.user_id != user_id => {
                return Err(EngineError::NotFoundOrForbidden(format!("rule {}", rule.id)));
            }
            Some(_) => {
                recurring::ActiveModel::from(&rule).update(&self.database).await?;
            }
            None => {
                recurring::ActiveModel::from(&rule).insert(&self.database).await?;
            }
        }
        Ok(rule)
    }

    /// Lists a user's recurring rules, optionally restricted to one kind.
    pub async fn list_recurring_rules(
        &self,
        user_id: &str,
        kind: Option<EntryKind>,
    ) -> ResultEngine<Vec<RecurringRule>> {
        let mut query = recurring::Entity::find().filter(recurring::Column::UserId.eq(user_id));
        if let Some(kind) = kind {
            query = query.filter(recurring::Column::Kind.eq(kind.as_str()));
        }
        let rows = query.all(&self.database).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(RecurringRule::try_from(row)?);
        }
        Ok(out)
    }

    /// Materializes every due recurring rule into a concrete ledger entry.
    ///
    /// Runs income rules first, then expense rules, matching the order the
    /// original dashboards expect. Each due rule produces exactly one entry
    /// dated today and then records `last_added`, which makes the pass
    /// idempotent per calendar month; skipped months are not backfilled. A
    /// failure on one rule is logged and does not abort the rest.
    ///
    /// Returns the number of entries created, so callers refresh their
    /// dashboards only when something actually changed.
    pub async fn materialize_recurring(&self, user_id: &str) -> ResultEngine<usize> {
        let now = self.clock.now();
        let mut created = 0;

        for kind in [EntryKind::Income, EntryKind::Expense] {
            let rules = self.list_recurring_rules(user_id, Some(kind)).await?;
            for rule in rules {
                if !rule.is_due(now) {
                    continue;
                }
                match self.materialize_rule(user_id, &rule, now).await {
                    Ok(()) => created += 1,
                    Err(err) => {
                        tracing::warn!(rule_id = %rule.id, "recurring materialization failed: {err}");
                    }
                }
            }
        }

        Ok(created)
    }

    /// Runs the materialization pass for every registered user. Intended for
    /// the bootstrap's session-start job.
    pub async fn materialize_all_recurring(&self) -> ResultEngine<usize> {
        let accounts = users::Entity::find().all(&self.database).await?;
        let mut created = 0;
        for account in accounts {
            created += self.materialize_recurring(&account.user_id).await?;
        }
        Ok(created)
    }

    async fn materialize_rule(
        &self,
        user_id: &str,
        rule: &RecurringRule,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let entry = Transaction {
            id: self.ids.entry_id(),
            user_id: user_id.to_string(),
            kind: rule.kind,
            title: rule.title.clone(),
            amount: rule.amount,
            category: rule.materialized_category(),
            date: now.date_naive(),
            description: Some(rule.materialized_description()),
            is_recurring: true,
            created_at: Some(now),
            split_group_id: None,
        };
        self.save_transaction(user_id, entry).await?;

        let mut updated = rule.clone();
        updated.last_added = Some(now);
        self.save_recurring_rule(user_id, updated).await?;
        Ok(())
    }
}
