//! Recurring rule templates.
//!
//! A rule is never a ledger entry itself; once per calendar month it is
//! materialized into one. `last_added` is the only state guarding against
//! duplicate materialization.

use chrono::{DateTime, Datelike, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, EntryKind, MoneyCents};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringRule {
    pub id: String,
    pub user_id: String,
    pub kind: EntryKind,
    pub title: String,
    pub amount: MoneyCents,
    pub category: Option<String>,
    /// Income rules may carry a dedicated income category.
    pub income_kind: Option<String>,
    pub description: Option<String>,
    pub last_added: Option<DateTime<Utc>>,
}

impl RecurringRule {
    /// True when the rule should materialize: never added, or last added in
    /// a different calendar month. A rule due for several skipped months is
    /// still due exactly once.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_added {
            None => true,
            Some(last) => last.month() != now.month() || last.year() != now.year(),
        }
    }

    /// Category recorded on the materialized entry.
    ///
    /// Ordered fallback: income rules prefer `income_kind`, expense rules
    /// prefer `category`; both fall back to the kind label.
    #[must_use]
    pub fn materialized_category(&self) -> String {
        let preferred = match self.kind {
            EntryKind::Income => self.income_kind.as_deref(),
            EntryKind::Expense => self.category.as_deref(),
        };
        preferred.unwrap_or(self.kind.as_str()).to_string()
    }

    /// Description recorded on the materialized entry, marked as recurring.
    #[must_use]
    pub fn materialized_description(&self) -> String {
        match self.description.as_deref() {
            Some(description) if !description.is_empty() => format!("Recurring: {description}"),
            _ => "Recurring entry".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub amount_minor: i64,
    pub category: Option<String>,
    pub income_kind: Option<String>,
    pub description: Option<String>,
    pub last_added: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&RecurringRule> for ActiveModel {
    fn from(rule: &RecurringRule) -> Self {
        Self {
            id: ActiveValue::Set(rule.id.clone()),
            user_id: ActiveValue::Set(rule.user_id.clone()),
            kind: ActiveValue::Set(rule.kind.as_str().to_string()),
            title: ActiveValue::Set(rule.title.clone()),
            amount_minor: ActiveValue::Set(rule.amount.cents()),
            category: ActiveValue::Set(rule.category.clone()),
            income_kind: ActiveValue::Set(rule.income_kind.clone()),
            description: ActiveValue::Set(rule.description.clone()),
            last_added: ActiveValue::Set(rule.last_added),
        }
    }
}

impl TryFrom<Model> for RecurringRule {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            kind: EntryKind::try_from(model.kind.as_str())?,
            title: model.title,
            amount: MoneyCents::new(model.amount_minor),
            category: model.category,
            income_kind: model.income_kind,
            description: model.description,
            last_added: model.last_added,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn rule(kind: EntryKind) -> RecurringRule {
        RecurringRule {
            id: "rule-1".to_string(),
            user_id: "USR-TEST".to_string(),
            kind,
            title: "Rent".to_string(),
            amount: MoneyCents::new(50_000),
            category: None,
            income_kind: None,
            description: None,
            last_added: None,
        }
    }

    #[test]
    fn due_when_never_added_or_month_changed() {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap();
        let mut rule = rule(EntryKind::Expense);
        assert!(rule.is_due(now));

        rule.last_added = Some(Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
        assert!(!rule.is_due(now));

        rule.last_added = Some(Utc.with_ymd_and_hms(2026, 7, 31, 23, 0, 0).unwrap());
        assert!(rule.is_due(now));

        // Same month number, different year.
        rule.last_added = Some(Utc.with_ymd_and_hms(2025, 8, 7, 12, 0, 0).unwrap());
        assert!(rule.is_due(now));
    }

    #[test]
    fn category_fallback_order() {
        let mut income = rule(EntryKind::Income);
        income.income_kind = Some("salary".to_string());
        income.category = Some("misc".to_string());
        assert_eq!(income.materialized_category(), "salary");

        income.income_kind = None;
        assert_eq!(income.materialized_category(), "income");

        let mut expense = rule(EntryKind::Expense);
        expense.category = Some("housing".to_string());
        assert_eq!(expense.materialized_category(), "housing");

        expense.category = None;
        assert_eq!(expense.materialized_category(), "expense");
    }

    #[test]
    fn description_is_prefixed_or_placeholder() {
        let mut rule = rule(EntryKind::Expense);
        assert_eq!(rule.materialized_description(), "Recurring entry");

        rule.description = Some("flat 3b".to_string());
        assert_eq!(rule.materialized_description(), "Recurring: flat 3b");
    }
}
