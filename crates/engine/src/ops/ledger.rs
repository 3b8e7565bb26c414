//! Ledger entry CRUD, scoped by owning user.

use chrono::NaiveDate;
use sea_orm::{DbErr, QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{EngineError, EntryKind, ResultEngine, Transaction, transactions};

use super::Engine;

/// Filters for listing ledger entries. Absent fields mean "no constraint".
///
/// Date bounds are both inclusive (`start <= date <= end`). Results are
/// always newest-first; `limit` truncates after sorting.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub kind: Option<EntryKind>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<u64>,
}

impl Engine {
    /// Upserts a ledger entry under the owner's partition.
    ///
    /// Stamps `created_at` when the caller did not supply one and assigns a
    /// generated id when the entry lacks one. Overwriting a record owned by
    /// another user is rejected.
    pub async fn save_transaction(
        &self,
        user_id: &str,
        transaction: Transaction,
    ) -> ResultEngine<Transaction> {
        let mut transaction = transaction;
        transaction.user_id = user_id.to_string();
        if transaction.id.is_empty() {
            transaction.id = self.ids.entry_id();
        }
        transaction.validate()?;

        let created_at = transaction.created_at.unwrap_or_else(|| self.clock.now());
        transaction.created_at = Some(created_at);

        let existing = transactions::Entity::find_by_id(transaction.id.clone())
            .one(&self.database)
            .await?;
        match existing {
            Some(model) if model.user_id != user_id => {
                return Err(EngineError::NotFoundOrForbidden(format!(
                    "transaction {}",
                    transaction.id
                )));
            }
            Some(_) => {
                transaction
                    .to_active(created_at)
                    .update(&self.database)
                    .await?;
            }
            None => {
                transaction
                    .to_active(created_at)
                    .insert(&self.database)
                    .await?;
            }
        }

        self.refresh_transactions_mirror(user_id).await;
        Ok(transaction)
    }

    /// Lists a user's ledger entries, newest first.
    ///
    /// When the store is unreachable and a fallback cache is attached, the
    /// last mirrored snapshot is served instead (filtered in memory).
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::Date);
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(start) = filter.start_date {
            query = query.filter(transactions::Column::Date.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(transactions::Column::Date.lte(end));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let rows = match query.all(&self.database).await {
            Ok(rows) => rows,
            Err(err) => return self.transactions_from_fallback(user_id, filter, err),
        };

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Transaction::try_from(row)?);
        }
        Ok(out)
    }

    /// The most recent entries, newest first.
    pub async fn recent_transactions(
        &self,
        user_id: &str,
        limit: u64,
    ) -> ResultEngine<Vec<Transaction>> {
        self.list_transactions(
            user_id,
            &TransactionFilter {
                limit: Some(limit),
                ..TransactionFilter::default()
            },
        )
        .await
    }

    /// Deletes one ledger entry.
    ///
    /// Ownership is re-verified here even though the caller supplied its own
    /// user id, so stale client state cannot remove someone else's record.
    pub async fn delete_transaction(&self, user_id: &str, transaction_id: &str) -> ResultEngine<()> {
        let model = transactions::Entity::find_by_id(transaction_id.to_string())
            .one(&self.database)
            .await?;
        match model {
            Some(model) if model.user_id == user_id => {}
            _ => {
                return Err(EngineError::NotFoundOrForbidden(format!(
                    "transaction {transaction_id}"
                )));
            }
        }

        transactions::Entity::delete_by_id(transaction_id.to_string())
            .exec(&self.database)
            .await?;

        self.refresh_transactions_mirror(user_id).await;
        Ok(())
    }

    fn transactions_from_fallback(
        &self,
        user_id: &str,
        filter: &TransactionFilter,
        err: DbErr,
    ) -> ResultEngine<Vec<Transaction>> {
        let Some(cache) = &self.fallback else {
            return Err(err.into());
        };
        tracing::warn!("transaction query failed, serving fallback snapshot: {err}");
        match cache.load_transactions(user_id) {
            Ok(snapshot) => Ok(apply_filter(snapshot, filter)),
            Err(cache_err) => {
                tracing::warn!("fallback snapshot unavailable: {cache_err}");
                Err(err.into())
            }
        }
    }

    /// Opportunistic refresh of the snapshot mirror after a successful
    /// primary write. Failures here must never fail the write.
    pub(super) async fn refresh_transactions_mirror(&self, user_id: &str) {
        let Some(cache) = &self.fallback else { return };

        let rows = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::Date)
            .all(&self.database)
            .await;
        let rows = match rows {
            Ok(rows) => rows,
            Err(err) => {
                tracing::debug!("transaction mirror refresh skipped: {err}");
                return;
            }
        };

        let mut snapshot = Vec::with_capacity(rows.len());
        for row in rows {
            match Transaction::try_from(row) {
                Ok(tx) => snapshot.push(tx),
                Err(err) => {
                    tracing::debug!("transaction mirror refresh skipped: {err}");
                    return;
                }
            }
        }

        if let Err(err) = cache.store_transactions(user_id, &snapshot) {
            tracing::debug!("transaction mirror refresh skipped: {err}");
        }
    }
}

/// In-memory rendition of the list contract, used on the fallback path:
/// kind equality, inclusive date range, newest-first sort, then limit.
fn apply_filter(mut entries: Vec<Transaction>, filter: &TransactionFilter) -> Vec<Transaction> {
    if let Some(kind) = filter.kind {
        entries.retain(|entry| entry.kind == kind);
    }
    if let Some(start) = filter.start_date {
        entries.retain(|entry| entry.date >= start);
    }
    if let Some(end) = filter.end_date {
        entries.retain(|entry| entry.date <= end);
    }
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    if let Some(limit) = filter.limit {
        entries.truncate(limit as usize);
    }
    entries
}
