//! Split storage and the settlement/mirroring protocol.
//!
//! A settlement writes the creator's splits in one atomic unit, then mirrors
//! each share into the counterparty's own partition as an independent
//! best-effort write. The creator's records are authoritative; a missing
//! mirror never invalidates them.

use chrono::NaiveDate;
use sea_orm::{DbErr, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, EntryKind, MoneyCents, ResultEngine, Split, SplitKind, Transaction, even_split,
    splits,
};

use super::{Engine, normalize_required, with_tx};

/// Who owes whom in a settlement, from the creator's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitDirection {
    /// The creator paid; every counterparty owes them their share.
    CounterpartiesOweCreator,
    /// A counterparty paid; the creator owes every counterparty.
    CreatorOwesCounterparties,
}

/// How shares are allocated across participants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitMode {
    /// Penny-exact even allocation over counterparties plus the creator.
    Even,
    /// Caller-supplied shares; the creator's own share is explicit and the
    /// sum must match the total within one cent.
    Manual { creator_share: MoneyCents },
}

#[derive(Clone, Debug)]
pub struct Counterparty {
    pub name: String,
    pub user_id: String,
    /// Required in manual mode, ignored in even mode.
    pub share: Option<MoneyCents>,
}

#[derive(Clone, Debug)]
pub struct SplitRequest {
    pub creator_user_id: String,
    pub creator_name: String,
    pub title: String,
    pub total: MoneyCents,
    pub date: NaiveDate,
    pub description: Option<String>,
    pub direction: SplitDirection,
    pub mode: SplitMode,
    pub counterparties: Vec<Counterparty>,
    /// When set, also records the full total as an expense entry in the given
    /// category, linked to the settlement group. Only honored when the
    /// counterparties owe the creator (that is when money actually left).
    pub expense_category: Option<String>,
}

/// What a settlement produced.
#[derive(Clone, Debug)]
pub struct SplitOutcome {
    pub group_id: String,
    /// The creator's own split records, one per counterparty.
    pub splits: Vec<Split>,
    /// The linked expense entry, when requested.
    pub expense: Option<Transaction>,
    /// How many mirrors were written; the rest failed and were logged.
    pub mirrored: usize,
}

impl Engine {
    /// All splits owned by `user_id`, newest first.
    pub async fn list_splits(&self, user_id: &str) -> ResultEngine<Vec<Split>> {
        self.list_splits_by_kind(user_id, None).await
    }

    /// Splits where counterparties owe `user_id`, newest first.
    pub async fn owed_splits(&self, user_id: &str) -> ResultEngine<Vec<Split>> {
        self.list_splits_by_kind(user_id, Some(SplitKind::Owed)).await
    }

    /// Splits where `user_id` owes a counterparty, newest first.
    pub async fn owe_splits(&self, user_id: &str) -> ResultEngine<Vec<Split>> {
        self.list_splits_by_kind(user_id, Some(SplitKind::Owe)).await
    }

    async fn list_splits_by_kind(
        &self,
        user_id: &str,
        kind: Option<SplitKind>,
    ) -> ResultEngine<Vec<Split>> {
        let mut query = splits::Entity::find()
            .filter(splits::Column::UserId.eq(user_id))
            .order_by_desc(splits::Column::Date);
        if let Some(kind) = kind {
            query = query.filter(splits::Column::Kind.eq(kind.as_str()));
        }

        let rows = match query.all(&self.database).await {
            Ok(rows) => rows,
            Err(err) => return self.splits_from_fallback(user_id, kind, err),
        };

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Split::try_from(row)?);
        }
        Ok(out)
    }

    /// Replaces every split owned by `user_id` with the given list, in one
    /// atomic unit of work.
    ///
    /// Entries lacking an id get a generated one. Either the whole
    /// replacement lands or nothing changes; callers can never observe a
    /// half-replaced partition.
    pub async fn replace_splits(
        &self,
        user_id: &str,
        new_splits: Vec<Split>,
    ) -> ResultEngine<Vec<Split>> {
        let replaced = with_tx!(self, |db_tx| {
            splits::Entity::delete_many()
                .filter(splits::Column::UserId.eq(user_id))
                .exec(&db_tx)
                .await?;

            let mut stored = Vec::with_capacity(new_splits.len());
            for mut split in new_splits {
                if split.id.is_empty() {
                    split.id = self.ids.entry_id();
                }
                split.user_id = user_id.to_string();
                split.validate()?;
                splits::ActiveModel::from(&split).insert(&db_tx).await?;
                stored.push(split);
            }
            Ok(stored)
        })?;

        self.refresh_splits_mirror(user_id).await;
        Ok(replaced)
    }

    /// Settles a shared expense: writes one split per counterparty on the
    /// creator's ledger, then mirrors each into the counterparty's partition.
    ///
    /// Every counterparty id is validated up front; an unknown id fails the
    /// whole operation before anything is written. The creator's records and
    /// the optional linked expense form one atomic unit; mirrors are
    /// deliberately outside it (another user's partition cannot be part of
    /// the same transaction) and fail soft.
    pub async fn create_split(&self, request: SplitRequest) -> ResultEngine<SplitOutcome> {
        let title = normalize_required(&request.title, "split title")?;
        if !request.total.is_positive() {
            return Err(EngineError::Validation(
                "split amount must be positive".to_string(),
            ));
        }
        if request.counterparties.is_empty() {
            return Err(EngineError::Validation(
                "at least one counterparty is required".to_string(),
            ));
        }

        for counterparty in &request.counterparties {
            if !self.user_id_exists(&counterparty.user_id).await? {
                return Err(EngineError::UnknownCounterparty(
                    counterparty.user_id.clone(),
                ));
            }
        }

        let shares = self.allocate_shares(&request)?;
        let kind = match request.direction {
            SplitDirection::CounterpartiesOweCreator => SplitKind::Owed,
            SplitDirection::CreatorOwesCounterparties => SplitKind::Owe,
        };

        let group_id = self.ids.entry_id();
        let mut records = Vec::with_capacity(request.counterparties.len());
        for (counterparty, share) in request.counterparties.iter().zip(&shares) {
            records.push(Split {
                id: self.ids.entry_id(),
                group_id: group_id.clone(),
                user_id: request.creator_user_id.clone(),
                title: title.clone(),
                amount: *share,
                kind,
                counterparty_name: counterparty.name.clone(),
                counterparty_id: counterparty.user_id.clone(),
                date: request.date,
                description: request.description.clone(),
                is_mirrored: false,
            });
        }

        let expense = match (&request.expense_category, request.direction) {
            (Some(category), SplitDirection::CounterpartiesOweCreator) => Some(Transaction {
                id: self.ids.entry_id(),
                user_id: request.creator_user_id.clone(),
                kind: EntryKind::Expense,
                title: title.clone(),
                amount: request.total,
                category: category.clone(),
                date: request.date,
                description: Some(expense_description(
                    request.description.as_deref(),
                    records.len(),
                )),
                is_recurring: false,
                created_at: Some(self.clock.now()),
                split_group_id: Some(group_id.clone()),
            }),
            _ => None,
        };

        with_tx!(self, |db_tx| {
            for record in &records {
                splits::ActiveModel::from(record).insert(&db_tx).await?;
            }
            if let Some(expense) = &expense {
                let created_at = expense.created_at.unwrap_or_else(|| self.clock.now());
                expense.to_active(created_at).insert(&db_tx).await?;
            }
            Ok(())
        })?;

        let mut mirrored = 0;
        for record in &records {
            match self
                .mirror_split(record, &request.creator_user_id, &request.creator_name)
                .await
            {
                Ok(()) => mirrored += 1,
                Err(err) => {
                    tracing::warn!(
                        counterparty = %record.counterparty_id,
                        "mirror write failed, primary split kept: {err}"
                    );
                }
            }
        }

        self.refresh_splits_mirror(&request.creator_user_id).await;
        if expense.is_some() {
            self.refresh_transactions_mirror(&request.creator_user_id)
                .await;
        }

        Ok(SplitOutcome {
            group_id,
            splits: records,
            expense,
            mirrored,
        })
    }

    /// Removes one split entry, leniently.
    ///
    /// A row that is already gone is not an error (a prior partial operation
    /// may have removed it); a row owned by someone else still is.
    pub async fn delete_split(&self, user_id: &str, split_id: &str) -> ResultEngine<()> {
        match splits::Entity::find_by_id(split_id.to_string())
            .one(&self.database)
            .await?
        {
            None => {}
            Some(model) if model.user_id != user_id => {
                return Err(EngineError::NotFoundOrForbidden(format!("split {split_id}")));
            }
            Some(_) => {
                splits::Entity::delete_by_id(split_id.to_string())
                    .exec(&self.database)
                    .await?;
            }
        }

        self.refresh_splits_mirror(user_id).await;
        Ok(())
    }

    /// Total outstanding amount owed to `user_id`.
    pub async fn total_owed(&self, user_id: &str) -> ResultEngine<MoneyCents> {
        let owed = self.owed_splits(user_id).await?;
        Ok(owed
            .iter()
            .fold(MoneyCents::ZERO, |acc, split| acc + split.amount))
    }

    /// True iff an owe limit is configured and the outstanding owed total
    /// strictly exceeds it. Advisory only; nothing is ever blocked by it.
    pub async fn is_over_owe_limit(&self, user_id: &str) -> ResultEngine<bool> {
        let settings = self.user_settings(user_id).await?;
        let Some(limit) = settings.owe_limit else {
            return Ok(false);
        };
        Ok(self.total_owed(user_id).await? > limit)
    }

    fn allocate_shares(&self, request: &SplitRequest) -> ResultEngine<Vec<MoneyCents>> {
        match request.mode {
            SplitMode::Manual { creator_share } => {
                let mut provided = Vec::with_capacity(request.counterparties.len());
                for counterparty in &request.counterparties {
                    let share = counterparty.share.ok_or_else(|| {
                        EngineError::Validation(format!(
                            "missing share amount for {}",
                            counterparty.user_id
                        ))
                    })?;
                    if share.is_negative() {
                        return Err(EngineError::Validation(
                            "share amounts must not be negative".to_string(),
                        ));
                    }
                    provided.push(share);
                }

                let sum = provided
                    .iter()
                    .fold(creator_share, |acc, share| acc + *share);
                // One cent of slack absorbs rounding in caller-side input,
                // nothing more.
                if (sum - request.total).cents().abs() > 1 {
                    return Err(EngineError::AmountMismatch(format!(
                        "shares add up to {sum}, expected {}",
                        request.total
                    )));
                }
                Ok(provided)
            }
            SplitMode::Even => {
                // The creator keeps the final allotted share; it is never
                // persisted as a split.
                let mut shares =
                    even_split(request.total, request.counterparties.len() + 1);
                shares.truncate(request.counterparties.len());
                Ok(shares)
            }
        }
    }

    async fn mirror_split(
        &self,
        primary: &Split,
        creator_user_id: &str,
        creator_name: &str,
    ) -> ResultEngine<()> {
        let mirror = Split {
            id: self.ids.entry_id(),
            group_id: primary.group_id.clone(),
            user_id: primary.counterparty_id.clone(),
            title: primary.title.clone(),
            amount: primary.amount,
            kind: primary.kind.inverted(),
            counterparty_name: creator_name.to_string(),
            counterparty_id: creator_user_id.to_string(),
            date: primary.date,
            description: primary.description.clone(),
            is_mirrored: true,
        };
        splits::ActiveModel::from(&mirror)
            .insert(&self.database)
            .await?;
        Ok(())
    }

    fn splits_from_fallback(
        &self,
        user_id: &str,
        kind: Option<SplitKind>,
        err: DbErr,
    ) -> ResultEngine<Vec<Split>> {
        let Some(cache) = &self.fallback else {
            return Err(err.into());
        };
        tracing::warn!("split query failed, serving fallback snapshot: {err}");
        match cache.load_splits(user_id) {
            Ok(mut snapshot) => {
                if let Some(kind) = kind {
                    snapshot.retain(|split| split.kind == kind);
                }
                snapshot.sort_by(|a, b| b.date.cmp(&a.date));
                Ok(snapshot)
            }
            Err(cache_err) => {
                tracing::warn!("fallback snapshot unavailable: {cache_err}");
                Err(err.into())
            }
        }
    }

    /// Opportunistic refresh of the snapshot mirror after a successful
    /// primary write. Failures here must never fail the write.
    pub(super) async fn refresh_splits_mirror(&self, user_id: &str) {
        let Some(cache) = &self.fallback else { return };

        let rows = splits::Entity::find()
            .filter(splits::Column::UserId.eq(user_id))
            .order_by_desc(splits::Column::Date)
            .all(&self.database)
            .await;
        let rows = match rows {
            Ok(rows) => rows,
            Err(err) => {
                tracing::debug!("split mirror refresh skipped: {err}");
                return;
            }
        };

        let mut snapshot = Vec::with_capacity(rows.len());
        for row in rows {
            match Split::try_from(row) {
                Ok(split) => snapshot.push(split),
                Err(err) => {
                    tracing::debug!("split mirror refresh skipped: {err}");
                    return;
                }
            }
        }

        if let Err(err) = cache.store_splits(user_id, &snapshot) {
            tracing::debug!("split mirror refresh skipped: {err}");
        }
    }
}

fn expense_description(description: Option<&str>, participants: usize) -> String {
    let noun = if participants == 1 { "person" } else { "people" };
    match description {
        Some(description) if !description.is_empty() => {
            format!("{description} (Split with {participants} {noun})")
        }
        _ => format!("Split with {participants} {noun}"),
    }
}
