use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{Clock, EngineError, FallbackCache, IdGenerator, RandomIds, ResultEngine, SystemClock};

mod identity;
mod import;
mod ledger;
mod recurrence;
mod settings;
mod splits;

pub use import::{ImportOutcome, LegacyLedger, LegacyTransaction};
pub use ledger::TransactionFilter;
pub use splits::{Counterparty, SplitDirection, SplitMode, SplitOutcome, SplitRequest};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The ledger engine.
///
/// Every operation takes the acting user's id explicitly; there is no
/// ambient session state. The clock and id generator are injected so
/// due-checks and generated identifiers stay deterministic under test.
pub struct Engine {
    database: DatabaseConnection,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    fallback: Option<FallbackCache>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    fallback: Option<FallbackCache>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIds),
            fallback: None,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the time source (tests pin it with [`crate::FixedClock`]).
    pub fn clock(mut self, clock: impl Clock + 'static) -> EngineBuilder {
        self.clock = Arc::new(clock);
        self
    }

    /// Override the id source.
    pub fn ids(mut self, ids: impl IdGenerator + 'static) -> EngineBuilder {
        self.ids = Arc::new(ids);
        self
    }

    /// Attach the best-effort snapshot mirror.
    pub fn fallback(mut self, cache: FallbackCache) -> EngineBuilder {
        self.fallback = Some(cache);
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            database: self.database,
            clock: self.clock,
            ids: self.ids,
            fallback: self.fallback,
        }
    }
}

fn normalize_required(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}
