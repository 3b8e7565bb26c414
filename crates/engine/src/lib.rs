//! Splitbook engine: a single-store personal finance ledger.
//!
//! The engine owns four keyed collections (users, transactions, recurring
//! rules, splits) plus per-user settings, all partitioned by the owning
//! user's id. On top of the store it implements account identity, ledger
//! CRUD with ownership checks, monthly recurring-rule materialization, and
//! the split-settlement protocol that mirrors each debt into the
//! counterparty's own partition.

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::EngineError;
pub use fallback::FallbackCache;
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use money::{MoneyCents, even_split};
pub use ops::{
    Counterparty, Engine, EngineBuilder, ImportOutcome, LegacyLedger, LegacyTransaction,
    SplitDirection, SplitMode, SplitOutcome, SplitRequest, TransactionFilter,
};
pub use recurring::RecurringRule;
pub use settings::UserSettings;
pub use splits::{Split, SplitKind};
pub use transactions::{EntryKind, Transaction};
pub use users::{User, UserUpdate};

mod clock;
mod error;
mod fallback;
mod ids;
mod money;
mod ops;
mod recurring;
mod settings;
mod splits;
mod transactions;
mod users;

type ResultEngine<T> = Result<T, EngineError>;
