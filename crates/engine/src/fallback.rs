//! Best-effort secondary mirror of per-user ledger state.
//!
//! The cache is a flat JSON snapshot the engine refreshes after successful
//! primary writes and reads only when the primary store fails, so callers are
//! not left empty-handed during an outage. It is never a source of truth and
//! is never merged back; stale or missing snapshots are normal.

use std::{
    collections::HashMap,
    fs, io,
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use crate::{Split, Transaction};

#[derive(Clone, Debug)]
pub struct FallbackCache {
    path: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    users: HashMap<String, UserSnapshot>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserSnapshot {
    #[serde(default)]
    transactions: Vec<Transaction>,
    #[serde(default)]
    splits: Vec<Split>,
}

impl FallbackCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn store_transactions(
        &self,
        user_id: &str,
        transactions: &[Transaction],
    ) -> io::Result<()> {
        let mut file = self.read()?;
        file.users
            .entry(user_id.to_string())
            .or_default()
            .transactions = transactions.to_vec();
        self.write(&file)
    }

    pub fn load_transactions(&self, user_id: &str) -> io::Result<Vec<Transaction>> {
        Ok(self
            .read()?
            .users
            .get(user_id)
            .map(|snapshot| snapshot.transactions.clone())
            .unwrap_or_default())
    }

    pub fn store_splits(&self, user_id: &str, splits: &[Split]) -> io::Result<()> {
        let mut file = self.read()?;
        file.users.entry(user_id.to_string()).or_default().splits = splits.to_vec();
        self.write(&file)
    }

    pub fn load_splits(&self, user_id: &str) -> io::Result<Vec<Split>> {
        Ok(self
            .read()?
            .users
            .get(user_id)
            .map(|snapshot| snapshot.splits.clone())
            .unwrap_or_default())
    }

    fn read(&self) -> io::Result<SnapshotFile> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(io::Error::other),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(SnapshotFile::default()),
            Err(err) => Err(err),
        }
    }

    fn write(&self, file: &SnapshotFile) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(file).map_err(io::Error::other)?;
        fs::write(&self.path, bytes)
    }
}
