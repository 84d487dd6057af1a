//! Identity store for tagmykid.
//!
//! Accounts are keyed by phone number. Every backend follows the same
//! whole-record contract: callers read an account, change it, and put the
//! whole account back. There are no partial updates and no locking, so two
//! processes writing the same store can lose each other's changes.
//!
//! Iteration order is insertion order in every backend; tag resolution
//! relies on it to pick the first match deterministically.

mod json;
mod memory;
pub mod migrations;
pub mod schema;
mod sqlite;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::Account;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A `(phone, account)` pair yielded by [`IdentityStore::scan`].
pub type AccountEntry = (String, Account);

/// Iterator over every stored account.
pub type AccountIter<'a> = Box<dyn Iterator<Item = AccountEntry> + 'a>;

/// Storage capability for accounts.
pub trait IdentityStore {
    /// Look up an account by phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, phone: &str) -> Result<Option<Account>>;

    /// Insert or replace the account stored under `phone`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn put(&self, phone: &str, account: &Account) -> Result<()>;

    /// Iterate over every account in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn scan(&self) -> Result<AccountIter<'_>>;
}

impl<S: IdentityStore + ?Sized> IdentityStore for &S {
    fn get(&self, phone: &str) -> Result<Option<Account>> {
        (**self).get(phone)
    }

    fn put(&self, phone: &str, account: &Account) -> Result<()> {
        (**self).put(phone, account)
    }

    fn scan(&self) -> Result<AccountIter<'_>> {
        (**self).scan()
    }
}

impl<S: IdentityStore + ?Sized> IdentityStore for Box<S> {
    fn get(&self, phone: &str) -> Result<Option<Account>> {
        (**self).get(phone)
    }

    fn put(&self, phone: &str, account: &Account) -> Result<()> {
        (**self).put(phone, account)
    }

    fn scan(&self) -> Result<AccountIter<'_>> {
        (**self).scan()
    }
}

/// Which identity store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// A single JSON document mapping phone to account.
    #[default]
    Json,
    /// A `SQLite` database with one row per account.
    Sqlite,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Open the identity store for `backend` at `path`.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or initialized.
pub fn open(backend: StorageBackend, path: &Path) -> Result<Box<dyn IdentityStore>> {
    Ok(match backend {
        StorageBackend::Json => Box::new(JsonFileStore::open(path)?),
        StorageBackend::Sqlite => Box::new(SqliteStore::open(path)?),
    })
}

/// Create `path`'s parent directory if it does not exist yet.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| {
                crate::error::Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                }
            })?;
        }
    }
    Ok(())
}
