use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::Account;

use super::{ensure_parent_dir, migrations, AccountIter, IdentityStore};

/// Identity store backed by `SQLite`, one row per account.
///
/// Rows hold the same JSON account record the document backend stores, so
/// the two backends agree on what an account looks like.
#[derive(Debug)]
pub struct SqliteStore {
    path: PathBuf,
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema
    /// initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        ensure_parent_dir(&path)?;

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count stored accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl IdentityStore for SqliteStore {
    fn get(&self, phone: &str) -> Result<Option<Account>> {
        let record: Option<String> = self
            .conn
            .query_row(
                "SELECT record FROM accounts WHERE phone = ?1",
                [phone],
                |row| row.get(0),
            )
            .optional()?;

        match record {
            Some(record) => Ok(Some(serde_json::from_str(&record)?)),
            None => Ok(None),
        }
    }

    fn put(&self, phone: &str, account: &Account) -> Result<()> {
        let record = serde_json::to_string(account)?;
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            r"
            INSERT INTO accounts (phone, record, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(phone) DO UPDATE SET record = excluded.record, updated_at = excluded.updated_at
            ",
            params![phone, record, now],
        )?;
        debug!(tags = account.tags.len(), "Stored account row");
        Ok(())
    }

    fn scan(&self) -> Result<AccountIter<'_>> {
        let mut stmt = self
            .conn
            .prepare("SELECT phone, record FROM accounts ORDER BY rowid")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let entries = rows
            .into_iter()
            .map(|(phone, record)| Ok((phone, serde_json::from_str::<Account>(&record)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(entries.into_iter()))
    }
}
