use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Result;
use crate::model::Account;

use super::{ensure_parent_dir, AccountIter, IdentityStore};

/// Identity store kept as one JSON object mapping phone to account.
///
/// Each call reads the whole document; each `put` rewrites it. Key order in
/// the document is the order accounts were first written.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Use the document at `path`, creating parent directories as needed.
    ///
    /// The file itself is created on the first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        ensure_parent_dir(&path)?;
        debug!("Using account document at {}", path.display());
        Ok(Self { path })
    }

    /// Path to the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Map<String, Value>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(err.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_document(&self, document: &Map<String, Value>) -> Result<()> {
        std::fs::write(&self.path, serde_json::to_vec(document)?)?;
        Ok(())
    }
}

impl IdentityStore for JsonFileStore {
    fn get(&self, phone: &str) -> Result<Option<Account>> {
        let mut document = self.read_document()?;
        match document.remove(phone) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn put(&self, phone: &str, account: &Account) -> Result<()> {
        let mut document = self.read_document()?;
        document.insert(phone.to_string(), serde_json::to_value(account)?);
        self.write_document(&document)?;
        debug!(accounts = document.len(), "Wrote account document");
        Ok(())
    }

    fn scan(&self) -> Result<AccountIter<'_>> {
        let entries = self
            .read_document()?
            .into_iter()
            .map(|(phone, value)| Ok((phone, serde_json::from_value::<Account>(value)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(entries.into_iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(name: &str) -> Account {
        Account::new("abc123", name, "Doe", "Greenside High School")
    }

    fn temp_store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("accounts.json")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.get("0821234567").unwrap().is_none());
        assert_eq!(store.scan().unwrap().count(), 0);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_put_and_get() {
        let (_dir, store) = temp_store();
        store.put("0821234567", &account("Jane")).unwrap();
        assert_eq!(store.get("0821234567").unwrap(), Some(account("Jane")));
    }

    #[test]
    fn test_scan_keeps_insertion_order() {
        let (_dir, store) = temp_store();
        store.put("0829999999", &account("Zed")).unwrap();
        store.put("0821111111", &account("Amy")).unwrap();
        store.put("0829999999", &account("Zoe")).unwrap();

        let phones: Vec<String> = store.scan().unwrap().map(|(phone, _)| phone).collect();
        assert_eq!(phones, vec!["0829999999", "0821111111"]);
    }

    #[test]
    fn test_reads_legacy_document() {
        let (_dir, store) = temp_store();
        std::fs::write(
            store.path(),
            r#"{"0821234567":{"password":"abc123","name":"Jane","surname":"Doe"}}"#,
        )
        .unwrap();

        let account = store.get("0821234567").unwrap().unwrap();
        assert!(account.school.is_none());
        assert!(account.tags.is_empty());
    }

    #[test]
    fn test_document_layout() {
        let (_dir, store) = temp_store();
        store.put("0821234567", &account("Jane")).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["0821234567"]["password"], "abc123");
        assert_eq!(value["0821234567"]["school"], "Greenside High School");
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(
            store.get("0821234567"),
            Err(crate::error::Error::Json(_))
        ));
    }

    #[test]
    fn test_blank_document_is_empty() {
        let (_dir, store) = temp_store();
        std::fs::write(store.path(), "  \n").unwrap();
        assert_eq!(store.scan().unwrap().count(), 0);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested/deeper/accounts.json");
        let store = JsonFileStore::open(&nested).unwrap();
        store.put("0821234567", &account("Jane")).unwrap();
        assert!(nested.exists());
    }
}
