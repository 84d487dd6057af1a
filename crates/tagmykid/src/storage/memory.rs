use std::cell::RefCell;

use crate::error::Result;
use crate::model::Account;

use super::{AccountEntry, AccountIter, IdentityStore};

/// In-memory identity store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RefCell<Vec<AccountEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.borrow().len()
    }

    /// Whether the store holds no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.borrow().is_empty()
    }
}

impl IdentityStore for MemoryStore {
    fn get(&self, phone: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .borrow()
            .iter()
            .find(|(key, _)| key == phone)
            .map(|(_, account)| account.clone()))
    }

    fn put(&self, phone: &str, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.borrow_mut();
        match accounts.iter_mut().find(|(key, _)| key == phone) {
            Some((_, existing)) => *existing = account.clone(),
            None => accounts.push((phone.to_string(), account.clone())),
        }
        Ok(())
    }

    fn scan(&self) -> Result<AccountIter<'_>> {
        let snapshot = self.accounts.borrow().clone();
        Ok(Box::new(snapshot.into_iter()))
    }
}
