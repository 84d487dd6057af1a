//! Finding the child behind a scanned link or a typed code.
//!
//! Both paths are read-only and need no session: anyone holding a tag can
//! resolve it.

pub mod scan;

use tracing::{debug, info};

use crate::codec;
use crate::error::{Error, Result};
use crate::model::{FinderView, SCHOOL_NOT_SPECIFIED};
use crate::storage::IdentityStore;
use crate::validate;

/// Resolves tags for finders.
#[derive(Debug)]
pub struct TagResolver<S> {
    accounts: S,
}

impl<S: IdentityStore> TagResolver<S> {
    /// Create a resolver over `accounts`.
    #[must_use]
    pub fn new(accounts: S) -> Self {
        Self { accounts }
    }

    /// Resolve the payload taken from a deep link's `#/found/` fragment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCode`] if the payload cannot be decoded, or a
    /// storage error if a legacy payload's school lookup fails.
    pub fn resolve_link(&self, payload: &str) -> Result<FinderView> {
        let tag = codec::decode(payload, &self.accounts).map_err(|e| match e {
            Error::CorruptPayload { reason } => {
                debug!(%reason, "Rejected tag payload");
                Error::InvalidCode
            }
            other => other,
        })?;

        info!(code = %tag.code, "Resolved tag from link");
        Ok(FinderView::from(tag))
    }

    /// Resolve a code typed in by a finder.
    ///
    /// The first account holding a matching tag wins; codes are not unique
    /// across accounts.
    ///
    /// # Errors
    ///
    /// Returns a validation error unless `input` is six characters after
    /// trimming, [`Error::NotFound`] if no stored tag matches, or a storage
    /// error if the store cannot be scanned.
    pub fn resolve_code(&self, input: &str) -> Result<FinderView> {
        let code = validate::code(input)?;

        for (phone, account) in self.accounts.scan()? {
            let Some(tag) = account.find_tag(&code) else {
                continue;
            };

            let mut view = FinderView::from(tag.clone());
            if !tag.has_school() {
                view.school = account
                    .school()
                    .unwrap_or(SCHOOL_NOT_SPECIFIED)
                    .to_string();
            }
            debug!(%phone, code = %view.code, "Matched typed code");
            info!(code = %view.code, "Resolved tag from code");
            return Ok(view);
        }

        debug!(%code, "No tag matches typed code");
        Err(Error::NotFound { code })
    }
}
