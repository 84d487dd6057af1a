//! Authentication and the short-lived session slots.
//!
//! The signed-in profile and the "tag to display" record live in
//! [`SessionSlots`], a store separate from the durable account store. The
//! manager loads the session once when it is opened and hands it out by
//! reference; operations that need an identity take it as an argument.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Field, Result};
use crate::model::{Account, Session, SignupRequest, Tag};
use crate::storage::{ensure_parent_dir, IdentityStore};
use crate::validate;

/// Storage for the current session and the pending tag.
pub trait SessionSlots {
    /// Read the stored session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read.
    fn load_session(&self) -> Result<Option<Session>>;

    /// Replace the stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    fn save_session(&self, session: &Session) -> Result<()>;

    /// Read the pending tag, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read.
    fn load_pending(&self) -> Result<Option<Tag>>;

    /// Replace the pending tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    fn save_pending(&self, tag: &Tag) -> Result<()>;

    /// Remove both the session and the pending tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the slots cannot be cleared.
    fn clear(&self) -> Result<()>;
}

/// Slots that vanish with the process.
#[derive(Debug, Default)]
pub struct MemorySlots {
    session: RefCell<Option<Session>>,
    pending: RefCell<Option<Tag>>,
}

impl MemorySlots {
    /// Create empty slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionSlots for MemorySlots {
    fn load_session(&self) -> Result<Option<Session>> {
        Ok(self.session.borrow().clone())
    }

    fn save_session(&self, session: &Session) -> Result<()> {
        *self.session.borrow_mut() = Some(session.clone());
        Ok(())
    }

    fn load_pending(&self) -> Result<Option<Tag>> {
        Ok(self.pending.borrow().clone())
    }

    fn save_pending(&self, tag: &Tag) -> Result<()> {
        *self.pending.borrow_mut() = Some(tag.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.session.borrow_mut().take();
        self.pending.borrow_mut().take();
        Ok(())
    }
}

const SESSION_FILE: &str = "session.json";
const PENDING_FILE: &str = "pending_tag.json";

/// Slots kept as two JSON files in a directory.
#[derive(Debug)]
pub struct FileSlots {
    dir: PathBuf,
}

impl FileSlots {
    /// Use `dir` for the slot files. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the slot files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match std::fs::read(self.dir.join(name)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        ensure_parent_dir(&path)?;
        std::fs::write(path, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        match std::fs::remove_file(self.dir.join(name)) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

impl SessionSlots for FileSlots {
    fn load_session(&self) -> Result<Option<Session>> {
        self.read(SESSION_FILE)
    }

    fn save_session(&self, session: &Session) -> Result<()> {
        self.write(SESSION_FILE, session)
    }

    fn load_pending(&self) -> Result<Option<Tag>> {
        self.read(PENDING_FILE)
    }

    fn save_pending(&self, tag: &Tag) -> Result<()> {
        self.write(PENDING_FILE, tag)
    }

    fn clear(&self) -> Result<()> {
        self.remove(SESSION_FILE)?;
        self.remove(PENDING_FILE)
    }
}

/// Login, signup and logout over an identity store.
#[derive(Debug)]
pub struct SessionManager<S, T> {
    accounts: S,
    slots: T,
    current: Option<Session>,
}

impl<S: IdentityStore, T: SessionSlots> SessionManager<S, T> {
    /// Open the manager, restoring any session left in `slots`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session slot cannot be read.
    pub fn open(accounts: S, slots: T) -> Result<Self> {
        let current = slots.load_session()?;
        if let Some(session) = &current {
            debug!(phone = %session.phone, "Restored session");
        }
        Ok(Self {
            accounts,
            slots,
            current,
        })
    }

    /// The session restored at open or established since.
    #[must_use]
    pub fn current_session(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// The account store this manager writes to.
    #[must_use]
    pub fn accounts(&self) -> &S {
        &self.accounts
    }

    /// Sign in with a phone number and password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] if no account exists for
    /// `phone` or the password does not match.
    pub fn login(&mut self, phone: &str, secret: &str) -> Result<&Session> {
        let account = self
            .accounts
            .get(phone)?
            .filter(|account| account.secret == secret)
            .ok_or(Error::InvalidCredentials)?;

        info!(phone, "Logged in");
        self.establish(Session::for_account(phone, &account))
    }

    /// Create an account and sign in to it.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed input, or
    /// [`Error::AccountExists`] if `phone` is already registered.
    pub fn signup(&mut self, request: &SignupRequest) -> Result<&Session> {
        let phone = validate::phone(Field::Phone, &request.phone)?;
        validate::secret(&request.secret)?;
        let name = validate::required(Field::Name, &request.name)?;
        let surname = validate::required(Field::Surname, &request.surname)?;
        let school = validate::required(Field::School, &request.school)?;

        if self.accounts.get(&phone)?.is_some() {
            return Err(Error::AccountExists { phone });
        }

        let account = Account::new(request.secret.clone(), name, surname, school);
        self.accounts.put(&phone, &account)?;

        info!(phone = %phone, school = ?account.school, "Created account");
        self.establish(Session::for_account(phone, &account))
    }

    /// Sign out, dropping the session and any pending tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the slots cannot be cleared.
    pub fn logout(&mut self) -> Result<()> {
        self.slots.clear()?;
        if let Some(session) = self.current.take() {
            info!(phone = %session.phone, "Logged out");
        }
        Ok(())
    }

    /// Remember `tag` as the one to display next.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    pub fn stage_tag(&self, tag: &Tag) -> Result<()> {
        self.slots.save_pending(tag)?;
        debug!(code = %tag.code, "Staged tag for display");
        Ok(())
    }

    /// The tag staged for display, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be read.
    pub fn pending_tag(&self) -> Result<Option<Tag>> {
        self.slots.load_pending()
    }

    fn establish(&mut self, session: Session) -> Result<&Session> {
        self.slots.save_session(&session)?;
        Ok(self.current.insert(session))
    }
}
