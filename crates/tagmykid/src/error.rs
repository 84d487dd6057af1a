//! Error types for tagmykid.
//!
//! Domain failures (bad input, authentication, tag resolution) and
//! infrastructure failures (storage, configuration, I/O) share one enum so
//! every operation can return the same `Result`.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Input field named by a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Account phone number (the account key).
    Phone,
    /// Account credential.
    Secret,
    /// Parent's given name.
    Name,
    /// Parent's family name.
    Surname,
    /// School the account belongs to.
    School,
    /// Child's full name on a tag.
    ChildName,
    /// Child's grade.
    Grade,
    /// Single-letter class section.
    ClassName,
    /// Parent contact number printed into a tag.
    ParentPhone,
    /// Manually entered tag code.
    Code,
    /// Finder's description of where the item turned up.
    Context,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Phone => "phone",
            Self::Secret => "password",
            Self::Name => "name",
            Self::Surname => "surname",
            Self::School => "school",
            Self::ChildName => "child name",
            Self::Grade => "grade",
            Self::ClassName => "class name",
            Self::ParentPhone => "parent phone",
            Self::Code => "tag code",
            Self::Context => "context",
        };
        f.write_str(name)
    }
}

/// The main error type for tagmykid operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Input Errors ===
    /// User input failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// The offending field.
        field: Field,
        /// What is wrong with it.
        message: String,
    },

    // === Authentication Errors ===
    /// Unknown phone number or wrong password.
    #[error("invalid phone number or password")]
    InvalidCredentials,

    /// Signup attempted for a phone number that already has an account.
    #[error("an account with phone number {phone} already exists")]
    AccountExists {
        /// The conflicting phone key.
        phone: String,
    },

    /// An operation that needs an identity was called without a session.
    #[error("you must be logged in to do that")]
    Unauthenticated,

    // === Tag Errors ===
    /// The account already owns a tag for this child.
    #[error("a tag for {name} (grade {grade} {class_name}) already exists")]
    DuplicateTag {
        /// Child name as submitted.
        name: String,
        /// Normalized grade.
        grade: String,
        /// Normalized class letter.
        class_name: String,
    },

    // === Resolution Errors ===
    /// A tag payload could not be turned back into a tag.
    #[error("corrupt tag payload: {reason}")]
    CorruptPayload {
        /// Why decoding failed.
        reason: String,
    },

    /// A scanned or linked tag is invalid.
    #[error("the QR code is invalid or corrupted")]
    InvalidCode,

    /// No stored tag carries the requested code.
    #[error("tag {code} not found")]
    NotFound {
        /// The code that was looked up.
        code: String,
    },

    // === Collaborator Errors ===
    /// The message drafting collaborator failed.
    #[error("message drafting failed: {message}")]
    Drafting {
        /// Description of what went wrong.
        message: String,
    },

    /// Rendering a QR image failed.
    #[error("failed to render QR code: {0}")]
    QrRender(String),

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for tagmykid operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a validation error for `field`.
    #[must_use]
    pub fn validation(field: Field, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a corrupt payload error.
    #[must_use]
    pub fn corrupt_payload(reason: impl Into<String>) -> Self {
        Self::CorruptPayload {
            reason: reason.into(),
        }
    }

    /// Create a drafting collaborator error.
    #[must_use]
    pub fn drafting(message: impl Into<String>) -> Self {
        Self::Drafting {
            message: message.into(),
        }
    }

    /// The field named by a validation error, if this is one.
    #[must_use]
    pub fn field(&self) -> Option<Field> {
        match self {
            Self::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }

    /// Check if this error is caused by user input and can be fixed by
    /// resubmitting.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::InvalidCredentials
                | Self::AccountExists { .. }
                | Self::Unauthenticated
                | Self::DuplicateTag { .. }
        )
    }

    /// Check if this error is a failure to resolve a scanned or typed tag.
    #[must_use]
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::CorruptPayload { .. } | Self::InvalidCode | Self::NotFound { .. }
        )
    }

    /// Process exit status for the CLI: 2 for bad input, 3 for a tag that
    /// cannot be resolved, 1 for everything else.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        if self.is_user_error() {
            2
        } else if self.is_resolution_failure() {
            3
        } else {
            1
        }
    }
}
