//! `tagmykid` - Lost-and-found tags for school kids
//!
//! Parents register tags for their children under a phone-number account.
//! Each tag gets a short code and a deep link that is printed as a QR code.
//! A finder resolves either one back to the child's name, school and class,
//! and gets a ready-made message link to the parent.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod codec;
pub mod config;
pub mod contact;
pub mod error;
pub mod links;
pub mod logging;
pub mod model;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod storage;
pub mod validate;

pub use config::Config;
pub use error::{Error, Field, Result};
pub use logging::init_logging;
pub use model::{Account, FinderView, Session, SignupRequest, Tag, TagDraft};
pub use registry::TagRegistry;
pub use resolver::TagResolver;
pub use session::SessionManager;
pub use storage::IdentityStore;
