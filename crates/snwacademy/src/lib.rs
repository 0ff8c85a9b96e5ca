//! `snwacademy` - SNW Academy landing site and formations admin
//!
//! This library holds the formations store, the shared cache the page views
//! read from, the admin authorization guard, and the HTML rendering of the
//! landing page.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod auth;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod feed;
pub mod formation;
pub mod import;
pub mod logging;
pub mod site;
pub mod storage;
pub mod views;

pub use auth::{Access, AdminSession, AuthGuard, Redirect, Session, SessionStore};
pub use cache::{CacheAttachment, FormationsCache, Snapshot};
pub use config::Config;
pub use error::{Error, Result};
pub use feed::{ChangeEvent, ChangeFeed, ChangeKind, ChangeSubscription};
pub use formation::{Formation, FormationField, FormationForm, FormationLink, NewFormation, PartialFormation};
pub use logging::init_logging;
pub use storage::{FormationStore, SqliteStore};
pub use views::{AdminEntry, AdminView, FooterLinksView, ListingView, LoadState};
