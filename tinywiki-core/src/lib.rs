//! # tinywiki-core
//!
//! Core library for the tinywiki server.
//!
//! This crate owns everything below the HTTP layer: page files and their
//! metadata, markdown rendering with wikilinks, revision history, tag and
//! search indexes, and the users file.

pub mod config;
pub mod error;
pub mod history;
pub mod markup;
pub mod meta;
pub mod page;
pub mod store;
pub mod url;
pub mod users;

pub use config::Config;
pub use error::WikiError;
pub use history::{DiffKind, DiffLine, History, Revision};
pub use markup::Processor;
pub use meta::Meta;
pub use page::Page;
pub use store::{Wiki, DEFAULT_SEARCH_ATTRS};
pub use url::clean_url;
pub use users::{is_valid_user_name, AuthenticationMethod, User, UserManager, ADMIN_ROLE};
