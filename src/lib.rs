// ABOUTME: Public library API for the markbox change-sync core
// ABOUTME: Re-exports core modules for the binary and integration tests

pub mod api;
pub mod auth;
pub mod cli;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod feed;
pub mod model;
pub mod storage;
pub mod sync;
pub mod webhook;

pub use error::{Error, Result};
pub use model::{AccountId, ChangeEntry, Credential, Cursor, EntryKind, Page};
