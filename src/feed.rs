// ABOUTME: Change-feed abstraction over a remote paginated listing/delta API
// ABOUTME: Implemented by the Dropbox HTTP client and by in-memory test feeds

use crate::{Credential, Cursor, Page, Result};

/// Remote storage operations the sync engine depends on.
///
/// Implementations surface remote failures as distinct `Error` kinds and
/// never retry on their own.
pub trait ChangeFeed: Send + Sync {
    /// Lists the full current state, starting from nothing.
    fn list_initial(&self, credential: &Credential) -> Result<Page>;

    /// Lists entries changed since `cursor`.
    fn list_continue(&self, credential: &Credential, cursor: &Cursor) -> Result<Page>;

    fn download(&self, credential: &Credential, path: &str) -> Result<Vec<u8>>;

    /// Writes `content` at `path`, replacing whatever is there.
    fn upload(&self, credential: &Credential, path: &str, content: &[u8]) -> Result<()>;
}
