// ABOUTME: Core sync types plus serde models for Dropbox API payloads
// ABOUTME: Account ids, credentials, cursors, change entries, and pages

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a storage-account owner. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::Config("account id must not be empty".into()));
        }
        Ok(AccountId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = Error;

    fn try_from(value: String) -> crate::Result<Self> {
        AccountId::new(value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bearer token for one account. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Credential(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Opaque resume token handed out by the change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Cursor(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Created,
    Modified,
    Deleted,
    Folder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEntry {
    pub path: String,
    pub kind: EntryKind,
}

impl ChangeEntry {
    pub fn new(path: impl Into<String>, kind: EntryKind) -> Self {
        ChangeEntry {
            path: path.into(),
            kind,
        }
    }
}

/// One batch of changes and the cursor that resumes after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub entries: Vec<ChangeEntry>,
    pub next_cursor: Cursor,
    pub has_more: bool,
}

/// Entry as returned by `files/list_folder`, tagged by `.tag`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
pub enum RemoteMetadata {
    File { path_lower: String },
    Folder { path_lower: String },
    Deleted { path_lower: String },
}

impl From<RemoteMetadata> for ChangeEntry {
    fn from(meta: RemoteMetadata) -> Self {
        // The listing API does not tell creations from modifications.
        match meta {
            RemoteMetadata::File { path_lower } => ChangeEntry::new(path_lower, EntryKind::Modified),
            RemoteMetadata::Folder { path_lower } => ChangeEntry::new(path_lower, EntryKind::Folder),
            RemoteMetadata::Deleted { path_lower } => {
                ChangeEntry::new(path_lower, EntryKind::Deleted)
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListFolderResult {
    pub entries: Vec<RemoteMetadata>,
    pub cursor: String,
    pub has_more: bool,
}

impl From<ListFolderResult> for Page {
    fn from(result: ListFolderResult) -> Self {
        Page {
            entries: result.entries.into_iter().map(ChangeEntry::from).collect(),
            next_cursor: Cursor::new(result.cursor),
            has_more: result.has_more,
        }
    }
}

/// Body of a webhook POST.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub list_folder: ListFolderNotification,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListFolderNotification {
    #[serde(default)]
    pub accounts: Vec<String>,
}
