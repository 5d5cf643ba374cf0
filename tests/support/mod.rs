// ABOUTME: In-memory change feed that records every call for assertions
// ABOUTME: Scripted pages keyed by cursor, injectable upload failures

#![allow(dead_code)]

use markbox::convert::MarkdownToHtml;
use markbox::feed::ChangeFeed;
use markbox::storage::{CursorStore, FileCredentialStore, FileCursorStore};
use markbox::sync::SyncEngine;
use markbox::{AccountId, ChangeEntry, Credential, Cursor, EntryKind, Error, Page, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListInitial,
    ListContinue(String),
    Download(String),
    Upload(String),
}

struct Observer {
    store: Arc<FileCursorStore>,
    account: AccountId,
}

#[derive(Default)]
pub struct FakeFeed {
    token: String,
    pages: Mutex<HashMap<Option<String>, Page>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<Call>>,
    failing_uploads: Mutex<HashSet<String>>,
    revoked: Mutex<bool>,
    observer: Mutex<Option<Observer>>,
    observed: Mutex<Vec<Option<Cursor>>>,
}

impl FakeFeed {
    pub fn new(token: &str) -> Self {
        FakeFeed {
            token: token.into(),
            ..Default::default()
        }
    }

    /// Registers the page returned for `after` (`None` = initial listing).
    pub fn page(&self, after: Option<&str>, entries: Vec<ChangeEntry>, next: &str, has_more: bool) {
        self.pages.lock().unwrap().insert(
            after.map(String::from),
            Page {
                entries,
                next_cursor: Cursor::new(next),
                has_more,
            },
        );
    }

    pub fn file(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), content.as_bytes().to_vec());
    }

    pub fn stored(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn snapshot(&self) -> HashMap<String, Vec<u8>> {
        self.files.lock().unwrap().clone()
    }

    pub fn fail_upload(&self, path: &str) {
        self.failing_uploads.lock().unwrap().insert(path.into());
    }

    pub fn clear_failures(&self) {
        self.failing_uploads.lock().unwrap().clear();
    }

    pub fn revoke(&self) {
        *self.revoked.lock().unwrap() = true;
    }

    /// Records the account's stored cursor at every list call.
    pub fn observe(&self, store: Arc<FileCursorStore>, account: AccountId) {
        *self.observer.lock().unwrap() = Some(Observer { store, account });
    }

    pub fn observed(&self) -> Vec<Option<Cursor>> {
        self.observed.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn check(&self, credential: &Credential, endpoint: &str) -> Result<()> {
        if *self.revoked.lock().unwrap() || credential.secret() != self.token {
            return Err(Error::FeedAuth {
                endpoint: endpoint.into(),
                message: "invalid_access_token".into(),
            });
        }
        Ok(())
    }

    fn record_observation(&self) {
        if let Some(obs) = self.observer.lock().unwrap().as_ref() {
            let current = obs.store.get(&obs.account).unwrap();
            self.observed.lock().unwrap().push(current);
        }
    }

    fn lookup(&self, after: Option<String>, endpoint: &str) -> Result<Page> {
        self.pages
            .lock()
            .unwrap()
            .get(&after)
            .cloned()
            .ok_or_else(|| Error::Api {
                endpoint: endpoint.into(),
                status: 409,
                message: "reset".into(),
            })
    }
}

impl ChangeFeed for FakeFeed {
    fn list_initial(&self, credential: &Credential) -> Result<Page> {
        self.check(credential, "list_folder")?;
        self.calls.lock().unwrap().push(Call::ListInitial);
        self.record_observation();
        self.lookup(None, "list_folder")
    }

    fn list_continue(&self, credential: &Credential, cursor: &Cursor) -> Result<Page> {
        self.check(credential, "list_folder/continue")?;
        self.calls
            .lock()
            .unwrap()
            .push(Call::ListContinue(cursor.as_str().into()));
        self.record_observation();
        self.lookup(Some(cursor.as_str().into()), "list_folder/continue")
    }

    fn download(&self, credential: &Credential, path: &str) -> Result<Vec<u8>> {
        self.check(credential, "download")?;
        self.calls.lock().unwrap().push(Call::Download(path.into()));
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| Error::Api {
                endpoint: "download".into(),
                status: 409,
                message: "path/not_found".into(),
            })
    }

    fn upload(&self, credential: &Credential, path: &str, content: &[u8]) -> Result<()> {
        self.check(credential, "upload")?;
        self.calls.lock().unwrap().push(Call::Upload(path.into()));
        if self.failing_uploads.lock().unwrap().contains(path) {
            return Err(Error::UploadConflict {
                path: path.into(),
                message: "path/conflict/file".into(),
            });
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), content.to_vec());
        Ok(())
    }
}

pub fn account(id: &str) -> AccountId {
    AccountId::new(id).unwrap()
}

pub fn modified(path: &str) -> ChangeEntry {
    ChangeEntry::new(path, EntryKind::Modified)
}

pub fn deleted(path: &str) -> ChangeEntry {
    ChangeEntry::new(path, EntryKind::Deleted)
}

pub fn folder(path: &str) -> ChangeEntry {
    ChangeEntry::new(path, EntryKind::Folder)
}

pub struct Harness {
    pub credentials: Arc<FileCredentialStore>,
    pub cursors: Arc<FileCursorStore>,
    pub feed: Arc<FakeFeed>,
    pub engine: Arc<SyncEngine>,
}

impl Harness {
    /// In-memory stores with `account` authorized for `token`.
    pub fn new(account_id: &str, token: &str) -> Self {
        let credentials = Arc::new(FileCredentialStore::in_memory("credentials"));
        credentials
            .insert(&account(account_id), Credential::new(token))
            .unwrap();
        Self::with_stores(credentials, Arc::new(FileCursorStore::in_memory("cursors")), token)
    }

    pub fn with_stores(
        credentials: Arc<FileCredentialStore>,
        cursors: Arc<FileCursorStore>,
        token: &str,
    ) -> Self {
        let feed = Arc::new(FakeFeed::new(token));
        let engine = Arc::new(SyncEngine::new(
            credentials.clone(),
            cursors.clone(),
            feed.clone(),
            Arc::new(MarkdownToHtml),
        ));
        Harness {
            credentials,
            cursors,
            feed,
            engine,
        }
    }

    pub fn cursor(&self, account_id: &str) -> Option<Cursor> {
        self.cursors.get(&account(account_id)).unwrap()
    }
}
