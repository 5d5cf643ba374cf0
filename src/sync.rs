// ABOUTME: Incremental sync pass for one account over the change feed
// ABOUTME: Converts eligible files and commits the cursor after each page

use crate::{
    convert::Transformer,
    feed::ChangeFeed,
    storage::{CredentialStore, CursorStore},
    AccountId, Credential, Cursor, Page, Result,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub account: AccountId,
    pub pages: usize,
    pub converted: usize,
    pub skipped: usize,
    pub cursor: Cursor,
}

enum SyncState {
    Paging { cursor: Option<Cursor> },
    Done { cursor: Cursor },
}

pub struct SyncEngine {
    credentials: Arc<dyn CredentialStore>,
    cursors: Arc<dyn CursorStore>,
    feed: Arc<dyn ChangeFeed>,
    transformer: Arc<dyn Transformer>,
}

impl SyncEngine {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        cursors: Arc<dyn CursorStore>,
        feed: Arc<dyn ChangeFeed>,
        transformer: Arc<dyn Transformer>,
    ) -> Self {
        SyncEngine {
            credentials,
            cursors,
            feed,
            transformer,
        }
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub fn cursors(&self) -> &Arc<dyn CursorStore> {
        &self.cursors
    }

    /// Runs one pass until the feed reports no more changes.
    ///
    /// Each page is committed only after every eligible entry in it has been
    /// uploaded; the first failure ends the pass with the cursor left at the
    /// last committed page.
    #[instrument(skip_all, fields(account = %account))]
    pub fn run(&self, account: &AccountId) -> Result<SyncReport> {
        let credential = self.credentials.get(account)?;
        let start = self.cursors.get(account)?;
        debug!(resume = start.is_some(), "starting sync pass");

        let mut report = SyncReport {
            account: account.clone(),
            pages: 0,
            converted: 0,
            skipped: 0,
            cursor: Cursor::new(""),
        };
        let mut state = SyncState::Paging { cursor: start };

        loop {
            state = match state {
                SyncState::Paging { cursor } => {
                    let page = match &cursor {
                        None => self.feed.list_initial(&credential)?,
                        Some(c) => self.feed.list_continue(&credential, c)?,
                    };
                    report.pages += 1;
                    self.apply_page(&credential, &page, &mut report)?;

                    self.cursors.put(account, page.next_cursor.clone())?;
                    debug!(
                        page = report.pages,
                        entries = page.entries.len(),
                        cursor = %page.next_cursor,
                        "page committed"
                    );

                    if page.has_more {
                        SyncState::Paging {
                            cursor: Some(page.next_cursor),
                        }
                    } else {
                        SyncState::Done {
                            cursor: page.next_cursor,
                        }
                    }
                }
                SyncState::Done { cursor } => {
                    report.cursor = cursor;
                    break;
                }
            };
        }

        info!(
            pages = report.pages,
            converted = report.converted,
            skipped = report.skipped,
            "sync pass complete"
        );
        Ok(report)
    }

    fn apply_page(
        &self,
        credential: &Credential,
        page: &Page,
        report: &mut SyncReport,
    ) -> Result<()> {
        for entry in &page.entries {
            if !self.transformer.is_eligible(entry) {
                report.skipped += 1;
                continue;
            }

            let content = self.feed.download(credential, &entry.path)?;
            let output = self.transformer.transform(&entry.path, &content)?;
            self.feed.upload(credential, &output.path, &output.content)?;

            debug!(source = %entry.path, target = %output.path, "converted");
            report.converted += 1;
        }
        Ok(())
    }
}
