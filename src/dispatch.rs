// ABOUTME: Fire-and-forget trigger interface running one sync task per account
// ABOUTME: Task failures are logged, never returned to the caller

use crate::{sync::SyncEngine, AccountId, Credential, Error, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

pub struct Dispatcher {
    engine: Arc<SyncEngine>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Dispatcher {
            engine,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Starts a sync pass for `account` on its own thread and returns at once.
    ///
    /// Triggers for the same account are not serialized; overlapping passes
    /// may redo pages, which is safe because uploads overwrite.
    pub fn notify(&self, account: AccountId) {
        let engine = Arc::clone(&self.engine);
        let spawned = thread::Builder::new()
            .name(format!("sync-{}", account))
            .spawn(move || run_task(&engine, &account));

        match spawned {
            Ok(handle) => {
                let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
                tasks.retain(|t| !t.is_finished());
                tasks.push(handle);
            }
            Err(e) => error!("failed to spawn sync task: {}", e),
        }
    }

    /// Records a fresh authorization and kicks off the initial sync.
    pub fn authorized(&self, account: AccountId, credential: Credential) -> Result<()> {
        self.engine.credentials().put(&account, credential)?;
        info!(account = %account, "credential stored");
        self.notify(account);
        Ok(())
    }

    /// Blocks until every task started so far has finished.
    pub fn wait(&self) -> usize {
        let handles: Vec<_> = {
            let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            tasks.drain(..).collect()
        };
        let count = handles.len();
        for handle in handles {
            // run_task already catches panics
            let _ = handle.join();
        }
        count
    }
}

fn run_task(engine: &SyncEngine, account: &AccountId) {
    let outcome = catch_unwind(AssertUnwindSafe(|| engine.run(account)));

    match outcome {
        Ok(Ok(report)) => info!(
            account = %account,
            pages = report.pages,
            converted = report.converted,
            cursor = %report.cursor,
            "sync task finished"
        ),
        Ok(Err(Error::CredentialNotFound(_))) => {
            debug!(account = %account, "no credential on record, skipping")
        }
        Ok(Err(e)) if e.is_transient() => {
            warn!(account = %account, "sync task aborted, next trigger resumes: {}", e)
        }
        Ok(Err(e)) => error!(account = %account, "sync task failed: {}", e),
        Err(_) => error!(account = %account, "sync task panicked"),
    }
}
