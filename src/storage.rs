// ABOUTME: Durable per-account stores for credentials and sync cursors
// ABOUTME: Full-snapshot JSON files replaced atomically under a per-store lock

use crate::{AccountId, Credential, Cursor, Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub struct Paths {
    pub data_dir: PathBuf,
    pub credentials_file: PathBuf,
    pub cursors_file: PathBuf,
    pub tmp_dir: PathBuf,
}

impl Paths {
    pub fn new(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = if let Some(dir) = data_dir_override {
            dir
        } else {
            dirs::data_dir()
                .ok_or_else(|| Error::Config("Could not determine data directory".into()))?
                .join("markbox")
        };

        Ok(Paths {
            credentials_file: data_dir.join("credentials.json"),
            cursors_file: data_dir.join("cursors.json"),
            tmp_dir: data_dir.join("tmp"),
            data_dir,
        })
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in &[&self.data_dir, &self.tmp_dir] {
            fs::create_dir_all(dir)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = fs::Permissions::from_mode(0o700);
                fs::set_permissions(dir, perms)?;
            }
        }
        Ok(())
    }
}

/// Writes `content` to a temp file in `tmp_dir`, syncs it, then renames it over `path`.
pub fn write_atomic(path: &Path, content: &[u8], tmp_dir: &Path) -> io::Result<()> {
    use rand::Rng;

    let random: u32 = rand::thread_rng().gen();
    let tmp_path = tmp_dir.join(format!("{:x}.part", random));

    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(content)?;
    file.sync_all()?;
    drop(file);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&tmp_path, perms)?;
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    Ok(())
}

pub trait CredentialStore: Send + Sync {
    /// Returns `Error::CredentialNotFound` when the account never authorized.
    fn get(&self, account: &AccountId) -> Result<Credential>;
    fn put(&self, account: &AccountId, credential: Credential) -> Result<()>;
}

pub trait CursorStore: Send + Sync {
    /// `None` means no pass has committed yet and a full listing is needed.
    fn get(&self, account: &AccountId) -> Result<Option<Cursor>>;
    fn put(&self, account: &AccountId, cursor: Cursor) -> Result<()>;
}

struct SnapshotFile {
    path: PathBuf,
    tmp_dir: PathBuf,
}

/// Map from account to one value, persisted as a whole on every write.
///
/// Writers hold the lock across the disk write, and the in-memory map only
/// changes once the new snapshot is on disk, so a failed write leaves both
/// views at the previous state.
pub struct SnapshotStore<V> {
    name: &'static str,
    file: Option<SnapshotFile>,
    entries: Mutex<BTreeMap<AccountId, V>>,
}

pub type FileCredentialStore = SnapshotStore<Credential>;
pub type FileCursorStore = SnapshotStore<Cursor>;

impl<V> SnapshotStore<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    pub fn open(name: &'static str, path: &Path, tmp_dir: &Path) -> Result<Self> {
        let entries: BTreeMap<AccountId, V> = if path.exists() {
            let content = fs::read(path)?;
            serde_json::from_slice(&content)?
        } else {
            BTreeMap::new()
        };
        debug!(store = name, path = %path.display(), accounts = entries.len(), "opened snapshot store");

        Ok(SnapshotStore {
            name,
            file: Some(SnapshotFile {
                path: path.to_path_buf(),
                tmp_dir: tmp_dir.to_path_buf(),
            }),
            entries: Mutex::new(entries),
        })
    }

    /// Store without a backing file, for tests and dry runs.
    pub fn in_memory(name: &'static str) -> Self {
        SnapshotStore {
            name,
            file: None,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    // The map is only swapped after a successful write, so a poisoned lock
    // still guards a consistent snapshot.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<AccountId, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn entry(&self, account: &AccountId) -> Option<V> {
        self.lock().get(account).cloned()
    }

    pub fn insert(&self, account: &AccountId, value: V) -> Result<()> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        next.insert(account.clone(), value);

        if let Some(file) = &self.file {
            let bytes = serde_json::to_vec_pretty(&next)?;
            write_atomic(&file.path, &bytes, &file.tmp_dir).map_err(|source| {
                Error::StoreWrite {
                    store: self.name,
                    source,
                }
            })?;
        }

        *guard = next;
        debug!(store = self.name, account = %account, "snapshot updated");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl CredentialStore for SnapshotStore<Credential> {
    fn get(&self, account: &AccountId) -> Result<Credential> {
        self.entry(account)
            .ok_or_else(|| Error::CredentialNotFound(account.to_string()))
    }

    fn put(&self, account: &AccountId, credential: Credential) -> Result<()> {
        self.insert(account, credential)
    }
}

impl CursorStore for SnapshotStore<Cursor> {
    fn get(&self, account: &AccountId) -> Result<Option<Cursor>> {
        Ok(self.entry(account))
    }

    fn put(&self, account: &AccountId, cursor: Cursor) -> Result<()> {
        self.insert(account, cursor)
    }
}

pub fn open_credential_store(paths: &Paths) -> Result<FileCredentialStore> {
    SnapshotStore::open("credentials", &paths.credentials_file, &paths.tmp_dir)
}

pub fn open_cursor_store(paths: &Paths) -> Result<FileCursorStore> {
    SnapshotStore::open("cursors", &paths.cursors_file, &paths.tmp_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_new_with_override() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(Some(temp.path().to_path_buf())).unwrap();
        assert_eq!(paths.data_dir, temp.path());
        assert_eq!(paths.cursors_file, temp.path().join("cursors.json"));
        assert_eq!(paths.credentials_file, temp.path().join("credentials.json"));
    }

    #[test]
    fn test_ensure_dirs_creates_structure() {
        let temp = TempDir::new().unwrap();
        let paths = Paths::new(Some(temp.path().join("state"))).unwrap();
        paths.ensure_dirs().unwrap();

        assert!(paths.data_dir.exists());
        assert!(paths.tmp_dir.exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_ensure_dirs_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let paths = Paths::new(Some(temp.path().join("state"))).unwrap();
        paths.ensure_dirs().unwrap();

        let perms = fs::metadata(&paths.tmp_dir).unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o700);
    }
}
