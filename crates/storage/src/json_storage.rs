//! JSON file storage implementation.
//!
//! Each work item is stored under `items/` as a record holding the item and
//! its store version, so content and version are committed by one rename.
//! Writers hold an exclusive lock on `locks/<stem>.lock` across the
//! read-check-write sequence; the lock is shared by every process using the
//! same directory.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use optrack_core::{PartNumber, WorkItem};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use super::trait_::check_version;
use super::{Repository, Result, StorageError, Versioned};

/// On-disk form of a work item.
#[derive(Serialize, Deserialize)]
struct ItemRecord<T> {
    version: u64,
    item: T,
}

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
}

impl JsonStorage {
    /// Open storage rooted at `root`, creating the `items/` and `locks/`
    /// directories if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("items")).await?;
        fs::create_dir_all(root.join("locks")).await?;

        Ok(Self { root })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn item_path(&self, part_number: &PartNumber) -> PathBuf {
        self.root.join("items").join(format!("{}.json", file_stem(part_number)))
    }

    fn lock_path(&self, part_number: &PartNumber) -> PathBuf {
        self.root.join("locks").join(format!("{}.lock", file_stem(part_number)))
    }
}

#[async_trait::async_trait]
impl Repository for JsonStorage {
    async fn load_item(&self, part_number: &PartNumber) -> Result<Option<Versioned<WorkItem>>> {
        let record: Option<ItemRecord<WorkItem>> = read_json(&self.item_path(part_number)).await?;
        Ok(record.map(|r| Versioned {
            value: r.item,
            version: r.version,
        }))
    }

    async fn save_item(&self, item: &WorkItem, expected_version: Option<u64>) -> Result<u64> {
        let _lock = ItemLock::acquire(self.lock_path(&item.part_number)).await?;

        let path = self.item_path(&item.part_number);
        let stored: Option<ItemRecord<WorkItem>> = read_json(&path).await?;
        let version = check_version(&item.part_number, expected_version, stored.map(|r| r.version))?;

        let json = serde_json::to_string_pretty(&ItemRecord { version, item })?;
        write_atomic(&path, json.as_bytes()).await?;

        debug!(part_number = %item.part_number, version, "saved work item");
        Ok(version)
    }

    async fn list_items(&self) -> Result<Vec<WorkItem>> {
        let records: Vec<ItemRecord<WorkItem>> = list_dir(&self.root.join("items")).await?;
        let mut items: Vec<WorkItem> = records.into_iter().map(|r| r.item).collect();
        items.sort_by(|a, b| a.part_number.cmp(&b.part_number));
        Ok(items)
    }
}

/// Exclusive advisory lock on a per-item lock file, released on drop.
struct ItemLock {
    file: File,
}

impl ItemLock {
    async fn acquire(path: PathBuf) -> Result<Self> {
        let file = tokio::task::spawn_blocking(move || -> std::io::Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;
            file.lock_exclusive()?;
            Ok(file)
        })
        .await
        .map_err(|e| StorageError::Other(format!("lock task failed: {e}")))??;
        Ok(Self { file })
    }
}

impl Drop for ItemLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Map a part number onto a file-system safe stem.
fn file_stem(part_number: &PartNumber) -> String {
    let mut stem = String::with_capacity(part_number.as_str().len());
    for c in part_number.as_str().chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            stem.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                stem.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    stem
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension(format!("{}.tmp", ulid::Ulid::new()));
    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        // None when the file was removed after read_dir listed it.
        if let Some(item) = read_json(&path).await.inspect_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "unreadable item file");
        })? {
            items.push(item);
        }
    }
    Ok(items)
}
