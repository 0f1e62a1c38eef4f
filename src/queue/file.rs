use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SdkError};

use super::WorkQueue;

/// Durable FIFO queue backed by a spool directory.
///
/// Each item is one sequence-numbered JSON file, written atomically
/// (temp file + rename) and deleted on `remove()`. Opening a queue recovers
/// every surviving item in sequence order, so items enqueued before a crash
/// are redelivered at least once, in the original order.
///
/// ```text
/// <dir>/00000000000000000042.json   - queued item
/// <dir>/00000000000000000043.json.tmp - in-flight write, ignored on recovery
/// ```
pub struct FileQueue<T> {
    dir: PathBuf,
    inner: Mutex<Inner>,
    _marker: PhantomData<fn() -> T>,
}

struct Inner {
    entries: VecDeque<u64>,
    next_seq: u64,
}

const ITEM_EXT: &str = "json";
const TEMP_EXT: &str = "tmp";

impl<T> FileQueue<T> {
    /// Opens (or creates) a queue at `dir`, recovering queued items.
    ///
    /// Files that fail to parse as a sequence number are skipped with a
    /// warning; orphaned temp files from interrupted writes are deleted.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let mut seqs = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some(TEMP_EXT) => {
                    // Interrupted write; the item was never durably enqueued.
                    let _ = fs::remove_file(&path);
                }
                Some(ITEM_EXT) => match parse_seq(&path) {
                    Some(seq) => seqs.push(seq),
                    None => {
                        warn!("ignoring unrecognized spool file {}", path.display());
                    }
                },
                _ => {}
            }
        }
        seqs.sort_unstable();

        let next_seq = seqs.last().map_or(0, |max| max + 1);
        Ok(Self {
            dir,
            inner: Mutex::new(Inner {
                entries: seqs.into(),
                next_seq,
            }),
            _marker: PhantomData,
        })
    }

    fn item_path(&self, seq: u64) -> PathBuf {
        self.dir.join(format!("{seq:020}.{ITEM_EXT}"))
    }
}

fn parse_seq(path: &Path) -> Option<u64> {
    path.file_stem()?.to_str()?.parse().ok()
}

impl<T> WorkQueue<T> for FileQueue<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    fn enqueue(&self, item: T) -> Result<()> {
        let bytes = serde_json::to_vec(&item)?;

        let mut inner = self.inner.lock().unwrap();
        let seq = inner.next_seq;
        let path = self.item_path(seq);
        let temp_path = path.with_extension(format!("{ITEM_EXT}.{TEMP_EXT}"));

        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &path)?;

        inner.next_seq += 1;
        inner.entries.push_back(seq);
        Ok(())
    }

    fn peek(&self) -> Result<Option<T>> {
        let mut inner = self.inner.lock().unwrap();
        // A head item that cannot be read back (corrupted, deleted out from
        // under us) is dropped; it must not pin everything queued behind it.
        while let Some(&seq) = inner.entries.front() {
            let path = self.item_path(seq);
            let item = fs::read(&path)
                .map_err(SdkError::from)
                .and_then(|bytes| Ok(serde_json::from_slice(&bytes)?));
            match item {
                Ok(item) => return Ok(Some(item)),
                Err(e) => {
                    error!("dropping unreadable spool item {}: {e}", path.display());
                    inner.entries.pop_front();
                    let _ = fs::remove_file(&path);
                }
            }
        }
        Ok(None)
    }

    fn remove(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(seq) = inner.entries.pop_front() {
            let path = self.item_path(seq);
            fs::remove_file(&path).map_err(|e| {
                SdkError::Queue(format!("failed to remove {}: {e}", path.display()))
            })?;
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        while let Some(seq) = inner.entries.pop_front() {
            let _ = fs::remove_file(self.item_path(seq));
        }
        Ok(())
    }
}
