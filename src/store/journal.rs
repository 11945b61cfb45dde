//! Journal-file stores
//!
//! Each store owns one append-only JSON Lines file. A write is appended and
//! flushed before it becomes visible to readers; opening a store replays the
//! file into the in-memory indexes of [`super::memory`].
//!
//! Only newline-terminated lines are committed. Replay stops at the first
//! line that is unterminated or does not decode; the file is then moved to
//! `<name>.bak` and rewritten with the valid prefix.

use super::memory::{MemoryJobStatusStore, MemoryResourceStore};
use super::{JobStatusStore, ResourceStore, StoreError};
use crate::model::{JobId, JobStatus, NewResource, Resource, ResourceId, ResourceKind};
use parking_lot::Mutex;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name of the resource journal inside a store directory
pub const RESOURCES_FILE: &str = "resources.jsonl";
/// File name of the status journal inside a store directory
pub const JOBS_FILE: &str = "jobs.jsonl";

/// Entries decoded from a journal, and where decoding stopped
struct Replay<T> {
    entries: Vec<T>,
    /// Byte length of the committed prefix
    valid_len: usize,
    corrupt: Option<StoreError>,
}

fn replay<T: DeserializeOwned>(path: &Path, bytes: &[u8]) -> Replay<T> {
    let mut entries = Vec::new();
    let mut offset = 0;

    for (idx, chunk) in bytes.split_inclusive(|b| *b == b'\n').enumerate() {
        let decoded = match chunk.strip_suffix(b"\n") {
            Some(line) if line.iter().all(u8::is_ascii_whitespace) => None,
            Some(line) => Some(serde_json::from_slice(line)),
            // Torn write: the process died before the newline landed
            None => Some(Err(serde_json::from_slice::<T>(chunk)
                .err()
                .unwrap_or_else(|| de::Error::custom("unterminated line")))),
        };

        match decoded {
            None => {}
            Some(Ok(entry)) => entries.push(entry),
            Some(Err(source)) => {
                let corrupt = StoreError::Corrupt {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    source,
                };
                return Replay {
                    entries,
                    valid_len: offset,
                    corrupt: Some(corrupt),
                };
            }
        }
        offset += chunk.len();
    }

    Replay {
        entries,
        valid_len: offset,
        corrupt: None,
    }
}

/// Append-only file the journal writes to
trait JournalFile: Write {
    fn len(&self) -> io::Result<u64>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl JournalFile for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Write one full line or nothing: a failed write is cut back to the
/// previous end of file so the next line does not land mid-record.
fn append_line<F: JournalFile>(file: &mut F, line: &[u8]) -> io::Result<()> {
    let len = file.len()?;
    if let Err(e) = file.write_all(line).and_then(|()| file.flush()) {
        if let Err(cut) = file.truncate(len) {
            tracing::error!("Failed to roll back partial journal write: {}", cut);
        }
        return Err(e);
    }
    Ok(())
}

/// Append-only JSON Lines file
#[derive(Debug)]
struct Journal {
    file: Mutex<File>,
}

impl Journal {
    /// Open (creating if needed) and replay every committed entry
    fn open<T: DeserializeOwned>(path: &Path) -> Result<(Self, Vec<T>), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let Replay {
            entries,
            valid_len,
            corrupt,
        } = replay(path, &bytes);

        if let Some(err) = corrupt {
            let backup = backup_path(path);
            tracing::warn!(
                "{}; keeping {} entries, moving the journal to {:?}",
                err,
                entries.len(),
                backup
            );
            std::fs::rename(path, &backup)?;
            std::fs::write(path, &bytes[..valid_len])?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        tracing::debug!("Replayed {} entries from {:?}", entries.len(), path);

        Ok((
            Self {
                file: Mutex::new(file),
            },
            entries,
        ))
    }

    /// Append one entry, then run `publish` while the file lock is still held
    /// so readers see entries in journal order.
    fn append<T: Serialize>(&self, entry: &T, publish: impl FnOnce()) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = self.file.lock();
        append_line(&mut *file, &line)?;
        publish();
        Ok(())
    }
}

/// `resources.jsonl` becomes `resources.jsonl.bak`
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Durable resource store
#[derive(Debug)]
pub struct JournalResourceStore {
    journal: Journal,
    index: MemoryResourceStore,
}

impl JournalResourceStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let (journal, records) = Journal::open::<Resource>(path.as_ref())?;
        let index = MemoryResourceStore::new();
        for record in records {
            index.restore(record);
        }
        Ok(Self { journal, index })
    }

    /// Open `resources.jsonl` inside `dir`
    pub fn open_in(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open(dir.as_ref().join(RESOURCES_FILE))
    }
}

impl ResourceStore for JournalResourceStore {
    fn insert(&self, resource: NewResource) -> Result<ResourceId, StoreError> {
        let id = ResourceId::new();
        let record = resource.into_resource(id);
        self.journal.append(&record, || self.index.restore(record.clone()))?;
        Ok(id)
    }

    fn find_by_type(&self, kind: ResourceKind) -> Vec<Resource> {
        self.index.find_by_type(kind)
    }

    fn find_by_type_and_details(&self, kind: ResourceKind, details: &str) -> Vec<Resource> {
        self.index.find_by_type_and_details(kind, details)
    }

    fn find_by_bucket_name(&self, bucket_name: &str) -> Vec<Resource> {
        self.index.find_by_bucket_name(bucket_name)
    }

    fn find_by_bucket_and_pattern(&self, bucket_name: &str, pattern: &str) -> Vec<Resource> {
        self.index.find_by_bucket_and_pattern(bucket_name, pattern)
    }

    fn find_by_job(&self, job_id: JobId) -> Vec<Resource> {
        self.index.find_by_job(job_id)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StatusEntry {
    job_id: JobId,
    status: JobStatus,
}

/// Durable status store; replay keeps the last entry per job
#[derive(Debug)]
pub struct JournalJobStatusStore {
    journal: Journal,
    index: MemoryJobStatusStore,
}

impl JournalJobStatusStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let (journal, entries) = Journal::open::<StatusEntry>(path.as_ref())?;
        let index = MemoryJobStatusStore::new();
        for entry in entries {
            index.upsert(entry.job_id, entry.status)?;
        }
        Ok(Self { journal, index })
    }

    /// Open `jobs.jsonl` inside `dir`
    pub fn open_in(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open(dir.as_ref().join(JOBS_FILE))
    }
}

impl JobStatusStore for JournalJobStatusStore {
    fn upsert(&self, job_id: JobId, status: JobStatus) -> Result<(), StoreError> {
        let entry = StatusEntry { job_id, status };
        self.journal.append(&entry, || {
            // Memory upsert cannot fail
            let _ = self.index.upsert(job_id, status);
        })
    }

    fn get(&self, job_id: JobId) -> Option<JobStatus> {
        self.index.get(job_id)
    }
}
