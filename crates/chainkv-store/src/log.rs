use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::{KvStore, Scan};

/// Flush/sync strategy for the log file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every write (safest, highest latency).
    EveryWrite,
    /// Flush to the OS page cache only (fastest, least durable).
    #[default]
    OsDefault,
}

/// A single `put` as it is framed on disk.
///
/// On-disk frame:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized LogRecord)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct LogRecord {
    key: u64,
    value: Vec<u8>,
}

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

struct LogInner {
    writer: BufWriter<File>,
    /// Current end of the valid log data.
    offset: u64,
    /// Latest value per key, rebuilt from the log on open.
    index: BTreeMap<u64, Vec<u8>>,
}

/// Crash-recoverable, append-only log store.
///
/// Every `put` appends a CRC-framed record to a single file; the in-memory
/// index keeps the latest value per key (last write wins). On open the file is
/// replayed front to back. A torn final frame left by a crash is truncated away
/// before new writes are accepted; a damaged frame anywhere else fails the
/// open. A failed `put` leaves the file ending at the last complete frame.
pub struct LogStore {
    path: PathBuf,
    inner: Mutex<LogInner>,
    sync_mode: SyncMode,
    closed: AtomicBool,
}

impl LogStore {
    /// Open (or create) a log store at the given file path.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let (index, valid_len) = recover(path)?;
        let file_len = file.metadata()?.len();
        if valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len,
                file_len,
                "truncating torn log tail"
            );
            file.set_len(valid_len)?;
        }

        debug!(path = %path.display(), entries = index.len(), "log store opened");
        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(LogInner {
                writer: BufWriter::new(file),
                offset: valid_len,
                index,
            }),
            sync_mode,
            closed: AtomicBool::new(false),
        })
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the valid log data in bytes.
    pub fn offset(&self) -> StoreResult<u64> {
        Ok(self.lock()?.offset)
    }

    /// Rewrite the log so it holds exactly one record per live key.
    ///
    /// Overwritten values are dropped. The new log is written beside the old
    /// one and renamed over it.
    pub fn compact(&self) -> StoreResult<()> {
        self.ensure_open()?;
        let mut inner = self.lock()?;
        inner.writer.flush()?;

        let tmp_path = self.path.with_extension("compact");
        let mut tmp = BufWriter::new(File::create(&tmp_path)?);
        let mut offset = 0u64;
        for (key, value) in &inner.index {
            offset += write_frame(&mut tmp, *key, value)?;
        }
        tmp.flush()?;
        tmp.get_ref().sync_all()?;
        drop(tmp);

        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        inner.writer = BufWriter::new(file);
        inner.offset = offset;

        debug!(path = %self.path.display(), bytes = offset, "log compacted");
        Ok(())
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, LogInner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("log store mutex poisoned".into()))
    }

    /// Drop whatever a failed append left behind, in the write buffer or on
    /// disk, so the file ends exactly at the last complete frame.
    fn discard_partial(&self, inner: &mut LogInner) -> StoreResult<()> {
        let file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        let failed = std::mem::replace(&mut inner.writer, BufWriter::new(file));
        // `into_parts` hands back the buffer instead of flushing it on drop.
        let (_, _unflushed) = failed.into_parts();
        inner.writer.get_ref().set_len(inner.offset)?;
        warn!(path = %self.path.display(), offset = inner.offset, "discarded partial log frame");
        Ok(())
    }
}

#[async_trait]
impl KvStore for LogStore {
    async fn put(&self, key: u64, value: Vec<u8>) -> StoreResult<()> {
        self.ensure_open()?;
        let mut inner = self.lock()?;

        let written = match append(&mut inner.writer, key, &value, self.sync_mode) {
            Ok(written) => written,
            Err(e) => {
                if let Err(rollback) = self.discard_partial(&mut inner) {
                    warn!(key, error = %rollback, "log rollback failed; closing store");
                    self.closed.store(true, Ordering::Release);
                }
                return Err(e);
            }
        };

        let frame_offset = inner.offset;
        inner.offset += written;
        inner.index.insert(key, value);

        debug!(key, offset = frame_offset, len = written, "log append");
        Ok(())
    }

    async fn get(&self, key: u64) -> StoreResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.lock()?.index.get(&key).cloned())
    }

    async fn scan(&self) -> StoreResult<Scan> {
        self.ensure_open()?;
        let snapshot: Vec<(u64, Vec<u8>)> = self
            .lock()?
            .index
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }

    async fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut inner = self.lock()?;
        inner.writer.flush()?;
        inner.writer.get_ref().sync_all()?;
        debug!(path = %self.path.display(), "log store closed");
        Ok(())
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("path", &self.path)
            .field("sync_mode", &self.sync_mode)
            .finish_non_exhaustive()
    }
}

/// Write one framed record; returns the number of bytes written.
fn write_frame<W: Write>(writer: &mut W, key: u64, value: &[u8]) -> StoreResult<u64> {
    let record = LogRecord {
        key,
        value: value.to_vec(),
    };
    let payload =
        bincode::serialize(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| StoreError::Serialization(format!("record too large: {} bytes", payload.len())))?;
    let crc = crc32fast::hash(&payload);

    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(&crc.to_le_bytes())?;
    writer.write_all(&payload)?;

    Ok(HEADER_SIZE as u64 + payload.len() as u64)
}

/// Frame, flush and optionally sync one record.
fn append(
    writer: &mut BufWriter<File>,
    key: u64,
    value: &[u8],
    sync_mode: SyncMode,
) -> StoreResult<u64> {
    let written = write_frame(writer, key, value)?;
    writer.flush()?;
    if sync_mode == SyncMode::EveryWrite {
        writer.get_ref().sync_all()?;
    }
    Ok(written)
}

/// Replay the log file into an index.
///
/// Returns the index and the length of the valid prefix of the file. Only the
/// last frame may be incomplete or fail its CRC; that is a torn write and is
/// left out of the valid prefix. A bad frame with more data after it is
/// corruption and fails with [`StoreError::Corrupt`].
fn recover(path: &Path) -> StoreResult<(BTreeMap<u64, Vec<u8>>, u64)> {
    let mut file = BufReader::new(File::open(path)?);
    let file_len = file.get_ref().metadata()?.len();
    let mut index = BTreeMap::new();
    let mut offset: u64 = 0;

    while offset + HEADER_SIZE as u64 <= file_len {
        let mut header = [0u8; HEADER_SIZE];
        file.read_exact(&mut header)?;

        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let frame_end = offset + HEADER_SIZE as u64 + length as u64;

        if length == 0 {
            return Err(corrupt(offset, "zero-length frame"));
        }
        if frame_end > file_len {
            warn!(offset, length, file_len, "incomplete final log frame");
            break;
        }

        let mut payload = vec![0u8; length as usize];
        file.read_exact(&mut payload)?;

        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            if frame_end == file_len {
                warn!(
                    offset,
                    expected = expected_crc,
                    actual = actual_crc,
                    "CRC mismatch in final log frame"
                );
                break;
            }
            return Err(corrupt(
                offset,
                format!("CRC mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"),
            ));
        }

        let record = bincode::deserialize::<LogRecord>(&payload)
            .map_err(|e| corrupt(offset, format!("undecodable record: {e}")))?;
        index.insert(record.key, record.value);

        offset = frame_end;
    }

    debug!(recovered = index.len(), valid_len = offset, "log recovery complete");
    Ok((index, offset))
}

fn corrupt(offset: u64, reason: impl Into<String>) -> StoreError {
    StoreError::Corrupt {
        offset,
        reason: reason.into(),
    }
}
