//! JSON Lines file implementation of the signal log

use super::{RawRecord, SignalSink, SignalSource, SinkError};
use crate::signal::SetupSignal;
use async_trait::async_trait;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// Signal log stored as one JSON object per line
pub struct JsonlSignalLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlSignalLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the file is non-empty and does not end in a newline
    async fn has_torn_tail(&self) -> Result<bool, SinkError> {
        let mut file = match fs::File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata().await?.len();
        if len == 0 {
            return Ok(false);
        }
        file.seek(SeekFrom::Start(len - 1)).await?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last).await?;
        Ok(last[0] != b'\n')
    }
}

#[async_trait]
impl SignalSink for JsonlSignalLog {
    async fn append(&self, signal: &SetupSignal) -> Result<u64, SinkError> {
        let _guard = self.write_lock.lock().await;

        let mut line = Vec::new();
        // Terminate a torn line from an interrupted write so it stays a
        // single malformed record instead of swallowing this one
        if self.has_torn_tail().await? {
            line.push(b'\n');
        }
        serde_json::to_writer(&mut line, signal)?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.sync_data().await?;

        Ok(file.metadata().await?.len())
    }
}

#[async_trait]
impl SignalSource for JsonlSignalLog {
    async fn read_from(&self, offset: u64, max_records: usize) -> Result<Vec<RawRecord>, SinkError> {
        let mut file = match fs::File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound && offset == 0 => return Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SinkError::OffsetBeyondEnd { offset, len: 0 })
            }
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata().await?.len();
        if offset > len {
            return Err(SinkError::OffsetBeyondEnd { offset, len });
        }

        file.seek(SeekFrom::Start(offset)).await?;
        let mut tail = Vec::with_capacity((len - offset) as usize);
        file.read_to_end(&mut tail).await?;

        let mut records = Vec::new();
        let mut start = 0usize;
        for (i, byte) in tail.iter().enumerate() {
            if records.len() >= max_records {
                break;
            }
            if *byte == b'\n' {
                records.push(RawRecord {
                    line: tail[start..i].to_vec(),
                    end_offset: offset + i as u64 + 1,
                });
                start = i + 1;
            }
        }
        // Bytes after the last newline are an incomplete write; left for later
        Ok(records)
    }
}
