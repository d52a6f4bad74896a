//! File recorder for trade records

use super::{TradeRecord, TradeRecordSink};
use anyhow::Context;
use async_trait::async_trait;
use csv::WriterBuilder;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Appends each record to a JSONL file and a CSV file
pub struct FileTradeRecorder {
    jsonl_path: PathBuf,
    csv_path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTradeRecorder {
    pub fn new(jsonl_path: impl Into<PathBuf>, csv_path: impl Into<PathBuf>) -> Self {
        Self {
            jsonl_path: jsonl_path.into(),
            csv_path: csv_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn open_append(path: &Path) -> anyhow::Result<fs::File> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))
    }

    fn write_jsonl(&self, record: &TradeRecord) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(record).context("Failed to encode trade record")?;
        line.push(b'\n');
        let mut file = Self::open_append(&self.jsonl_path)?;
        file.write_all(&line)
            .context("Failed to write trade record")?;
        Ok(())
    }

    fn write_csv(&self, record: &TradeRecord) -> anyhow::Result<()> {
        let has_data = fs::metadata(&self.csv_path)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        let file = Self::open_append(&self.csv_path)?;

        let mut writer = WriterBuilder::new()
            .has_headers(!has_data)
            .from_writer(file);
        writer
            .serialize(record)
            .context("Failed to write trade CSV row")?;
        writer.flush().context("Failed to flush trade CSV writer")?;
        Ok(())
    }
}

#[async_trait]
impl TradeRecordSink for FileTradeRecorder {
    async fn record(&self, record: &TradeRecord) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_jsonl(record)?;
        self.write_csv(record)?;
        Ok(())
    }
}
