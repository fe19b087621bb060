use std::io;
use std::path::{Path, PathBuf};

use csv_async::{AsyncDeserializer, AsyncWriterBuilder};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FeedbackLabel {
    #[serde(rename = "Good", alias = "good")]
    Good,
    #[serde(rename = "Not Clear", alias = "not_clear")]
    NotClear,
}

impl FeedbackLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackLabel::Good => "Good",
            FeedbackLabel::NotClear => "Not Clear",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub input_text: String,
    #[serde(rename = "feedback")]
    pub label: FeedbackLabel,
    #[serde(rename = "CES")]
    pub effort_score: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("feedback log I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("feedback log is not valid CSV: {0}")]
    Csv(#[from] csv_async::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub records: usize,
    pub good: usize,
    pub not_clear: usize,
    pub mean_effort: f64,
}

impl FeedbackSummary {
    pub fn from_records(records: &[FeedbackRecord]) -> Self {
        let good = records
            .iter()
            .filter(|record| record.label == FeedbackLabel::Good)
            .count();
        let total_effort: u64 = records.iter().map(|record| record.effort_score).sum();
        let mean_effort = if records.is_empty() {
            0.0
        } else {
            total_effort as f64 / records.len() as f64
        };
        Self {
            records: records.len(),
            good,
            not_clear: records.len() - good,
            mean_effort,
        }
    }
}

#[derive(Debug)]
pub struct FeedbackSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FeedbackSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, record: &FeedbackRecord) -> Result<(), FeedbackError> {
        let _guard = self.lock.lock().await;

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
        let start_len = file.metadata().await?.len();
        let with_header = start_len == 0;
        let row = encode_row(record, with_header).await?;

        if let Err(error) = write_row(&mut file, &row).await {
            discard_partial_row(&mut file, start_len, &self.path).await;
            return Err(error.into());
        }

        debug!(
            path = %self.path.display(),
            label = record.label.as_str(),
            effort_score = record.effort_score,
            with_header,
            "feedback row appended"
        );
        Ok(())
    }

    pub async fn records(&self) -> Result<Vec<FeedbackRecord>, FeedbackError> {
        let _guard = self.lock.lock().await;

        let file = match fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        let mut reader = AsyncDeserializer::from_reader(file);
        let mut rows = reader.deserialize::<FeedbackRecord>();
        let mut records = Vec::new();
        while let Some(row) = rows.next().await {
            records.push(row?);
        }
        Ok(records)
    }

    pub async fn summary(&self) -> Result<FeedbackSummary, FeedbackError> {
        let records = self.records().await?;
        Ok(FeedbackSummary::from_records(&records))
    }
}

async fn write_row(file: &mut fs::File, row: &[u8]) -> io::Result<()> {
    file.write_all(row).await?;
    file.flush().await?;
    file.sync_data().await
}

// A torn row would be glued to the next append and poison every later read.
async fn discard_partial_row(file: &mut fs::File, len: u64, path: &Path) {
    if let Err(error) = file.set_len(len).await {
        warn!(
            path = %path.display(),
            "failed to roll back partial feedback row: {error}"
        );
    }
}

async fn encode_row(record: &FeedbackRecord, with_header: bool) -> Result<Vec<u8>, FeedbackError> {
    let mut buffer = Vec::new();
    {
        let mut serializer = AsyncWriterBuilder::new()
            .has_headers(with_header)
            .create_serializer(&mut buffer);
        serializer.serialize(record).await?;
        serializer.flush().await?;
    }
    Ok(buffer)
}
