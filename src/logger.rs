use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// One logged request/response pair. Created once per request, immutable,
/// appended as a single JSON line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: Uuid,
    pub ts_utc: DateTime<Utc>,
    pub status_code: u16,
    pub request: Value,
    pub response: Value,
}

impl InteractionRecord {
    pub fn new(status_code: u16, request: Value, response: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            ts_utc: Utc::now(),
            status_code,
            request,
            response,
        }
    }
}

/// Append-only per-day JSONL interaction log.
///
/// Each append opens the day's file in append mode and writes the full line
/// in one `write_all`, so concurrent requests never truncate or interleave
/// partial lines.
#[derive(Clone)]
pub struct InteractionLogger {
    dir: PathBuf,
}

impl InteractionLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Log file path for a UTC calendar date: `<dir>/llm-YYYY-MM-DD.jsonl`.
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("llm-{}.jsonl", date.format("%Y-%m-%d")))
    }

    /// Write one record, creating the log directory if absent. The explicit
    /// `Result` keeps write failure a visible, testable branch.
    pub async fn try_append(&self, record: &InteractionRecord) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(record.ts_utc.date_naive());
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        Ok(path)
    }

    /// Append a record, swallowing failures: a broken log disk must never
    /// fail or delay the caller's response. Failures go to the diagnostic
    /// log only; there are no retries.
    pub async fn append(&self, record: InteractionRecord) {
        match self.try_append(&record).await {
            Ok(path) => {
                tracing::debug!(id = %record.id, path = %path.display(), "Logged interaction");
            }
            Err(err) => {
                tracing::error!(id = %record.id, error = %err, "Failed to write interaction record");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_for_uses_utc_date() {
        let logger = InteractionLogger::new("/var/log/llm");
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(
            logger.path_for(date),
            PathBuf::from("/var/log/llm/llm-2024-01-05.jsonl")
        );
    }

    #[tokio::test]
    async fn test_append_creates_dir_and_writes_one_line_per_record() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("logs");
        let logger = InteractionLogger::new(&dir);

        let first = InteractionRecord::new(
            200,
            json!({"messages": [{"role": "user", "content": "hi"}]}),
            json!({"choices": [{"message": {"content": "hello"}}]}),
        );
        let second = InteractionRecord::new(200, json!({"test": "ping"}), json!({"message": "pong"}));

        let path = logger.try_append(&first).await.unwrap();
        logger.try_append(&second).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: InteractionRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.id, first.id);
        assert_eq!(parsed.status_code, 200);
        assert_eq!(parsed.request, first.request);
        assert_eq!(parsed.response, first.response);

        let parsed: InteractionRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.id, second.id);
    }

    #[tokio::test]
    async fn test_append_preserves_unknown_request_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let logger = InteractionLogger::new(tmp.path());

        let record = InteractionRecord::new(
            200,
            json!({"model": "qwen", "stream": false, "custom_vendor_field": {"a": [1, 2]}}),
            json!({"ok": true}),
        );
        let path = logger.try_append(&record).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["request"]["custom_vendor_field"]["a"], json!([1, 2]));
    }

    #[tokio::test]
    async fn test_try_append_surfaces_write_failure() {
        // A file where the directory should be makes create_dir_all fail.
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        tokio::fs::write(&blocker, b"not a directory").await.unwrap();

        let logger = InteractionLogger::new(&blocker);
        let record = InteractionRecord::new(200, json!({}), json!({}));
        assert!(logger.try_append(&record).await.is_err());

        // The swallowing wrapper must not panic on the same failure.
        logger.append(record).await;
    }
}
