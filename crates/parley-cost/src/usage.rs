// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only usage log, one JSON record per line, newest last.
//!
//! Every terminal outcome of a completion call produces exactly one record.
//! Records are observability data only; nothing reads them back to make
//! decisions.

use std::path::{Path, PathBuf};

use parley_core::{ParleyError, TokenUsage};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Outcome of a completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UsageStatus {
    Success,
    Failure,
}

/// One usage log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    /// ISO 8601 timestamp.
    pub timestamp: String,
    pub model_id: String,
    pub topic: String,
    pub agent: String,
    pub status: UsageStatus,
    /// Final attempt reached, starting at 1.
    pub attempt: u32,
    pub latency_ms: u64,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub estimated_cost_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Identifies the call a usage record belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallLabels {
    pub model_id: String,
    pub topic: String,
    pub agent: String,
}

impl UsageRecord {
    pub fn success(
        labels: &CallLabels,
        attempt: u32,
        latency_ms: u64,
        usage: TokenUsage,
        estimated_cost_usd: f64,
        request_id: Option<String>,
    ) -> Self {
        Self {
            timestamp: now_timestamp(),
            model_id: labels.model_id.clone(),
            topic: labels.topic.clone(),
            agent: labels.agent.clone(),
            status: UsageStatus::Success,
            attempt,
            latency_ms,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            estimated_cost_usd,
            request_id,
            error: None,
        }
    }

    /// A failure record; token counts and cost are zero.
    pub fn failure(labels: &CallLabels, attempt: u32, latency_ms: u64, error: String) -> Self {
        Self {
            timestamp: now_timestamp(),
            model_id: labels.model_id.clone(),
            topic: labels.topic.clone(),
            agent: labels.agent.clone(),
            status: UsageStatus::Failure,
            attempt,
            latency_ms,
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            estimated_cost_usd: 0.0,
            request_id: None,
            error: Some(error),
        }
    }
}

fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// JSON lines usage log on disk.
pub struct UsageLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl UsageLog {
    /// Creates the log handle, creating parent directories if needed.
    /// The file itself is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ParleyError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(ParleyError::storage)?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record as a single line.
    pub async fn record(&self, record: &UsageRecord) -> Result<(), ParleyError> {
        let mut line = serde_json::to_string(record).map_err(ParleyError::storage)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(ParleyError::storage)?;
        file.write_all(line.as_bytes())
            .await
            .map_err(ParleyError::storage)?;
        file.flush().await.map_err(ParleyError::storage)?;

        info!(
            model = %record.model_id,
            topic = %record.topic,
            agent = %record.agent,
            status = %record.status,
            attempt = record.attempt,
            latency_ms = record.latency_ms,
            total_tokens = record.total_tokens,
            cost_usd = record.estimated_cost_usd,
            "usage recorded"
        );
        Ok(())
    }

    /// Reads every record back, oldest first. Unparseable lines are skipped.
    pub async fn read_all(&self) -> Result<Vec<UsageRecord>, ParleyError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ParleyError::storage(e)),
        };
        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "skipping malformed usage line");
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> CallLabels {
        CallLabels {
            model_id: "gpt-x".into(),
            topic: "research".into(),
            agent: "assistant".into(),
        }
    }

    #[tokio::test]
    async fn records_append_newest_last() {
        let dir = tempfile::tempdir().unwrap();
        let log = UsageLog::open(dir.path().join("logs/usage.jsonl")).unwrap();

        let usage = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        };
        log.record(&UsageRecord::success(&labels(), 1, 120, usage, 0.0, Some("req-1".into())))
            .await
            .unwrap();
        log.record(&UsageRecord::failure(&labels(), 3, 900, "timeout".into()))
            .await
            .unwrap();

        let records = log.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, UsageStatus::Success);
        assert_eq!(records[0].total_tokens, 15);
        assert_eq!(records[1].status, UsageStatus::Failure);
        assert_eq!(records[1].attempt, 3);
        assert_eq!(records[1].total_tokens, 0);
        assert_eq!(records[1].error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn lines_use_camel_case_fields() {
        let dir = tempfile::tempdir().unwrap();
        let log = UsageLog::open(dir.path().join("usage.jsonl")).unwrap();
        log.record(&UsageRecord::failure(&labels(), 1, 5, "denied".into()))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(value["modelId"], "gpt-x");
        assert_eq!(value["status"], "failure");
        assert_eq!(value["estimatedCostUsd"], 0.0);
        assert!(value.get("requestId").is_none());
    }

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = UsageLog::open(dir.path().join("none.jsonl")).unwrap();
        assert!(log.read_all().await.unwrap().is_empty());
    }
}
