use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::errors::TapSightResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: i64,
    pub step: String,
    pub action: Option<serde_json::Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Append-only JSONL log of step outcomes for one test run.
pub struct RunHistory {
    pub run_id: String,
    entries: Vec<HistoryEntry>,
    file_path: std::path::PathBuf,
}

impl RunHistory {
    pub fn new() -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        let dir = runs_dir_or_cwd();
        let file_path = dir.join(format!("run_{run_id}.jsonl"));
        Self {
            run_id,
            entries: Vec::new(),
            file_path,
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Append the latest entry to the JSONL file.
    pub fn flush(&self) -> TapSightResult<()> {
        if let Some(last) = self.entries.last() {
            let line = serde_json::to_string(last)?;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.file_path)?;
            writeln!(file, "{}", line)?;
            tracing::debug!(path = %self.file_path.display(), "history entry flushed");
        }
        Ok(())
    }
}

impl Default for RunHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// `~/.local/share/tapsight/runs` (platform equivalent via `dirs`),
/// falling back to the current working directory.
fn runs_dir_or_cwd() -> std::path::PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        let d = data_dir.join("tapsight").join("runs");
        let _ = std::fs::create_dir_all(&d);
        return d;
    }
    std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."))
}
