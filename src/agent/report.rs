use serde::{Deserialize, Serialize};

use crate::agent::stats::StatsSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Success,
    Failed,
}

/// Outcome of one test case run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    pub run_id: String,
    pub status: TestStatus,
    pub completed_steps: u32,
    pub total_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub statistics: StatsSummary,
}
