//! Per-run counters for vision calls, device actions and auto-navigation.
//! Counters are scoped to a single test run and reset when one starts.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct RunStats {
    query_calls: u64,
    point_calls: u64,
    reasoning_calls: u64,

    actions_performed: u64,
    successful_actions: u64,
    failed_actions: u64,

    auto_navigations: u64,

    started_at: Option<Instant>,
    duration: Option<Duration>,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_run(&mut self) {
        *self = Self {
            started_at: Some(Instant::now()),
            ..Self::default()
        };
    }

    pub fn end_run(&mut self) {
        if let Some(start) = self.started_at {
            self.duration = Some(start.elapsed());
        }
    }

    pub fn record_query_call(&mut self) {
        self.query_calls += 1;
    }

    pub fn record_point_call(&mut self) {
        self.point_calls += 1;
    }

    pub fn record_reasoning_call(&mut self) {
        self.reasoning_calls += 1;
    }

    pub fn record_action(&mut self, success: bool) {
        self.actions_performed += 1;
        if success {
            self.successful_actions += 1;
        } else {
            self.failed_actions += 1;
        }
    }

    pub fn record_navigation(&mut self) {
        self.auto_navigations += 1;
    }

    pub fn success_rate(&self) -> f64 {
        if self.actions_performed == 0 {
            return 0.0;
        }
        self.successful_actions as f64 / self.actions_performed as f64 * 100.0
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration.map(|d| d.as_secs_f64()).unwrap_or(0.0)
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            actions: ActionStats {
                total: self.actions_performed,
                successful: self.successful_actions,
                failed: self.failed_actions,
                success_rate: round2(self.success_rate()),
            },
            api_calls: ApiCallStats {
                query: self.query_calls,
                point: self.point_calls,
                reasoning: self.reasoning_calls,
                total: self.query_calls + self.point_calls,
            },
            navigation: NavigationStats {
                auto_navigations: self.auto_navigations,
            },
            timing: TimingStats {
                duration_seconds: round2(self.duration_seconds()),
            },
        }
    }

    pub fn log_summary(&self, app_name: &str) {
        tracing::info!(
            app = app_name,
            successful = self.successful_actions,
            failed = self.failed_actions,
            success_rate = format!("{:.1}%", self.success_rate()),
            api_calls = self.query_calls + self.point_calls,
            reasoning_calls = self.reasoning_calls,
            auto_navigations = self.auto_navigations,
            duration_s = format!("{:.1}", self.duration_seconds()),
            "test run complete"
        );
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSummary {
    pub actions: ActionStats,
    pub api_calls: ApiCallStats,
    pub navigation: NavigationStats,
    pub timing: TimingStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionStats {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCallStats {
    pub query: u64,
    pub point: u64,
    pub reasoning: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationStats {
    pub auto_navigations: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingStats {
    pub duration_seconds: f64,
}
