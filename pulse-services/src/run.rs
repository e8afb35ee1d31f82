//! Per-tick run context and summary

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

/// Explicit per-run state handed to every stage
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub detection_window_hours: i64,
    deadline: Option<Instant>,
}

impl RunContext {
    pub fn new(detection_window_hours: i64) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            detection_window_hours,
            deadline: None,
        }
    }

    /// Stop starting new work once `budget` has elapsed
    pub fn with_deadline(mut self, budget: Duration) -> Self {
        self.deadline = Some(Instant::now() + budget);
        self
    }

    /// Oldest publication time a detection run considers
    pub fn window_start(&self) -> DateTime<Utc> {
        self.started_at - chrono::Duration::hours(self.detection_window_hours)
    }

    /// Future-dated items (clock skew between scrapers) count as inside
    pub fn in_window(&self, published_at: DateTime<Utc>) -> bool {
        published_at >= self.window_start()
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// What one tick did, printed by the CLI and logged at the end of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub stage: String,
    /// Detection: topics upserted. Generation: articles stored.
    pub processed: usize,
    /// Detection: clusters below the score threshold. Generation: rejected or already-covered topics.
    pub skipped: usize,
    pub errors: usize,
    pub items_loaded: usize,
    pub duplicates: usize,
    pub clusters: usize,
    pub fallbacks: usize,
    /// Work left undone because the deadline passed
    pub deadline_hit: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    pub fn start(ctx: &RunContext, stage: &str) -> Self {
        Self {
            run_id: ctx.run_id.clone(),
            stage: stage.to_string(),
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    /// Fold a later stage into this summary (used by `run`)
    pub fn absorb(&mut self, other: RunSummary) {
        self.stage = format!("{}+{}", self.stage, other.stage);
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.errors += other.errors;
        self.items_loaded += other.items_loaded;
        self.duplicates += other.duplicates;
        self.clusters += other.clusters;
        self.fallbacks += other.fallbacks;
        self.deadline_hit |= other.deadline_hit;
        self.finished_at = other.finished_at;
    }
}
