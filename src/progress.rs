// src/progress.rs

//! Per-stage progress events for resolution passes.
//!
//! The engine reports what it is working on through a [`ProgressListener`];
//! it never renders anything itself. Implementations include:
//! - `SilentProgress`: counts events, renders nothing (default)
//! - `LogProgress`: forwards events to tracing
//!
//! Listeners must be thread-safe so independent resolution passes can share
//! one listener instance.

use std::sync::atomic::{AtomicU64, Ordering};
use strum_macros::Display;
use tracing::info;

/// A resolution pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    /// Feature-pack layout resolution
    Layout,
    /// Per-pack package resolution
    Packages,
    /// Config model merging
    Configs,
    /// Feature graph building
    Features,
    /// Batch scheduling
    Schedule,
}

/// One progress observation: stage, current item, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: Stage,
    /// Human-readable identity of the item being processed
    pub item: String,
    /// 1-based position within the stage
    pub position: u64,
    /// Total item count for the stage
    pub total: u64,
}

/// Receiver of resolution progress events
pub trait ProgressListener: Send + Sync {
    /// A stage is about to process `total` items
    fn stage_started(&self, stage: Stage, total: u64);

    /// One item of a stage was processed
    fn item_processed(&self, event: &ProgressEvent);

    /// A stage finished all of its items
    fn stage_finished(&self, stage: Stage);
}

/// No-op listener that only counts what it observed
#[derive(Debug, Default)]
pub struct SilentProgress {
    stages: AtomicU64,
    items: AtomicU64,
}

impl SilentProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stages that started
    pub fn stages_started(&self) -> u64 {
        self.stages.load(Ordering::Relaxed)
    }

    /// Number of items observed across all stages
    pub fn items_observed(&self) -> u64 {
        self.items.load(Ordering::Relaxed)
    }
}

impl ProgressListener for SilentProgress {
    fn stage_started(&self, _stage: Stage, _total: u64) {
        self.stages.fetch_add(1, Ordering::Relaxed);
    }

    fn item_processed(&self, _event: &ProgressEvent) {
        self.items.fetch_add(1, Ordering::Relaxed);
    }

    fn stage_finished(&self, _stage: Stage) {}
}

/// Listener that logs progress through tracing at info level
#[derive(Debug, Default)]
pub struct LogProgress;

impl LogProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressListener for LogProgress {
    fn stage_started(&self, stage: Stage, total: u64) {
        info!(%stage, total, "stage started");
    }

    fn item_processed(&self, event: &ProgressEvent) {
        info!(
            stage = %event.stage,
            item = %event.item,
            position = event.position,
            total = event.total,
            "processed"
        );
    }

    fn stage_finished(&self, stage: Stage) {
        info!(%stage, "stage finished");
    }
}
