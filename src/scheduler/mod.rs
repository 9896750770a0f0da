// ABOUTME: Cooperative scheduler module
// ABOUTME: Per-tick jitter buffering, gap recovery, and sink submission

/// Cooperative tick scheduler and its thread handle
pub mod audio_scheduler;

pub use audio_scheduler::{SchedulerHandle, SchedulerPhase, UiScheduler};
