//! In-memory registry of video compression jobs.
//!
//! The registry is the only shared mutable state in the service: the
//! background compressor writes to it, pollers read from it, and concurrent
//! uploads create independent entries. A job is visible from `create` until
//! the sweeper evicts it, and its terminal state is written exactly once:
//! later `complete`/`fail` calls for the same id are ignored.
//!
//! State is not persisted; a restart loses in-flight jobs and pollers see
//! `NotFound`. That is the documented contract, not a bug.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use encore_core::models::CompressionResult;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone)]
enum Job {
    Compressing {
        progress: u8,
    },
    Done {
        result: CompressionResult,
        finished_at: Instant,
    },
    Error {
        message: String,
        /// Last percentage reported before the failure, so pollers never
        /// observe progress regress at the terminal transition.
        progress: u8,
        finished_at: Instant,
    },
}

impl Job {
    fn is_terminal(&self) -> bool {
        !matches!(self, Job::Compressing { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Compressing,
    Done,
    Error,
}

/// Read-only snapshot of one job, as returned to pollers.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub status: JobStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CompressionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Concurrency-safe job table. Cheap to clone; all clones share the map.
///
/// Mutations take the write lock only for the map operation itself (no IO
/// under the lock), so jobs never block each other beyond map access.
#[derive(Clone, Default)]
pub struct JobRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh job in the `compressing`/0% state.
    pub fn create(&self) -> Uuid {
        let job_id = Uuid::new_v4();
        let mut jobs = self.inner.write().expect("job registry lock poisoned");
        jobs.insert(job_id, Job::Compressing { progress: 0 });
        tracing::info!(job_id = %job_id, "Compression job created");
        job_id
    }

    /// Advance a job's progress. Progress is monotone: a smaller value than
    /// the current one is dropped. No-op for terminal or unknown jobs.
    pub fn update_progress(&self, job_id: Uuid, percent: u8) {
        let mut jobs = self.inner.write().expect("job registry lock poisoned");
        if let Some(Job::Compressing { progress }) = jobs.get_mut(&job_id) {
            if percent > *progress {
                *progress = percent.min(100);
            }
        }
    }

    /// Transition a job to `done`. Returns false (and changes nothing) if the
    /// job is unknown or already terminal.
    pub fn complete(&self, job_id: Uuid, result: CompressionResult) -> bool {
        let mut jobs = self.inner.write().expect("job registry lock poisoned");
        let in_flight = matches!(jobs.get(&job_id), Some(job) if !job.is_terminal());
        if !in_flight {
            return false;
        }
        jobs.insert(
            job_id,
            Job::Done {
                result,
                finished_at: Instant::now(),
            },
        );
        tracing::info!(job_id = %job_id, "Compression job completed");
        true
    }

    /// Transition a job to `error`. Same first-write-wins semantics as
    /// `complete`.
    pub fn fail(&self, job_id: Uuid, message: impl Into<String>) -> bool {
        let message = message.into();
        let mut jobs = self.inner.write().expect("job registry lock poisoned");
        let progress = match jobs.get(&job_id) {
            Some(Job::Compressing { progress }) => *progress,
            _ => return false,
        };
        tracing::warn!(job_id = %job_id, error = %message, "Compression job failed");
        jobs.insert(
            job_id,
            Job::Error {
                message,
                progress,
                finished_at: Instant::now(),
            },
        );
        true
    }

    /// Snapshot of one job's current state.
    pub fn get(&self, job_id: Uuid) -> Option<JobView> {
        let jobs = self.inner.read().expect("job registry lock poisoned");
        jobs.get(&job_id).map(|job| match job {
            Job::Compressing { progress } => JobView {
                status: JobStatus::Compressing,
                progress: *progress,
                result: None,
                error: None,
            },
            Job::Done { result, .. } => JobView {
                status: JobStatus::Done,
                progress: 100,
                result: Some(result.clone()),
                error: None,
            },
            Job::Error {
                message, progress, ..
            } => JobView {
                status: JobStatus::Error,
                progress: *progress,
                result: None,
                error: Some(message.clone()),
            },
        })
    }

    /// Evict terminal jobs older than `retention`. In-flight jobs are never
    /// evicted, so an unpolled job still reaches its terminal state before
    /// becoming eligible.
    pub fn sweep(&self, retention: Duration) -> usize {
        let now = Instant::now();
        let mut jobs = self.inner.write().expect("job registry lock poisoned");
        let before = jobs.len();
        jobs.retain(|_, job| match job {
            Job::Compressing { .. } => true,
            Job::Done { finished_at, .. } | Job::Error { finished_at, .. } => {
                now.duration_since(*finished_at) < retention
            }
        });
        let evicted = before - jobs.len();
        if evicted > 0 {
            tracing::debug!(evicted = evicted, remaining = jobs.len(), "Swept job registry");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("job registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start the background eviction task. Runs for the process lifetime.
    pub fn spawn_sweeper(&self, interval: Duration, retention: Duration) {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                registry.sweep(retention);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> CompressionResult {
        CompressionResult {
            url: "http://localhost/media/out.mp4".to_string(),
            filename: "out.mp4".to_string(),
            original_size: 1000,
            compressed_size: 400,
        }
    }

    #[test]
    fn test_create_starts_at_zero() {
        let registry = JobRegistry::new();
        let job_id = registry.create();

        let view = registry.get(job_id).unwrap();
        assert_eq!(view.status, JobStatus::Compressing);
        assert_eq!(view.progress, 0);
        assert!(view.result.is_none());
        assert!(view.error.is_none());
    }

    #[test]
    fn test_unknown_job_is_none() {
        let registry = JobRegistry::new();
        assert!(registry.get(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_progress_is_monotonic() {
        let registry = JobRegistry::new();
        let job_id = registry.create();

        registry.update_progress(job_id, 40);
        registry.update_progress(job_id, 25);
        assert_eq!(registry.get(job_id).unwrap().progress, 40);

        registry.update_progress(job_id, 41);
        assert_eq!(registry.get(job_id).unwrap().progress, 41);
    }

    #[test]
    fn test_complete_is_terminal() {
        let registry = JobRegistry::new();
        let job_id = registry.create();

        assert!(registry.complete(job_id, sample_result()));
        let view = registry.get(job_id).unwrap();
        assert_eq!(view.status, JobStatus::Done);
        assert_eq!(view.progress, 100);
        assert_eq!(view.result, Some(sample_result()));

        // Terminal state is immutable: further transitions are ignored.
        assert!(!registry.fail(job_id, "late failure"));
        registry.update_progress(job_id, 10);
        assert_eq!(registry.get(job_id).unwrap(), view);
    }

    #[test]
    fn test_double_complete_keeps_first_result() {
        let registry = JobRegistry::new();
        let job_id = registry.create();

        let first = sample_result();
        let mut second = sample_result();
        second.filename = "other.mp4".to_string();

        assert!(registry.complete(job_id, first.clone()));
        assert!(!registry.complete(job_id, second));
        assert_eq!(registry.get(job_id).unwrap().result, Some(first));
    }

    #[test]
    fn test_fail_records_message() {
        let registry = JobRegistry::new();
        let job_id = registry.create();

        assert!(registry.fail(job_id, "ffmpeg exploded"));
        let view = registry.get(job_id).unwrap();
        assert_eq!(view.status, JobStatus::Error);
        assert_eq!(view.error.as_deref(), Some("ffmpeg exploded"));
        assert!(view.result.is_none());
    }

    #[test]
    fn test_fail_retains_last_progress() {
        let registry = JobRegistry::new();
        let job_id = registry.create();
        registry.update_progress(job_id, 80);

        assert!(registry.fail(job_id, "disk full"));
        let view = registry.get(job_id).unwrap();
        assert_eq!(view.status, JobStatus::Error);
        // A poller who saw 80% must not observe a regression at failure.
        assert_eq!(view.progress, 80);
    }

    #[test]
    fn test_complete_unknown_job_is_rejected() {
        let registry = JobRegistry::new();
        assert!(!registry.complete(Uuid::new_v4(), sample_result()));
        assert!(!registry.fail(Uuid::new_v4(), "nope"));
    }

    #[test]
    fn test_sweep_evicts_only_terminal_jobs() {
        let registry = JobRegistry::new();
        let running = registry.create();
        let finished = registry.create();
        registry.complete(finished, sample_result());

        // Zero retention: every terminal job is already expired.
        let evicted = registry.sweep(Duration::from_secs(0));
        assert_eq!(evicted, 1);
        assert!(registry.get(running).is_some());
        assert!(registry.get(finished).is_none());

        // Generous retention keeps fresh terminal jobs around.
        let finished = registry.create();
        registry.complete(finished, sample_result());
        assert_eq!(registry.sweep(Duration::from_secs(3600)), 0);
        assert!(registry.get(finished).is_some());
    }

    #[tokio::test]
    async fn test_concurrent_double_completion_race() {
        let registry = JobRegistry::new();
        let job_id = registry.create();

        let r1 = registry.clone();
        let r2 = registry.clone();
        let mut winner = sample_result();
        winner.filename = "winner.mp4".to_string();
        let mut loser = sample_result();
        loser.filename = "loser.mp4".to_string();

        let w = winner.clone();
        let l = loser.clone();
        let t1 = tokio::spawn(async move { r1.complete(job_id, w) });
        let t2 = tokio::spawn(async move { r2.fail(job_id, l.filename) });

        let (first, second) = (t1.await.unwrap(), t2.await.unwrap());
        // Exactly one transition wins, and the stored state matches it.
        assert!(first ^ second);
        let view = registry.get(job_id).unwrap();
        match view.status {
            JobStatus::Done => assert_eq!(view.result.unwrap().filename, "winner.mp4"),
            JobStatus::Error => assert_eq!(view.error.unwrap(), "loser.mp4"),
            JobStatus::Compressing => panic!("job must be terminal"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_creation_yields_distinct_ids() {
        let registry = JobRegistry::new();
        let mut handles = Vec::new();
        for _ in 0..32 {
            let r = registry.clone();
            handles.push(tokio::spawn(async move { r.create() }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 32);
        assert_eq!(registry.len(), 32);
    }

    #[test]
    fn test_view_serialization_shape() {
        let registry = JobRegistry::new();
        let job_id = registry.create();
        registry.update_progress(job_id, 37);

        let json = serde_json::to_value(registry.get(job_id).unwrap()).unwrap();
        assert_eq!(json["status"], "compressing");
        assert_eq!(json["progress"], 37);
        assert!(json.get("result").is_none());
        assert!(json.get("error").is_none());

        registry.complete(job_id, sample_result());
        let json = serde_json::to_value(registry.get(job_id).unwrap()).unwrap();
        assert_eq!(json["status"], "done");
        assert_eq!(json["result"]["compressedSize"], 400);
    }
}
