use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use rand::Rng;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::Config;
use crate::jobs::Job;

#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub worker_count: usize,
    pub max_attempts: u32,
    pub retry_base: Duration,
    pub singleton_ttl: Duration,
    pub stuck_after: chrono::Duration,
}

impl From<&Config> for QueueSettings {
    fn from(config: &Config) -> Self {
        Self {
            worker_count: config.worker_count.max(1),
            max_attempts: config.job_max_attempts.max(1),
            retry_base: Duration::from_millis(config.job_retry_base_ms),
            singleton_ttl: Duration::from_secs(config.job_singleton_ttl_secs),
            stuck_after: chrono::Duration::minutes(config.stuck_calculation_minutes),
        }
    }
}

/// A job plus how many times it has been attempted.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job: Job,
    pub attempt: u32,
}

/// A job that used up its attempts, kept for operator inspection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub job: Job,
    pub attempts: u32,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// In-process job queue with singleton-key dedup.
///
/// A key stays claimed from enqueue until a worker picks the job up, so rapid
/// re-triggers collapse into one pending run. Claims expire after
/// `singleton_ttl` so a lost job cannot block its key forever. Jobs are
/// sharded over workers by key, which keeps runs of one key sequential.
#[derive(Clone)]
pub struct JobQueue {
    senders: Arc<Vec<UnboundedSender<QueuedJob>>>,
    pending: Cache<String, ()>,
    outstanding: Arc<AtomicUsize>,
    dead_letters: Arc<Mutex<Vec<DeadLetter>>>,
    settings: QueueSettings,
}

impl JobQueue {
    pub fn new(settings: QueueSettings) -> (Self, Vec<UnboundedReceiver<QueuedJob>>) {
        let shards = settings.worker_count.max(1);
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..shards).map(|_| mpsc::unbounded_channel()).unzip();
        let pending = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(settings.singleton_ttl)
            .build();

        let queue = Self {
            senders: Arc::new(senders),
            pending,
            outstanding: Arc::new(AtomicUsize::new(0)),
            dead_letters: Arc::new(Mutex::new(Vec::new())),
            settings,
        };
        (queue, receivers)
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    /// Returns false when a job with the same key is already pending.
    pub async fn enqueue(&self, job: Job) -> bool {
        self.submit(QueuedJob { job, attempt: 1 }).await
    }

    async fn submit(&self, queued: QueuedJob) -> bool {
        let key = queued.job.singleton_key();
        let entry = self.pending.entry(key.clone()).or_insert(()).await;
        if !entry.is_fresh() {
            log::debug!("Job {} already pending, merged", key);
            return false;
        }

        let shard = self.shard_for(&key);
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if self.senders[shard].send(queued).is_err() {
            log::error!("Job worker {} is gone, dropping {}", shard, key);
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            self.pending.invalidate(&key).await;
            return false;
        }
        log::debug!("Enqueued {} on worker {}", key, shard);
        true
    }

    /// Called by a worker when it starts a job: later triggers queue again.
    pub async fn release(&self, job: &Job) {
        self.pending.invalidate(&job.singleton_key()).await;
    }

    /// Called by a worker once a job is finished for good.
    pub fn complete(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }

    /// Schedule another attempt after the backoff delay. The retry is dropped
    /// if a fresh trigger for the same key is already pending.
    pub fn retry(&self, queued: QueuedJob) {
        let delay = self.backoff(queued.attempt);
        let next = QueuedJob {
            job: queued.job,
            attempt: queued.attempt + 1,
        };
        let queue = self.clone();
        log::warn!(
            "Retrying {} in {:?} (attempt {} of {})",
            next.job.singleton_key(),
            delay,
            next.attempt,
            self.settings.max_attempts
        );
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.submit(next).await;
            queue.complete();
        });
    }

    pub fn dead_letter(&self, queued: QueuedJob, error: String) {
        log::error!(
            "Job {} dead-lettered after {} attempts: {}",
            queued.job.singleton_key(),
            queued.attempt,
            error
        );
        if let Ok(mut letters) = self.dead_letters.lock() {
            letters.push(DeadLetter {
                job: queued.job,
                attempts: queued.attempt,
                error,
                failed_at: Utc::now(),
            });
        }
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Wait until no job is queued, running or waiting for a retry.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.outstanding() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        true
    }

    /// `retry_base * 2^(attempt-1)` plus up to half of `retry_base` of jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.settings.retry_base.as_millis() as u64;
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = base.saturating_mul(1u64 << exponent);
        let jitter = if base > 1 {
            rand::rng().random_range(0..=base / 2)
        } else {
            0
        };
        Duration::from_millis(delay + jitter)
    }

    fn shard_for(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.senders.len() as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use crate::jobs::WorkdayOvertimeJob;

    fn settings() -> QueueSettings {
        QueueSettings {
            worker_count: 3,
            max_attempts: 3,
            retry_base: Duration::from_millis(100),
            singleton_ttl: Duration::from_secs(60),
            stuck_after: chrono::Duration::minutes(15),
        }
    }

    fn day_job(employee_id: Uuid) -> Job {
        Job::WorkdayOvertime(WorkdayOvertimeJob {
            organization_id: Uuid::nil(),
            employee_id,
            date: NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(),
        })
    }

    #[tokio::test]
    async fn duplicate_triggers_collapse_into_one_pending_job() {
        let (queue, mut receivers) = JobQueue::new(settings());
        let employee_id = Uuid::new_v4();

        assert!(queue.enqueue(day_job(employee_id)).await);
        assert!(!queue.enqueue(day_job(employee_id)).await);
        assert!(!queue.enqueue(day_job(employee_id)).await);
        assert_eq!(queue.outstanding(), 1);

        let delivered: usize = receivers
            .iter_mut()
            .map(|rx| std::iter::from_fn(|| rx.try_recv().ok()).count())
            .sum();
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn a_started_job_releases_its_key() {
        let (queue, _receivers) = JobQueue::new(settings());
        let job = day_job(Uuid::new_v4());

        assert!(queue.enqueue(job.clone()).await);
        queue.release(&job).await;
        assert!(queue.enqueue(job).await);
    }

    #[tokio::test]
    async fn different_days_are_independent() {
        let (queue, _receivers) = JobQueue::new(settings());

        assert!(queue.enqueue(day_job(Uuid::new_v4())).await);
        assert!(queue.enqueue(day_job(Uuid::new_v4())).await);
        assert_eq!(queue.outstanding(), 2);
    }

    #[test]
    fn backoff_doubles_with_bounded_jitter() {
        let (queue, _receivers) = JobQueue::new(settings());
        for attempt in 1..=4u32 {
            let delay = queue.backoff(attempt).as_millis() as u64;
            let floor = 100 * (1 << (attempt - 1));
            assert!(delay >= floor && delay <= floor + 50, "attempt {attempt}: {delay}ms");
        }
    }
}
