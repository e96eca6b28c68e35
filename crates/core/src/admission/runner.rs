//! Admission worker implementation.
//!
//! Once per interval, promotes up to the current admission rate of the
//! longest-waiting clients. Passes (periodic ticks and manual admissions)
//! are serialized through one lock, so two passes never read the same
//! batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::metrics::{ADMISSION_PASSES, ADMISSION_PASS_DURATION, CLIENTS_ADMITTED};
use crate::queue::{AdmissionCredential, AdmitReport, QueueService, WaitEntry};

use super::config::AdmissionConfig;
use super::types::{AdmissionError, AdmissionTrigger, WorkerStatus};

/// State shared between the worker handle and its background loop.
struct Shared {
    queue: Arc<QueueService>,
    credential_ttl: Duration,
    pass_lock: tokio::sync::Mutex<()>,
    stats: RwLock<WorkerStatus>,
}

impl Shared {
    /// Run one admission pass, recording its outcome.
    async fn admit(
        &self,
        limit: Option<u64>,
        trigger: AdmissionTrigger,
    ) -> Result<AdmitReport, AdmissionError> {
        let _pass = self.pass_lock.lock().await;
        let started = Instant::now();

        let result = self.run_pass(limit).await;

        ADMISSION_PASS_DURATION
            .with_label_values(&[trigger.as_str()])
            .observe(started.elapsed().as_secs_f64());

        let mut stats = self.stats.write().await;
        stats.passes += 1;
        stats.last_pass_at = Some(Utc::now());
        match &result {
            Ok(report) => {
                stats.promoted_total += report.promoted_count;
                stats.last_error = None;
                let outcome = if report.promoted_count > 0 {
                    "promoted"
                } else {
                    "idle"
                };
                ADMISSION_PASSES
                    .with_label_values(&[trigger.as_str(), outcome])
                    .inc();
                CLIENTS_ADMITTED
                    .with_label_values(&[trigger.as_str()])
                    .inc_by(report.promoted_count);
            }
            Err(e) => {
                stats.failed_passes += 1;
                stats.last_error = Some(e.to_string());
                ADMISSION_PASSES
                    .with_label_values(&[trigger.as_str(), "failed"])
                    .inc();
            }
        }

        result
    }

    async fn run_pass(&self, limit: Option<u64>) -> Result<AdmitReport, AdmissionError> {
        let limit = match limit {
            Some(limit) => limit,
            None => self.queue.rate_snapshot().await.rate,
        };

        let store = self.queue.store();
        let entries = self
            .queue
            .call("oldest_waiting", store.oldest_waiting(limit))
            .await?;

        if entries.is_empty() {
            debug!("No clients waiting");
            let counters = self.queue.counters().await?;
            return Ok(AdmitReport {
                promoted_count: 0,
                now_serving: counters.now_serving,
                promoted: Vec::new(),
            });
        }

        let admitted_at = Utc::now();
        let credentials: Vec<AdmissionCredential> = entries
            .iter()
            .map(|entry| AdmissionCredential::mint(entry, admitted_at, self.credential_ttl))
            .collect();

        let result = self
            .queue
            .call("promote", store.promote(&credentials, self.credential_ttl))
            .await?;

        let promoted: Vec<WaitEntry> = result
            .promoted
            .iter()
            .map(|c| WaitEntry {
                client: c.client.clone(),
                ticket: c.ticket,
            })
            .collect();

        info!(
            selected = entries.len(),
            promoted = promoted.len(),
            now_serving = result.now_serving,
            "Admitted waiting clients"
        );

        Ok(AdmitReport {
            promoted_count: promoted.len() as u64,
            now_serving: result.now_serving,
            promoted,
        })
    }
}

/// The admission worker - paces clients out of the waiting room.
pub struct AdmissionWorker {
    config: AdmissionConfig,
    shared: Arc<Shared>,

    // Runtime state
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl AdmissionWorker {
    /// Create a new worker. Nothing runs until [`start`](Self::start).
    pub fn new(config: AdmissionConfig, queue: Arc<QueueService>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let shared = Arc::new(Shared {
            queue,
            credential_ttl: config.credential_ttl(),
            pass_lock: tokio::sync::Mutex::new(()),
            stats: RwLock::new(WorkerStatus {
                interval_ms: config.interval().as_millis() as u64,
                ..Default::default()
            }),
        });

        Self {
            config,
            shared,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            loop_handle: Mutex::new(None),
        }
    }

    /// Start the periodic loop (spawns a background task).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Admission worker already running");
            return;
        }

        if self.config.interval_ms == 0 {
            warn!("Admission interval of 0 ms clamped to the minimum");
        }
        info!(
            interval_ms = self.config.interval().as_millis() as u64,
            credential_ttl_secs = self.config.credential_ttl_secs,
            "Starting admission worker"
        );

        let handle = self.spawn_admission_loop();
        match self.loop_handle.lock() {
            Ok(mut slot) => *slot = Some(handle),
            Err(_) => error!("Admission worker handle lock poisoned"),
        }
    }

    /// Stop the periodic loop.
    ///
    /// Waits for the loop to exit, so a pass that is already running
    /// completes before this returns.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Admission worker not running");
            return;
        }

        info!("Stopping admission worker");

        // Signal shutdown to the loop
        let _ = self.shutdown_tx.send(());

        let handle = self.loop_handle.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Admission loop terminated abnormally: {}", e);
            }
        }

        info!("Admission worker stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Get current worker status.
    pub async fn status(&self) -> WorkerStatus {
        let mut status = self.shared.stats.read().await.clone();
        status.running = self.is_running();
        status
    }

    /// Run one periodic-style pass now: promote up to the current rate.
    pub async fn tick(&self) -> Result<AdmitReport, AdmissionError> {
        self.shared.admit(None, AdmissionTrigger::Tick).await
    }

    /// Operator-triggered admission of up to `count` clients.
    ///
    /// Serialized with periodic ticks. `count == 0` promotes nobody.
    pub async fn admit_now(&self, count: u64) -> Result<AdmitReport, AdmissionError> {
        if count == 0 {
            let counters = self.shared.queue.counters().await?;
            return Ok(AdmitReport {
                now_serving: counters.now_serving,
                ..Default::default()
            });
        }
        info!(count, "Manual admission requested");
        self.shared.admit(Some(count), AdmissionTrigger::Manual).await
    }

    /// Spawn the admission loop task.
    fn spawn_admission_loop(&self) -> JoinHandle<()> {
        let running = Arc::clone(&self.running);
        let shared = Arc::clone(&self.shared);
        let period = self.config.interval();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Admission loop started");
            let mut ticker = tokio::time::interval(period);
            // An overrunning pass delays the next one; ticks are never stacked.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Admission loop received shutdown signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        if let Err(e) = shared.admit(None, AdmissionTrigger::Tick).await {
                            warn!("Admission tick abandoned: {}", e);
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{MemoryQueueStore, QueueSettings, QueueStore};

    fn worker(interval_ms: u64) -> (Arc<MemoryQueueStore>, Arc<QueueService>, AdmissionWorker) {
        let store = Arc::new(MemoryQueueStore::new());
        let queue = Arc::new(QueueService::new(
            Arc::clone(&store) as Arc<dyn QueueStore>,
            QueueSettings::default(),
        ));
        let config = AdmissionConfig {
            enabled: true,
            interval_ms,
            credential_ttl_secs: 60,
        };
        let worker = AdmissionWorker::new(config, Arc::clone(&queue));
        (store, queue, worker)
    }

    #[tokio::test]
    async fn test_tick_on_empty_queue_is_noop() {
        let (_store, _queue, worker) = worker(1000);
        let report = worker.tick().await.unwrap();
        assert_eq!(report.promoted_count, 0);
        assert_eq!(report.now_serving, 0);

        let status = worker.status().await;
        assert_eq!(status.passes, 1);
        assert_eq!(status.promoted_total, 0);
    }

    #[tokio::test]
    async fn test_admit_now_zero() {
        let (_store, queue, worker) = worker(1000);
        queue.join("u1").await.unwrap();

        let report = worker.admit_now(0).await.unwrap();
        assert_eq!(report.promoted_count, 0);
        assert_eq!(queue.counters().await.unwrap().waiting, 1);
    }

    #[tokio::test]
    async fn test_admit_now_respects_count() {
        let (_store, queue, worker) = worker(1000);
        for i in 1..=5 {
            queue.join(&format!("u{}", i)).await.unwrap();
        }

        let report = worker.admit_now(3).await.unwrap();
        assert_eq!(report.promoted_count, 3);
        assert_eq!(report.now_serving, 3);
        let tickets: Vec<u64> = report.promoted.iter().map(|e| e.ticket.value()).collect();
        assert_eq!(tickets, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_start_stop() {
        let (_store, _queue, worker) = worker(20);
        assert!(!worker.is_running());

        worker.start().await;
        assert!(worker.is_running());
        assert!(worker.status().await.running);

        worker.stop().await;
        assert!(!worker.is_running());
        assert!(!worker.status().await.running);
    }

    #[tokio::test]
    async fn test_zero_interval_does_not_panic() {
        let (_store, queue, worker) = worker(0);
        queue.join("u1").await.unwrap();
        assert_eq!(worker.status().await.interval_ms, 1);

        worker.start().await;
        for _ in 0..100 {
            if queue.counters().await.unwrap().waiting == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        worker.stop().await;

        assert_eq!(queue.counters().await.unwrap().now_serving, 1);
    }

    #[tokio::test]
    async fn test_loop_admits_in_background() {
        let (_store, queue, worker) = worker(20);
        for i in 1..=3 {
            queue.join(&format!("u{}", i)).await.unwrap();
        }

        worker.start().await;
        for _ in 0..100 {
            if queue.counters().await.unwrap().waiting == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        worker.stop().await;

        let counters = queue.counters().await.unwrap();
        assert_eq!(counters.waiting, 0);
        assert_eq!(counters.now_serving, 3);
        assert_eq!(worker.status().await.promoted_total, 3);
    }
}
