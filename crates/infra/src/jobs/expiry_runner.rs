use std::io;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use brewery_events::{EventBus, EventEnvelope};
use brewery_inventory::{LossId, LossRecord, StockEvent};

use super::expiry_sweep::{ExpirySweep, SweepError, SweepReport};
use crate::catalog::CatalogLookup;
use crate::record_store::RecordStore;
use crate::stock_store::StockStore;

/// Something that can sweep expired stock for a date.
pub trait SweepJob: Send + Sync + 'static {
    fn run(&self, reference_date: NaiveDate) -> Result<SweepReport, SweepError>;
}

impl<S, C, B, L> SweepJob for ExpirySweep<S, C, B, L>
where
    S: StockStore + 'static,
    C: CatalogLookup + 'static,
    B: EventBus<EventEnvelope<StockEvent>> + 'static,
    L: RecordStore<LossId, LossRecord> + 'static,
{
    fn run(&self, reference_date: NaiveDate) -> Result<SweepReport, SweepError> {
        ExpirySweep::run(self, reference_date)
    }
}

/// Destination for sweep reports (alerting, dashboards, audit).
pub trait SweepReportSink: Send + Sync + 'static {
    fn emit(&self, report: SweepReport);
}

/// In-memory sink for tests/dev.
#[derive(Debug, Default)]
pub struct InMemorySweepReportSink {
    inner: Mutex<Vec<SweepReport>>,
}

impl InMemorySweepReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<SweepReport> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SweepReportSink for InMemorySweepReportSink {
    fn emit(&self, report: SweepReport) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(report);
    }
}

/// Longest schedule `spawn` accepts.
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 24 * 3600);

/// Config for the scheduled expiry sweep.
#[derive(Debug, Clone)]
pub struct ExpirySweepRunner {
    pub interval: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for ExpirySweepRunner {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            max_retries: 5,
            base_backoff: Duration::from_millis(250),
        }
    }
}

/// Handle for the running sweep thread (shutdown + trigger hook).
#[derive(Debug)]
pub struct ExpirySweepRunnerHandle {
    shutdown: mpsc::Sender<()>,
    trigger: mpsc::SyncSender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl ExpirySweepRunnerHandle {
    /// Request an out-of-schedule sweep. Coalesced with any sweep already pending.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    /// Stop the runner and wait for the thread to exit.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl ExpirySweepRunner {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the runner thread.
    ///
    /// - Schedule: once on startup, then every `interval`, for today's UTC date
    /// - Trigger: `handle.trigger()`
    /// - Failures: logged and retried with bounded exponential backoff; never propagate
    ///
    /// Fails with `InvalidInput` unless `0 < interval <= MAX_SWEEP_INTERVAL`.
    pub fn spawn<J, K>(
        &self,
        name: &'static str,
        job: Arc<J>,
        sink: Arc<K>,
    ) -> io::Result<ExpirySweepRunnerHandle>
    where
        J: SweepJob,
        K: SweepReportSink,
    {
        if self.interval.is_zero() || self.interval > MAX_SWEEP_INTERVAL {
            warn!(
                runner = name,
                interval_secs = self.interval.as_secs(),
                "refusing to start expiry sweep runner"
            );
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "sweep interval must be non-zero and at most {}s, got {:?}",
                    MAX_SWEEP_INTERVAL.as_secs(),
                    self.interval
                ),
            ));
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (trigger_tx, trigger_rx) = mpsc::sync_channel::<()>(1);

        let cfg = self.clone();
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || runner_loop(name, cfg, shutdown_rx, trigger_rx, job, sink))?;

        Ok(ExpirySweepRunnerHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            join: Some(join),
        })
    }
}

fn runner_loop<J, K>(
    name: &'static str,
    cfg: ExpirySweepRunner,
    shutdown_rx: mpsc::Receiver<()>,
    trigger_rx: mpsc::Receiver<()>,
    job: Arc<J>,
    sink: Arc<K>,
) where
    J: SweepJob,
    K: SweepReportSink,
{
    info!(runner = name, interval_secs = cfg.interval.as_secs(), "expiry sweep runner started");

    let mut next_tick = Instant::now() + cfg.interval;
    let mut pending = true; // sweep once on startup
    let mut failures: u32 = 0;
    let mut backoff_until: Option<Instant> = None;

    loop {
        // Shutdown has priority.
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let now = Instant::now();
        if now >= next_tick {
            pending = true;
            while next_tick <= now {
                next_tick += cfg.interval;
            }
        }

        while trigger_rx.try_recv().is_ok() {
            pending = true;
        }

        if let Some(until) = backoff_until {
            if Instant::now() < until {
                thread::sleep(Duration::from_millis(10));
                continue;
            }
            backoff_until = None;
        }

        if !pending {
            let sleep_for = next_tick
                .saturating_duration_since(Instant::now())
                .min(Duration::from_millis(50));
            thread::sleep(sleep_for);
            continue;
        }

        pending = false;

        let today = Utc::now().date_naive();
        match job.run(today) {
            Ok(report) => {
                failures = 0;
                sink.emit(report);
            }
            Err(e) => {
                failures += 1;
                warn!(runner = name, date = %today, attempt = failures, error = ?e, "expiry sweep failed");
                if failures <= cfg.max_retries {
                    pending = true;
                    backoff_until = Some(Instant::now() + backoff(cfg.base_backoff, failures));
                } else {
                    failures = 0;
                }
            }
        }
    }

    info!(runner = name, "expiry sweep runner stopped");
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    // base * 2^(attempt-1), capped at 10s.
    let pow = 1u32 << attempt.saturating_sub(1).min(10);
    let ms = base.as_millis().saturating_mul(pow as u128);
    Duration::from_millis(ms.min(10_000) as u64)
}
