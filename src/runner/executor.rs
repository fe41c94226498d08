//! Task execution with failure isolation.
//!
//! Tasks run on a dedicated rayon pool sized to the configured worker count, which
//! also caps how hard upstream servers are hit. Each fetch gets its own watchdog
//! thread so a hung fetch turns into a `Timeout` record instead of a hung run.
//! Whatever happens inside one task, every task yields exactly one record.
//!
//! The watchdog deadline is never shorter than the adapter's request budget, so
//! per-request HTTP timeouts fire first and a fetch thread normally finishes
//! before its worker moves on.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use log::{info, warn};
use rayon::prelude::*;

use crate::data::{AdapterRegistry, SourceAdapter};
use crate::domain::{ProductTask, Record, Series};
use crate::error::{AppError, FailureKind, FetchFailure};
use crate::series::{derive, normalize};

/// Slack on top of an adapter's request budget before the watchdog gives up.
pub const DEADLINE_GRACE: Duration = Duration::from_secs(1);

/// Fetch threads are named once; product ids may hold bytes a thread name cannot.
const FETCH_THREAD_NAME: &str = "navsync-fetch";

/// Runs tasks against the adapters in a registry.
pub struct Runner<'a> {
    registry: &'a AdapterRegistry,
    workers: usize,
    task_timeout: Duration,
}

impl<'a> Runner<'a> {
    pub fn new(registry: &'a AdapterRegistry, workers: usize, task_timeout: Duration) -> Self {
        Self {
            registry,
            workers: workers.max(1),
            task_timeout,
        }
    }

    /// One record per task, in task order.
    pub fn run(&self, tasks: &[ProductTask]) -> Result<Vec<Record>, AppError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|idx| format!("navsync-worker-{idx}"))
            .build()
            .map_err(|e| AppError::new(2, format!("Failed to start worker pool: {e}")))?;

        info!(
            "Running {} task(s) on {} worker(s), {}s deadline each",
            tasks.len(),
            self.workers,
            self.task_timeout.as_secs()
        );

        Ok(pool.install(|| tasks.par_iter().map(|task| self.run_task(task)).collect()))
    }

    /// Fetch, normalize and derive one task. Never fails.
    pub fn run_task(&self, task: &ProductTask) -> Record {
        let Some(adapter) = self.registry.get(task.source) else {
            warn!("{} {}: no adapter registered", task.source, task.product_id);
            return Record::failed(task, FailureKind::Upstream);
        };

        let deadline = self.deadline_for(adapter.as_ref());
        let series = match fetch_with_deadline(adapter, &task.product_id, deadline) {
            Ok(series) => series,
            Err(e) => {
                warn!("{} {}: {e}", task.source, task.product_id);
                return Record::failed(task, e.kind());
            }
        };

        match normalize([series]) {
            Ok(series) => derive(task, &series),
            Err(e) => {
                info!("{} {}: {e}", task.source, task.product_id);
                derive(task, &Series::default())
            }
        }
    }

    /// The configured task timeout, stretched to cover the adapter's own requests.
    pub fn deadline_for(&self, adapter: &dyn SourceAdapter) -> Duration {
        self.task_timeout.max(adapter.request_budget() + DEADLINE_GRACE)
    }
}

/// Run `adapter.fetch` on its own thread and wait at most `timeout`.
///
/// A fetch that misses the deadline is abandoned, not cancelled; its result is
/// dropped when it eventually finishes. An adapter that panics shows up as a
/// closed channel.
pub fn fetch_with_deadline(
    adapter: Arc<dyn SourceAdapter>,
    product_id: &str,
    timeout: Duration,
) -> Result<Series, FetchFailure> {
    let (tx, rx) = mpsc::channel();
    let id = product_id.to_string();

    thread::Builder::new()
        .name(FETCH_THREAD_NAME.to_string())
        .spawn(move || {
            // The receiver is gone if the deadline already passed.
            let _ = tx.send(adapter.fetch(&id));
        })
        .map_err(|e| FetchFailure::Transport(format!("failed to spawn fetch thread: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(FetchFailure::Timeout(format!(
            "no result within {:.1}s",
            timeout.as_secs_f64()
        ))),
        Err(RecvTimeoutError::Disconnected) => Err(FetchFailure::Upstream(
            "adapter stopped without a result".to_string(),
        )),
    }
}
