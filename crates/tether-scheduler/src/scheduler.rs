use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::lock::SkipLock;
use crate::task::{ScheduledTask, TaskHandler, TaskKind};

const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Result of firing a task once.
#[derive(Debug)]
pub enum TickOutcome {
    /// The handler was spawned; the handle completes when the run ends.
    Started(JoinHandle<()>),
    /// A previous run still held the task's lock.
    Skipped,
}

#[derive(Debug, Default)]
struct TaskStats {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStatsSnapshot {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

struct TaskSlot {
    task: ScheduledTask,
    handler: Arc<dyn TaskHandler>,
    lock: SkipLock,
    stats: TaskStats,
}

pub struct Scheduler {
    tasks: Vec<ScheduledTask>,
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
    slots: HashMap<String, Arc<TaskSlot>>,
    shutdown_rx: watch::Receiver<bool>,
    run_on_start: bool,
    shutdown_grace: Duration,
}

impl Scheduler {
    #[must_use]
    pub fn new(shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            tasks: Vec::new(),
            handlers: HashMap::new(),
            slots: HashMap::new(),
            shutdown_rx,
            run_on_start: false,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Fire every task immediately when [`run`](Self::run) starts instead of
    /// after its first interval.
    #[must_use]
    pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }

    /// How long [`run`](Self::run) waits for in-flight handlers after shutdown.
    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn add_task(&mut self, task: ScheduledTask) {
        self.tasks.push(task);
    }

    pub fn register_handler(&mut self, kind: &TaskKind, handler: Box<dyn TaskHandler>) {
        self.handlers
            .insert(kind.as_str().to_owned(), Arc::from(handler));
    }

    /// Bind each task to its handler and give it a fresh skip lock.
    ///
    /// Tasks without a registered handler are not scheduled.
    pub fn init(&mut self) {
        self.slots.clear();
        for task in &self.tasks {
            let Some(handler) = self.handlers.get(task.kind.as_str()) else {
                tracing::warn!(task = %task.name, kind = task.kind.as_str(), "no handler registered");
                continue;
            };
            if self.slots.contains_key(&task.name) {
                tracing::warn!(task = %task.name, "duplicate task name, keeping the first");
                continue;
            }
            self.slots.insert(
                task.name.clone(),
                Arc::new(TaskSlot {
                    task: task.clone(),
                    handler: Arc::clone(handler),
                    lock: SkipLock::new(),
                    stats: TaskStats::default(),
                }),
            );
        }
    }

    /// Run a task once through its skip lock, outside the regular cadence.
    ///
    /// Returns `None` if no initialized task has this name.
    pub fn trigger(&self, name: &str) -> Option<TickOutcome> {
        self.slots.get(name).map(fire)
    }

    #[must_use]
    pub fn stats(&self, name: &str) -> Option<TaskStatsSnapshot> {
        self.slots.get(name).map(|slot| TaskStatsSnapshot {
            started: slot.stats.started.load(Ordering::Relaxed),
            succeeded: slot.stats.succeeded.load(Ordering::Relaxed),
            failed: slot.stats.failed.load(Ordering::Relaxed),
            skipped: slot.stats.skipped.load(Ordering::Relaxed),
        })
    }

    /// Drive every task on its own interval until shutdown is signalled, then
    /// give in-flight runs the configured grace period to finish.
    pub async fn run(&self) {
        if self.slots.is_empty() {
            tracing::warn!("scheduler has no tasks, waiting for shutdown");
            wait_for_shutdown(self.shutdown_rx.clone()).await;
            return;
        }

        let drivers: Vec<_> = self
            .slots
            .values()
            .map(|slot| {
                tracing::info!(
                    task = %slot.task.name,
                    kind = slot.task.kind.as_str(),
                    interval_secs = slot.task.interval.as_secs(),
                    "scheduling task"
                );
                tokio::spawn(drive(
                    Arc::clone(slot),
                    self.run_on_start,
                    self.shutdown_rx.clone(),
                ))
            })
            .collect();

        let mut in_flight = Vec::new();
        for driver in drivers {
            match driver.await {
                Ok(Some(handle)) => in_flight.push(handle),
                Ok(None) => {}
                Err(e) => tracing::error!("task driver failed: {e}"),
            }
        }

        if in_flight.is_empty() {
            tracing::info!("scheduler stopped");
            return;
        }

        tracing::info!(
            running = in_flight.len(),
            grace_secs = self.shutdown_grace.as_secs(),
            "waiting for in-flight tasks"
        );
        let aborts: Vec<_> = in_flight.iter().map(JoinHandle::abort_handle).collect();
        let drained = tokio::time::timeout(self.shutdown_grace, async move {
            for handle in in_flight {
                let _ = handle.await;
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!("shutdown grace period elapsed, abandoning in-flight tasks");
            for abort in aborts {
                abort.abort();
            }
        }
        tracing::info!("scheduler stopped");
    }
}

async fn wait_for_shutdown(mut shutdown_rx: watch::Receiver<bool>) {
    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }
}

/// Ticker loop for one task. Returns the handle of a run still in progress
/// when shutdown arrives.
async fn drive(
    slot: Arc<TaskSlot>,
    run_on_start: bool,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Option<JoinHandle<()>> {
    let period = slot.task.interval;
    let start = if run_on_start {
        Instant::now()
    } else {
        Instant::now() + period
    };
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut current: Option<JoinHandle<()>> = None;
    if *shutdown_rx.borrow() {
        return None;
    }
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let TickOutcome::Started(handle) = fire(&slot) {
                    current = Some(handle);
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::debug!(task = %slot.task.name, "ticker stopping");
                    break;
                }
            }
        }
    }
    current.filter(|handle| !handle.is_finished())
}

fn fire(slot: &Arc<TaskSlot>) -> TickOutcome {
    let Some(guard) = slot.lock.try_acquire() else {
        slot.stats.skipped.fetch_add(1, Ordering::Relaxed);
        tracing::info!(task = %slot.task.name, "previous run still in progress, skipping tick");
        return TickOutcome::Skipped;
    };
    slot.stats.started.fetch_add(1, Ordering::Relaxed);

    let slot = Arc::clone(slot);
    TickOutcome::Started(tokio::spawn(async move {
        let _guard = guard;
        tracing::info!(task = %slot.task.name, kind = slot.task.kind.as_str(), "executing task");

        let handler = Arc::clone(&slot.handler);
        let result = tokio::spawn(async move { handler.execute().await }).await;
        match result {
            Ok(Ok(())) => {
                slot.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(task = %slot.task.name, "task finished");
            }
            Ok(Err(e)) => {
                slot.stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(task = %slot.task.name, "task execution failed: {e}");
            }
            Err(e) => {
                slot.stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(task = %slot.task.name, "task panicked: {e}");
            }
        }
    }))
}
