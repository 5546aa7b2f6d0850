//! The task scheduler: timers, reconciliation and next-fire computation.
//!
//! Per task the lifecycle is `unscheduled -> armed -> fired ->
//! rescheduled (wildcards present) | deleted (one-shot)`. The scheduler
//! keeps an in-memory mirror of armed timers keyed by task identity;
//! [`TaskScheduler::sync_tasks`] reconciles that mirror against the store
//! and is serialized against itself — two concurrent syncs could race the
//! cancel/re-arm pair and leave two live timers for one task. All timer
//! mutations for a key happen under the mirror lock, so a task never has
//! more than one live timer.

use super::store::TaskStore;
use super::task::{ScheduledTask, TaskKey};
use crate::error::Result;
use crate::temporal::{Amount, FILL_ORDER, ShiftUnit, TimeExpr, WallClock};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Longest single timer the scheduler arms, mirroring the 32-bit
/// millisecond range of the original platform's timers. Longer delays are
/// sliced: a timer for `MAX_TIMER_MS - TIMER_MARGIN_MS` fires and
/// re-enters scheduling, which also re-evaluates drifted clocks.
pub const MAX_TIMER_MS: i64 = i32::MAX as i64;

const TIMER_MARGIN_MS: i64 = 60_000;

/// Handler invoked when a task of its kind fires.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Execute the task. Errors are logged and swallowed by the
    /// scheduler; they never block the lifecycle step that follows.
    async fn handle(&self, task: &ScheduledTask) -> Result<()>;
}

/// An armed task in the in-memory mirror.
struct ArmedTask {
    task: ScheduledTask,
    timer: JoinHandle<()>,
}

struct SchedulerInner {
    store: Arc<dyn TaskStore>,
    handlers: RwLock<HashMap<String, Arc<dyn TaskHandler>>>,
    armed: Mutex<HashMap<TaskKey, ArmedTask>>,
    /// Serializes sync_tasks against itself.
    sync_lock: Mutex<()>,
}

/// Handle for stopping the scheduler loop.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SchedulerHandle {
    /// Signal the scheduler loop to stop.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Scheduler over a task store.
#[derive(Clone)]
pub struct TaskScheduler {
    inner: Arc<SchedulerInner>,
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler").finish_non_exhaustive()
    }
}

impl TaskScheduler {
    /// Create a scheduler over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                handlers: RwLock::new(HashMap::new()),
                armed: Mutex::new(HashMap::new()),
                sync_lock: Mutex::new(()),
            }),
        }
    }

    /// Register the handler for a task kind.
    pub async fn register_handler(&self, kind: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        self.inner.handlers.write().await.insert(kind.into(), handler);
    }

    /// Persist a task and arm its timer.
    pub async fn submit(&self, task: ScheduledTask) -> Result<()> {
        self.inner.store.insert(&task).await?;
        self.schedule_task(task).await
    }

    /// Arm (or re-arm) the timer for a task.
    ///
    /// A non-positive delay means the task is already due or overdue —
    /// it is deleted rather than fired, which self-heals schedules left
    /// behind by downtime.
    pub async fn schedule_task(&self, task: ScheduledTask) -> Result<()> {
        let mut armed = self.inner.armed.lock().await;
        self.arm_locked(&mut armed, task).await
    }

    fn arm_locked<'a>(
        &'a self,
        armed: &'a mut HashMap<TaskKey, ArmedTask>,
        task: ScheduledTask,
    ) -> std::pin::Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let key = task.key();
            if let Some(existing) = armed.remove(&key) {
                existing.timer.abort();
            }

            let delay = next_fire_delay_ms(
                &task.time,
                WallClock::now_local(),
                WallClock::local_offset_minutes(),
            );
            if delay <= 0 {
                info!(task = %key, delay, "task due in the past, deleting");
                self.inner.store.delete(&key).await?;
                return Ok(());
            }

            let chained = delay > MAX_TIMER_MS - TIMER_MARGIN_MS;
            let sleep_ms = if chained {
                MAX_TIMER_MS - TIMER_MARGIN_MS
            } else {
                delay
            };
            debug!(task = %key, delay, chained, "arming timer");

            let scheduler = self.clone();
            let timer_task = task.clone();
            let timer = tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(sleep_ms.unsigned_abs())).await;
                if chained {
                    // Not due yet: re-enter scheduling with the remaining
                    // delay instead of executing.
                    if let Err(e) = scheduler.schedule_task(timer_task).await {
                        error!(error = %e, "chained reschedule failed");
                    }
                } else {
                    scheduler.execute_task(timer_task).await;
                }
            });

            armed.insert(key, ArmedTask { task, timer });
            Ok(())
        })
    }

    /// Run a due task, then reschedule (recurring) or delete (one-shot).
    ///
    /// Handler failures — including the task's target no longer existing
    /// — are logged and swallowed; the lifecycle step still completes.
    pub async fn execute_task(&self, task: ScheduledTask) {
        let key = task.key();
        let handler = self.inner.handlers.read().await.get(&task.kind).cloned();
        match handler {
            Some(handler) => {
                if let Err(e) = handler.handle(&task).await {
                    warn!(task = %key, error = %e, "task handler failed");
                }
            }
            None => warn!(task = %key, kind = %task.kind, "no handler registered"),
        }

        if task.time.has_wildcard() {
            if let Err(e) = self.schedule_task(task).await {
                error!(task = %key, error = %e, "reschedule failed");
            }
        } else if let Err(e) = self.delete_task(&key).await {
            error!(task = %key, error = %e, "delete after fire failed");
        }
    }

    /// Delete a task, cancelling its timer in the same operation.
    pub async fn delete_task(&self, key: &TaskKey) -> Result<()> {
        let mut armed = self.inner.armed.lock().await;
        if let Some(existing) = armed.remove(key) {
            existing.timer.abort();
        }
        self.inner.store.delete(key).await?;
        debug!(task = %key, "task deleted");
        Ok(())
    }

    /// Reconcile the store against the in-memory mirror.
    ///
    /// New tasks are armed, tasks whose scheduling fields changed are
    /// cancelled and re-armed, and mirror entries with no persisted
    /// counterpart are cancelled and dropped. Never runs concurrently
    /// with itself.
    pub async fn sync_tasks(&self) -> Result<()> {
        let _sync = self.inner.sync_lock.lock().await;

        let persisted = self.inner.store.list().await?;
        let mut armed = self.inner.armed.lock().await;

        let live: HashSet<TaskKey> = persisted.iter().map(ScheduledTask::key).collect();
        let stale: Vec<TaskKey> = armed
            .keys()
            .filter(|key| !live.contains(*key))
            .cloned()
            .collect();
        for key in stale {
            if let Some(entry) = armed.remove(&key) {
                entry.timer.abort();
                debug!(task = %key, "dropped task no longer in store");
            }
        }

        for task in persisted {
            let unchanged = armed
                .get(&task.key())
                .is_some_and(|entry| entry.task.schedule_eq(&task));
            if !unchanged {
                self.arm_locked(&mut armed, task).await?;
            }
        }
        Ok(())
    }

    /// Number of live timers in the mirror.
    pub async fn armed_count(&self) -> usize {
        self.inner.armed.lock().await.len()
    }

    /// Whether a timer is armed for the given key.
    pub async fn is_armed(&self, key: &TaskKey) -> bool {
        self.inner.armed.lock().await.contains_key(key)
    }

    /// Start the periodic reconciliation loop.
    ///
    /// Returns a handle that stops the loop. Timers already armed keep
    /// running until the scheduler itself is dropped.
    pub fn start(&self, check_interval: Duration) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let handle = SchedulerHandle { shutdown_tx };
        let scheduler = self.clone();

        tokio::spawn(async move {
            info!("task scheduler started");
            loop {
                tokio::select! {
                    () = tokio::time::sleep(check_interval) => {
                        if let Err(e) = scheduler.sync_tasks().await {
                            error!(error = %e, "task sync failed");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("task scheduler shutting down");
                        break;
                    }
                }
            }
        });

        handle
    }
}

/// Milliseconds until `expr` next fires, measured from `now`.
///
/// May be negative ("due now, delete"). Deliberately calendar-naive: the
/// walk manipulates flat wall-clock fields with a fixed min/max table, so
/// month-length and DST anomalies follow the documented rollover rules
/// rather than civil-time arithmetic.
#[must_use]
pub fn next_fire_delay_ms(expr: &TimeExpr, now: WallClock, local_offset_minutes: i64) -> i64 {
    let fields = expr.effective_fields();
    let get = |unit: ShiftUnit| fields.iter().find(|f| f.unit == unit).map(|f| f.amount);

    // Remap into the expression's timezone: local wall to UTC, UTC to the
    // target zone's wall-clock-equivalent ticks.
    let now = match get(ShiftUnit::Timezone).and_then(Amount::value) {
        Some(target_offset) => now.shifted_minutes(target_offset - local_offset_minutes),
        None => now,
    };
    let mut proposed = now;

    let weekday_target = get(ShiftUnit::DayOfWeek).and_then(Amount::value);

    // Concrete fields pin the proposal; wildcard or unset fields start at
    // now's value and may be bumped below. Days defer to the weekday
    // bump when a weekday is named.
    let mut bumpable: Vec<ShiftUnit> = Vec::new();
    for unit in FILL_ORDER {
        if unit == ShiftUnit::Days && weekday_target.is_some() {
            bumpable.push(unit);
            continue;
        }
        match get(unit) {
            Some(Amount::Value(v)) => proposed.set(unit, v),
            Some(Amount::Wildcard) | None => {
                proposed.set(unit, now.get(unit));
                bumpable.push(unit);
            }
        }
    }

    // Already passed: advance the finest bumpable unit, carrying into
    // coarser ones on overflow. The weekday bump jumps 1-7 days forward
    // and always lands in the future.
    if proposed.diff_ms(&now) <= 0 && !bumpable.is_empty() {
        for unit in bumpable {
            if unit == ShiftUnit::Days {
                if let Some(target) = weekday_target {
                    let distance = (target - proposed.weekday_iso() - 1).rem_euclid(7) + 1;
                    proposed.set(unit, proposed.get(unit) + distance);
                    break;
                }
            }
            let next = proposed.get(unit) + 1;
            match unit.recurrence_max() {
                Some(max) if next > max => proposed.set(unit, unit.recurrence_min()),
                _ => {
                    proposed.set(unit, next);
                    break;
                }
            }
        }
    }

    proposed.diff_ms(&now)
}
