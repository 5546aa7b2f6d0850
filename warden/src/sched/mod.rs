//! Scheduled tasks: persistence contract, timers and reconciliation.

mod scheduler;
mod store;
mod task;

pub use scheduler::{MAX_TIMER_MS, SchedulerHandle, TaskHandler, TaskScheduler, next_fire_delay_ms};
pub use store::{FileTaskStore, MemoryTaskStore, TaskStore};
pub use task::{ScheduledTask, TaskKey};
