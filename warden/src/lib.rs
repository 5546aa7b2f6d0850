//! Warden - a chat moderation bot core.
//!
//! This crate implements the platform-agnostic heart of a moderation/
//! utility bot: turning raw command text into typed, validated argument
//! values, and turning time arguments into scheduled work.
//!
//! # Architecture
//!
//! - **Arguments** ([`args`]) - scanner strategies, per-command argument
//!   definitions and the by-name/positional resolver
//! - **Validation** ([`validate`]) - the fixed dependency tree of named
//!   checks with auto-completion
//! - **Temporal** ([`temporal`]) - distance and calendar-schedule
//!   expressions with timezone shifting
//! - **Scheduling** ([`sched`]) - persisted tasks, timers and the
//!   next-fire computation
//! - **Commands** ([`command`]) - flat command records and the dispatcher
//! - **Platform** ([`platform`]) - traits the chat-platform adapter
//!   implements; the core never talks to a platform directly
//!
//! # Quick start
//!
//! ```rust,ignore
//! use warden::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let tree = Arc::new(ValidationTree::standard());
//!     let scheduler = TaskScheduler::new(Arc::new(MemoryTaskStore::new()));
//!     // wire a Dispatcher with commands, then feed it CommandMessages
//!     Ok(())
//! }
//! ```

pub mod args;
pub mod command;
pub mod config;
pub mod error;
pub mod localize;
pub mod message;
pub mod platform;
pub mod sched;
pub mod temporal;
pub mod util;
pub mod validate;

/// Prelude module for convenient imports.
pub mod prelude {
    // Errors
    pub use crate::error::{
        ConfigError, ConfigResult, Result, StoreError, StoreResult, ValidationError, WardenError,
    };

    // Arguments
    pub use crate::args::{
        ARG_PREFIX, ArgResolver, ArgScanner, ArgSet, ArgSpec, ArgValue, EntityRef, MentionKind,
        MentionParser, ResolvedArgs, ScanContext, ScanMode, Scanned, Separator,
    };

    // Validation
    pub use crate::validate::{ArgChecks, CheckKind, ValidationContext, ValidationTree};

    // Temporal
    pub use crate::temporal::{
        Amount, ShiftUnit, TimeExpr, TimeField, TimeKind, TimeParser, WallClock,
    };

    // Scheduling
    pub use crate::sched::{
        FileTaskStore, MemoryTaskStore, ScheduledTask, SchedulerHandle, TaskHandler, TaskKey,
        TaskScheduler, TaskStore, next_fire_delay_ms,
    };

    // Commands
    pub use crate::command::{
        Command, CommandContext, Dispatcher, MuteCommand, RemindCommand, ReminderHandler,
    };

    // Collaborators
    pub use crate::platform::{
        EntityKind, EntityResolver, Messenger, Permission, PermissionGate,
    };

    // Config & events
    pub use crate::config::{BotConfig, config_path, load_config, save_config};
    pub use crate::localize::{Localizer, StaticCatalog};
    pub use crate::message::CommandMessage;
}
