//! Command records and dispatch.
//!
//! A command is one flat record behind the [`Command`] trait: an argument
//! set, a permission requirement and an execute function, composed from
//! the shared strategy objects (scanners, the validation tree, the
//! default-value accessor). There is no command class hierarchy.
//!
//! The [`Dispatcher`] strips the configured prefix from an inbound
//! message, resolves and validates arguments, consults the permission
//! gate and runs the command. Failures split three ways: a validation
//! error is surfaced to the user in localized form (with the internal
//! diagnostic logged separately), everything else is logged in full and
//! the user sees only the generic internal-error string.

pub mod mute;
pub mod remind;

pub use mute::MuteCommand;
pub use remind::{ReminderHandler, RemindCommand};

use crate::args::{ArgResolver, ArgSet, ArgSpec, ResolvedArgs, ScanContext};
use crate::error::Result;
use crate::localize::Localizer;
use crate::message::CommandMessage;
use crate::platform::{EntityResolver, Messenger, Permission, PermissionGate};
use crate::sched::TaskScheduler;
use crate::validate::{ValidationContext, ValidationTree};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Shared services commands run against.
pub struct CommandContext {
    /// String lookup.
    pub catalog: Arc<dyn Localizer>,
    /// The task scheduler.
    pub scheduler: TaskScheduler,
    /// Outbound messages.
    pub messenger: Arc<dyn Messenger>,
    /// Entity existence checks.
    pub entities: Arc<dyn EntityResolver>,
    /// The org's configured UTC offset in minutes.
    pub org_offset_minutes: Option<i64>,
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("org_offset_minutes", &self.org_offset_minutes)
            .finish_non_exhaustive()
    }
}

/// One chat command.
#[async_trait]
pub trait Command: Send + Sync {
    /// The invocation name (without prefix).
    fn name(&self) -> &str;

    /// The command's argument set.
    fn arg_set(&self) -> &ArgSet;

    /// Minimum permission to run the command.
    fn required_permission(&self) -> Permission {
        Permission::Everyone
    }

    /// Default raw text for an argument that did not resolve. The text
    /// runs through the argument's own scanner, so it uses the same
    /// grammar the user would type.
    fn default_arg_value(&self, _spec: &ArgSpec, _msg: &CommandMessage) -> Option<String> {
        None
    }

    /// Run the command. The returned text, if any, is sent back to the
    /// invoking channel.
    async fn execute(
        &self,
        ctx: &CommandContext,
        msg: &CommandMessage,
        args: &ResolvedArgs,
    ) -> Result<Option<String>>;
}

/// Routes inbound messages to commands.
pub struct Dispatcher {
    prefix: String,
    commands: HashMap<String, Arc<dyn Command>>,
    tree: Arc<ValidationTree>,
    ctx: CommandContext,
    gate: Arc<dyn PermissionGate>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("prefix", &self.prefix)
            .field("commands", &self.commands.len())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a dispatcher with the given command prefix (e.g. `!`).
    #[must_use]
    pub fn new(
        prefix: impl Into<String>,
        tree: Arc<ValidationTree>,
        ctx: CommandContext,
        gate: Arc<dyn PermissionGate>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            commands: HashMap::new(),
            tree,
            ctx,
            gate,
        }
    }

    /// Register a command under its name.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        info!(command = %command.name(), "command registered");
        self.commands.insert(command.name().to_string(), command);
    }

    /// Shared services, for wiring task handlers.
    #[must_use]
    pub const fn context(&self) -> &CommandContext {
        &self.ctx
    }

    /// Handle one message. `None` when it is not addressed to the bot;
    /// otherwise the reply text to post.
    pub async fn dispatch(&self, msg: &CommandMessage) -> Option<String> {
        let content = msg.content.trim();
        let rest = content.strip_prefix(&self.prefix)?;
        let (name, arg_text) = match rest.split_once(char::is_whitespace) {
            Some((name, tail)) => (name, tail),
            None => (rest, ""),
        };
        if name.is_empty() {
            return None;
        }

        let Some(command) = self.commands.get(&name.to_lowercase()) else {
            return Some(
                self.ctx
                    .catalog
                    .format("error.unknown_command", &[name]),
            );
        };

        if !self.gate.allows(msg, command.required_permission()).await {
            return Some(self.ctx.catalog.format("error.permission", &[name]));
        }

        match self.run(command.as_ref(), msg, arg_text).await {
            Ok(reply) => reply,
            Err(err) if err.is_user_facing() => {
                // The localized text goes to the user; the diagnostic
                // form is logged separately.
                debug!(command = %command.name(), error = %err, "rejected arguments");
                Some(err.user_message(self.ctx.catalog.as_ref()))
            }
            Err(err) => {
                error!(command = %command.name(), error = %err, "command failed");
                Some(self.ctx.catalog.string("error.internal"))
            }
        }
    }

    async fn run(
        &self,
        command: &dyn Command,
        msg: &CommandMessage,
        arg_text: &str,
    ) -> Result<Option<String>> {
        let mut scan_ctx = ScanContext::new(self.ctx.catalog.as_ref(), msg);
        if let Some(offset) = self.ctx.org_offset_minutes {
            scan_ctx = scan_ctx.with_timezone(offset);
        }
        let vctx = ValidationContext {
            resolver: self.ctx.entities.as_ref(),
            org_id: msg.org_id,
        };

        let resolver = ArgResolver::new(&self.tree);
        let args = resolver
            .resolve(
                command.arg_set(),
                &scan_ctx,
                arg_text,
                |spec| command.default_arg_value(spec, msg),
                &vctx,
            )
            .await?;

        command.execute(&self.ctx, msg, &args).await
    }
}

/// Format a millisecond delay as a short human string (`2h 5m`, `45s`).
#[must_use]
pub(crate) fn format_delay(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    let (hours, minutes, seconds) = (total_secs / 3600, (total_secs % 3600) / 60, total_secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localize::StaticCatalog;
    use crate::platform::{AllowAllResolver, OpenGate};
    use crate::sched::MemoryTaskStore;

    pub(super) fn test_context() -> (CommandContext, Arc<MemoryTaskStore>) {
        let store = Arc::new(MemoryTaskStore::new());
        let ctx = CommandContext {
            catalog: Arc::new(StaticCatalog::english()),
            scheduler: TaskScheduler::new(store.clone()),
            messenger: Arc::new(NullMessenger),
            entities: Arc::new(AllowAllResolver),
            org_offset_minutes: None,
        };
        (ctx, store)
    }

    pub(super) struct NullMessenger;

    #[async_trait]
    impl Messenger for NullMessenger {
        async fn send(&self, _org: u64, _channel: u64, _text: &str) -> Result<()> {
            Ok(())
        }
    }

    fn dispatcher() -> Dispatcher {
        let (ctx, _) = test_context();
        let tree = Arc::new(ValidationTree::standard());
        let mut dispatcher = Dispatcher::new("!", tree.clone(), ctx, Arc::new(OpenGate));
        dispatcher.register(Arc::new(RemindCommand::new(&tree)));
        dispatcher
    }

    #[tokio::test]
    async fn test_non_command_ignored() {
        let d = dispatcher();
        assert_eq!(d.dispatch(&CommandMessage::local("hello there")).await, None);
    }

    #[tokio::test]
    async fn test_unknown_command_reply() {
        let d = dispatcher();
        let reply = d
            .dispatch(&CommandMessage::local("!frobnicate"))
            .await
            .unwrap();
        assert!(reply.contains("frobnicate"));
    }

    #[tokio::test]
    async fn test_validation_error_is_localized() {
        let d = dispatcher();
        // remind without any arguments: the time argument is required.
        let reply = d.dispatch(&CommandMessage::local("!remind")).await.unwrap();
        assert!(reply.contains("`time`"), "got: {reply}");
    }

    #[tokio::test]
    async fn test_successful_remind_dispatch() {
        let d = dispatcher();
        let reply = d
            .dispatch(&CommandMessage::local("!remind in 3h drink tea"))
            .await
            .unwrap();
        assert!(reply.contains("3h"), "got: {reply}");
    }

    #[test]
    fn test_format_delay() {
        assert_eq!(format_delay(45_000), "45s");
        assert_eq!(format_delay(5 * 60_000), "5m");
        assert_eq!(format_delay(2 * 3_600_000 + 5 * 60_000), "2h 5m");
        assert_eq!(format_delay(-100), "0s");
    }
}
