//! The `remind` command and its task handler.

use super::{Command, CommandContext, format_delay};
use crate::args::{ArgScanner, ArgSet, ArgSpec, ArgValue, ResolvedArgs};
use crate::error::{Result, WardenError};
use crate::message::CommandMessage;
use crate::platform::Messenger;
use crate::sched::{ScheduledTask, TaskHandler, next_fire_delay_ms};
use crate::temporal::{TimeKind, WallClock};
use crate::validate::{ArgChecks, ValidationTree};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Task kind used for reminders.
pub const REMINDER_KIND: &str = "reminder";

/// Payload persisted with a reminder task.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReminderContent {
    channels: Vec<u64>,
    text: String,
    sender_id: u64,
}

/// `!remind <time> [channels] <message>` — schedule a one-shot or
/// recurring message.
#[derive(Debug)]
pub struct RemindCommand {
    args: ArgSet,
}

impl RemindCommand {
    /// Build the command against the shared validation tree.
    #[must_use]
    pub fn new(tree: &ValidationTree) -> Self {
        let args = ArgSet::new(
            tree,
            vec![
                ArgSpec::new("time", &["args.alias.time"], ArgScanner::Time)
                    .checks(ArgChecks {
                        non_zero_shift: true,
                        ..ArgChecks::default()
                    })
                    .help("help.remind.time"),
                ArgSpec::new("channels", &["args.alias.channels"], ArgScanner::ChannelList)
                    .checks(ArgChecks {
                        valid_channels: true,
                        ..ArgChecks::default()
                    })
                    .help("help.remind.channels"),
                ArgSpec::new("message", &["args.alias.message"], ArgScanner::FullText)
                    .checks(ArgChecks {
                        non_null: true,
                        ..ArgChecks::default()
                    })
                    .help("help.remind.message"),
            ],
        );
        Self { args }
    }
}

#[async_trait]
impl Command for RemindCommand {
    fn name(&self) -> &str {
        "remind"
    }

    fn arg_set(&self) -> &ArgSet {
        &self.args
    }

    fn default_arg_value(&self, spec: &ArgSpec, msg: &CommandMessage) -> Option<String> {
        // Reminders default to the channel they were created in.
        (spec.name == "channels").then(|| msg.channel_id.to_string())
    }

    async fn execute(
        &self,
        ctx: &CommandContext,
        msg: &CommandMessage,
        args: &ResolvedArgs,
    ) -> Result<Option<String>> {
        let time = args
            .get("time")
            .and_then(ArgValue::as_time)
            .ok_or_else(|| WardenError::internal("time argument missing after validation"))?;
        let text = args
            .get("message")
            .and_then(ArgValue::as_text)
            .ok_or_else(|| WardenError::internal("message argument missing after validation"))?;
        let channels: Vec<u64> = args
            .get("channels")
            .and_then(ArgValue::as_channels)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_else(|| vec![msg.channel_id]);

        // A relative time becomes a concrete one-shot schedule at
        // creation; calendar expressions are stored as-is.
        let now = WallClock::now_local();
        let stored = if time.kind() == TimeKind::Distance {
            time.to_schedule(&now)
                .ok_or_else(|| WardenError::internal("distance conversion failed"))?
        } else {
            time.clone()
        };

        let content = serde_json::to_value(ReminderContent {
            channels,
            text: text.to_string(),
            sender_id: msg.sender_id,
        })?;
        let task = ScheduledTask::new(msg.org_id, REMINDER_KIND, stored.clone(), content);
        let key = task.key();

        let delay = next_fire_delay_ms(&stored, now, WallClock::local_offset_minutes());
        ctx.scheduler.submit(task).await?;
        info!(task = %key, delay, "reminder scheduled");

        Ok(Some(ctx.catalog.format(
            "reply.remind.created",
            &[&format_delay(delay)],
        )))
    }
}

/// Posts reminder texts when their tasks fire.
pub struct ReminderHandler {
    messenger: Arc<dyn Messenger>,
}

impl std::fmt::Debug for ReminderHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderHandler").finish_non_exhaustive()
    }
}

impl ReminderHandler {
    /// Create a handler posting through the given messenger.
    #[must_use]
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }
}

#[async_trait]
impl TaskHandler for ReminderHandler {
    async fn handle(&self, task: &ScheduledTask) -> Result<()> {
        let content: ReminderContent = serde_json::from_value(task.content.clone())?;
        for channel in content.channels {
            // A missing channel must not stop delivery to the others.
            if let Err(e) = self
                .messenger
                .send(task.org_id, channel, &content.text)
                .await
            {
                warn!(task = %task.key(), channel, error = %e, "reminder delivery failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_context;
    use super::*;
    use crate::sched::TaskStore;
    use crate::temporal::ShiftUnit;

    async fn run(text: &str) -> (Option<String>, Arc<crate::sched::MemoryTaskStore>) {
        let (ctx, store) = test_context();
        let tree = ValidationTree::standard();
        let command = RemindCommand::new(&tree);
        let msg = CommandMessage::new(1, 42, 7, text);

        let scan_ctx = crate::args::ScanContext::new(ctx.catalog.as_ref(), &msg);
        let vctx = crate::validate::ValidationContext {
            resolver: ctx.entities.as_ref(),
            org_id: msg.org_id,
        };
        let resolver = crate::args::ArgResolver::new(&tree);
        let args = resolver
            .resolve(
                command.arg_set(),
                &scan_ctx,
                text,
                |spec| command.default_arg_value(spec, &msg),
                &vctx,
            )
            .await
            .unwrap();
        let reply = command.execute(&ctx, &msg, &args).await.unwrap();
        (reply, store)
    }

    #[tokio::test]
    async fn test_distance_reminder_stored_as_schedule() {
        let (reply, store) = run("in 2h water the plants").await;
        assert!(reply.is_some());

        let tasks = store.list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.kind, REMINDER_KIND);
        assert_eq!(task.time.kind(), TimeKind::Schedule);
        assert!(!task.time.has_wildcard());

        let content: ReminderContent = serde_json::from_value(task.content.clone()).unwrap();
        assert_eq!(content.text, "water the plants");
        // Defaulted to the invoking channel.
        assert_eq!(content.channels, vec![42]);
        assert_eq!(content.sender_id, 7);
    }

    #[tokio::test]
    async fn test_recurring_reminder_keeps_wildcards() {
        let (_, store) = run("every 9:00 stand up").await;
        let tasks = store.list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].time.kind(), TimeKind::RecurringSchedule);
        assert!(tasks[0].time.has_wildcard());
        assert_eq!(
            tasks[0].time.get(ShiftUnit::Hours),
            Some(crate::temporal::Amount::Value(9))
        );
    }

    #[tokio::test]
    async fn test_explicit_channel_mention() {
        let (_, store) = run("in 1h <#500> check the queue").await;
        let tasks = store.list().await.unwrap();
        let content: ReminderContent = serde_json::from_value(tasks[0].content.clone()).unwrap();
        assert_eq!(content.channels, vec![500]);
        assert_eq!(content.text, "check the queue");
    }

    #[tokio::test]
    async fn test_handler_posts_to_all_channels() {
        use std::sync::Mutex;

        struct Recorder(Mutex<Vec<(u64, String)>>);

        #[async_trait]
        impl Messenger for Recorder {
            async fn send(&self, _org: u64, channel: u64, text: &str) -> Result<()> {
                self.0.lock().unwrap().push((channel, text.to_string()));
                Ok(())
            }
        }

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let handler = ReminderHandler::new(recorder.clone());
        let content = serde_json::to_value(ReminderContent {
            channels: vec![1, 2],
            text: "tea".into(),
            sender_id: 9,
        })
        .unwrap();
        let task = ScheduledTask::new(
            1,
            REMINDER_KIND,
            crate::temporal::TimeExpr::new(TimeKind::Schedule),
            content,
        );

        handler.handle(&task).await.unwrap();
        let sent = recorder.0.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, "tea");
    }
}
