//! The `mute` command.

use super::{Command, CommandContext, format_delay};
use crate::args::{ArgScanner, ArgSet, ArgSpec, ArgValue, ResolvedArgs};
use crate::error::{Result, WardenError};
use crate::message::CommandMessage;
use crate::platform::Permission;
use crate::sched::ScheduledTask;
use crate::temporal::WallClock;
use crate::validate::{ArgChecks, ValidationTree};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Task kind scheduled to lift a mute.
pub const UNMUTE_KIND: &str = "unmute";

/// Payload persisted with an unmute task.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UnmuteContent {
    targets: Vec<u64>,
    silent: bool,
}

/// `!mute <targets> <duration> [-silent on]` — time-limited mute with a
/// scheduled lift.
#[derive(Debug)]
pub struct MuteCommand {
    args: ArgSet,
}

impl MuteCommand {
    /// Build the command against the shared validation tree.
    #[must_use]
    pub fn new(tree: &ValidationTree) -> Self {
        let args = ArgSet::new(
            tree,
            vec![
                ArgSpec::new("targets", &["args.alias.targets"], ArgScanner::SubjectList)
                    .checks(ArgChecks {
                        non_empty: true,
                        valid_entities: true,
                        ..ArgChecks::default()
                    })
                    .help("help.mute.targets"),
                ArgSpec::new("duration", &["args.alias.duration"], ArgScanner::Time)
                    .checks(ArgChecks {
                        distance_only: true,
                        non_zero_shift: true,
                        ..ArgChecks::default()
                    })
                    .help("help.mute.duration"),
                // Boolean scans consume nothing on a miss, so this is
                // safe to leave in the positional walk.
                ArgSpec::new("silent", &["args.alias.silent"], ArgScanner::Boolean)
                    .checks(ArgChecks {
                        boolean_flag: true,
                        ..ArgChecks::default()
                    })
                    .help("help.mute.silent"),
            ],
        );
        Self { args }
    }
}

#[async_trait]
impl Command for MuteCommand {
    fn name(&self) -> &str {
        "mute"
    }

    fn arg_set(&self) -> &ArgSet {
        &self.args
    }

    fn required_permission(&self) -> Permission {
        Permission::Moderator
    }

    fn default_arg_value(&self, spec: &ArgSpec, _msg: &CommandMessage) -> Option<String> {
        (spec.name == "silent").then(|| "off".to_string())
    }

    async fn execute(
        &self,
        ctx: &CommandContext,
        msg: &CommandMessage,
        args: &ResolvedArgs,
    ) -> Result<Option<String>> {
        let targets: Vec<u64> = args
            .get("targets")
            .and_then(ArgValue::as_entities)
            .map(|set| set.iter().map(|r| r.id).collect())
            .ok_or_else(|| WardenError::internal("targets missing after validation"))?;
        let duration = args
            .get("duration")
            .and_then(ArgValue::as_time)
            .ok_or_else(|| WardenError::internal("duration missing after validation"))?;
        let silent = args
            .get("silent")
            .and_then(ArgValue::as_flag)
            .unwrap_or(false);

        // The platform-side mute itself is the adapter's job; the core
        // schedules the lift.
        let now = WallClock::now_local();
        let lift_at = duration
            .to_schedule(&now)
            .ok_or_else(|| WardenError::internal("duration conversion failed"))?;
        let shift = duration.total_ms_shift().unwrap_or(0);

        let content = serde_json::to_value(UnmuteContent {
            targets: targets.clone(),
            silent,
        })?;
        let task = ScheduledTask::new(msg.org_id, UNMUTE_KIND, lift_at, content);
        let key = task.key();
        ctx.scheduler.submit(task).await?;
        info!(task = %key, targets = targets.len(), shift, "mute scheduled for lifting");

        if silent {
            return Ok(None);
        }
        Ok(Some(ctx.catalog.format(
            "reply.mute.done",
            &[&targets.len().to_string(), &format_delay(shift)],
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::test_context;
    use super::*;
    use crate::args::{ArgResolver, ScanContext};
    use crate::sched::TaskStore;
    use crate::temporal::TimeKind;
    use crate::validate::ValidationContext;

    async fn resolve_and_run(
        text: &str,
    ) -> (
        Result<Option<String>>,
        std::sync::Arc<crate::sched::MemoryTaskStore>,
    ) {
        let (ctx, store) = test_context();
        let tree = ValidationTree::standard();
        let command = MuteCommand::new(&tree);
        let msg = CommandMessage::new(1, 42, 7, text);

        let scan_ctx = ScanContext::new(ctx.catalog.as_ref(), &msg);
        let vctx = ValidationContext {
            resolver: ctx.entities.as_ref(),
            org_id: msg.org_id,
        };
        let resolver = ArgResolver::new(&tree);
        let args = match resolver
            .resolve(
                command.arg_set(),
                &scan_ctx,
                text,
                |spec| command.default_arg_value(spec, &msg),
                &vctx,
            )
            .await
        {
            Ok(args) => args,
            Err(e) => return (Err(e), store),
        };
        (command.execute(&ctx, &msg, &args).await, store)
    }

    #[tokio::test]
    async fn test_mute_schedules_unmute() {
        let (reply, store) = resolve_and_run("<@5> <@6> 2h").await;
        let reply = reply.unwrap().unwrap();
        assert!(reply.contains('2'), "got: {reply}");

        let tasks = store.list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].kind, UNMUTE_KIND);
        // Stored as a concrete one-shot, not a distance.
        assert_eq!(tasks[0].time.kind(), TimeKind::Schedule);

        let content: UnmuteContent = serde_json::from_value(tasks[0].content.clone()).unwrap();
        assert_eq!(content.targets, vec![5, 6]);
        assert!(!content.silent);
    }

    #[tokio::test]
    async fn test_mute_rejects_schedule_duration() {
        let (result, store) = resolve_and_run("<@5> at 14:30").await;
        let err = result.unwrap_err();
        assert!(err.is_user_facing());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_silent_flag_by_name() {
        let (reply, _) = resolve_and_run("-targets <@5> -duration 1h -silent on").await;
        assert_eq!(reply.unwrap(), None);
    }
}
