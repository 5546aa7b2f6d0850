//! The validation engine: a fixed dependency tree of named checks.
//!
//! The tree is built once at startup and shared by every command. A
//! definition only names the checks it cares about; auto-completion
//! forces every ancestor of a named check on, so `roles_only: true`
//! implies `entity_list` and `non_null` without the author repeating
//! them. Execution walks the same tree depth-first, running a node's
//! predicate before descending, so a generic failure ("not an entity
//! list at all") surfaces before a specific one would even run — and a
//! specific predicate can assume the generic invariant holds.

use crate::args::{ArgSpec, ArgValue, MentionKind};
use crate::error::ValidationError;
use crate::platform::{EntityKind, EntityResolver};
use crate::temporal::TimeKind;
use std::collections::BTreeSet;

/// The reserved id treated as "any value" when a definition sets
/// `any_value_allowed`. Doubles as a legitimate-looking numeric id on
/// purpose; only the entity predicates consult it.
pub const ANY_SENTINEL: u64 = 0;

/// Per-definition check flags. One field per tree node, plus the
/// non-executing `any_value_allowed` modifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ArgChecks {
    /// A value must be present after defaults.
    pub non_null: bool,
    /// Value is a user/role list.
    pub entity_list: bool,
    /// Value is a channel list.
    pub channel_list: bool,
    /// Value is a temporal expression.
    pub temporal: bool,
    /// Value is a string list.
    pub array: bool,
    /// Value is a boolean flag.
    pub boolean_flag: bool,
    /// Value is an integer in text form.
    pub integer: bool,
    /// The list has at least one element.
    pub non_empty: bool,
    /// Every referenced entity exists on the platform.
    pub valid_entities: bool,
    /// Only role mentions are allowed.
    pub roles_only: bool,
    /// Only bare ids are allowed.
    pub ids_only: bool,
    /// Every referenced channel exists on the platform.
    pub valid_channels: bool,
    /// The expression must be a relative distance.
    pub distance_only: bool,
    /// The expression must be a calendar schedule.
    pub schedule_only: bool,
    /// A distance must shift by a non-zero amount.
    pub non_zero_shift: bool,
    /// The integer must not be negative.
    pub non_negative: bool,
    /// Modifier: the reserved sentinel id counts as valid in the entity
    /// predicates.
    pub any_value_allowed: bool,
}

/// Identity of one tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// Structural root; carries no predicate.
    Root,
    /// See [`ArgChecks::non_null`].
    NonNull,
    /// See [`ArgChecks::entity_list`].
    EntityList,
    /// See [`ArgChecks::channel_list`].
    ChannelList,
    /// See [`ArgChecks::temporal`].
    Temporal,
    /// See [`ArgChecks::array`].
    Array,
    /// See [`ArgChecks::boolean_flag`].
    BooleanFlag,
    /// See [`ArgChecks::integer`].
    Integer,
    /// See [`ArgChecks::non_empty`].
    NonEmpty,
    /// See [`ArgChecks::valid_entities`].
    ValidEntities,
    /// See [`ArgChecks::roles_only`].
    RolesOnly,
    /// See [`ArgChecks::ids_only`].
    IdsOnly,
    /// See [`ArgChecks::valid_channels`].
    ValidChannels,
    /// See [`ArgChecks::distance_only`].
    DistanceOnly,
    /// See [`ArgChecks::schedule_only`].
    ScheduleOnly,
    /// See [`ArgChecks::non_zero_shift`].
    NonZeroShift,
    /// See [`ArgChecks::non_negative`].
    NonNegative,
}

impl CheckKind {
    /// Read this node's flag from a check set. Root is always on.
    #[must_use]
    pub const fn flag(self, checks: &ArgChecks) -> bool {
        match self {
            Self::Root => true,
            Self::NonNull => checks.non_null,
            Self::EntityList => checks.entity_list,
            Self::ChannelList => checks.channel_list,
            Self::Temporal => checks.temporal,
            Self::Array => checks.array,
            Self::BooleanFlag => checks.boolean_flag,
            Self::Integer => checks.integer,
            Self::NonEmpty => checks.non_empty,
            Self::ValidEntities => checks.valid_entities,
            Self::RolesOnly => checks.roles_only,
            Self::IdsOnly => checks.ids_only,
            Self::ValidChannels => checks.valid_channels,
            Self::DistanceOnly => checks.distance_only,
            Self::ScheduleOnly => checks.schedule_only,
            Self::NonZeroShift => checks.non_zero_shift,
            Self::NonNegative => checks.non_negative,
        }
    }

    /// Set this node's flag in a check set.
    pub const fn set(self, checks: &mut ArgChecks) {
        match self {
            Self::Root => {}
            Self::NonNull => checks.non_null = true,
            Self::EntityList => checks.entity_list = true,
            Self::ChannelList => checks.channel_list = true,
            Self::Temporal => checks.temporal = true,
            Self::Array => checks.array = true,
            Self::BooleanFlag => checks.boolean_flag = true,
            Self::Integer => checks.integer = true,
            Self::NonEmpty => checks.non_empty = true,
            Self::ValidEntities => checks.valid_entities = true,
            Self::RolesOnly => checks.roles_only = true,
            Self::IdsOnly => checks.ids_only = true,
            Self::ValidChannels => checks.valid_channels = true,
            Self::DistanceOnly => checks.distance_only = true,
            Self::ScheduleOnly => checks.schedule_only = true,
            Self::NonZeroShift => checks.non_zero_shift = true,
            Self::NonNegative => checks.non_negative = true,
        }
    }

    /// The localized message key raised when this predicate fails.
    #[must_use]
    const fn message_key(self) -> &'static str {
        match self {
            Self::Root => "error.internal",
            Self::NonNull => "error.validation.non_null",
            Self::EntityList => "error.validation.entity_list",
            Self::ChannelList => "error.validation.channel_list",
            Self::Temporal => "error.validation.temporal",
            Self::Array => "error.validation.array",
            Self::BooleanFlag => "error.validation.boolean_flag",
            Self::Integer => "error.validation.integer",
            Self::NonEmpty => "error.validation.non_empty",
            Self::ValidEntities => "error.validation.valid_entities",
            Self::RolesOnly => "error.validation.roles_only",
            Self::IdsOnly => "error.validation.ids_only",
            Self::ValidChannels => "error.validation.valid_channels",
            Self::DistanceOnly => "error.validation.distance_only",
            Self::ScheduleOnly => "error.validation.schedule_only",
            Self::NonZeroShift => "error.validation.non_zero_shift",
            Self::NonNegative => "error.validation.non_negative",
        }
    }
}

/// One node of the fixed tree.
#[derive(Debug)]
struct Node {
    kind: CheckKind,
    children: Vec<Node>,
}

impl Node {
    fn leaf(kind: CheckKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    fn with_children(kind: CheckKind, children: Vec<Node>) -> Self {
        Self { kind, children }
    }
}

/// External state the entity predicates need.
pub struct ValidationContext<'a> {
    /// Existence checks for mentioned entities.
    pub resolver: &'a dyn EntityResolver,
    /// The org the command runs in.
    pub org_id: u64,
}

impl std::fmt::Debug for ValidationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationContext")
            .field("org_id", &self.org_id)
            .finish_non_exhaustive()
    }
}

/// The process-wide validation tree.
#[derive(Debug)]
pub struct ValidationTree {
    root: Node,
}

impl ValidationTree {
    /// Build the standard tree. Called once during startup; the tree is
    /// immutable afterwards.
    #[must_use]
    pub fn standard() -> Self {
        let root = Node::with_children(
            CheckKind::Root,
            vec![Node::with_children(
                CheckKind::NonNull,
                vec![
                    Node::with_children(
                        CheckKind::EntityList,
                        vec![
                            Node::leaf(CheckKind::NonEmpty),
                            Node::leaf(CheckKind::ValidEntities),
                            Node::leaf(CheckKind::RolesOnly),
                            Node::leaf(CheckKind::IdsOnly),
                        ],
                    ),
                    Node::with_children(
                        CheckKind::ChannelList,
                        vec![Node::leaf(CheckKind::ValidChannels)],
                    ),
                    Node::with_children(
                        CheckKind::Temporal,
                        vec![
                            Node::leaf(CheckKind::DistanceOnly),
                            Node::leaf(CheckKind::ScheduleOnly),
                            Node::leaf(CheckKind::NonZeroShift),
                        ],
                    ),
                    Node::leaf(CheckKind::Array),
                    Node::leaf(CheckKind::BooleanFlag),
                    Node::with_children(CheckKind::Integer, vec![Node::leaf(CheckKind::NonNegative)]),
                ],
            )],
        );
        Self { root }
    }

    /// Force every ancestor of a set flag on. Runs once per argument
    /// definition at registration time, not per request.
    #[must_use]
    pub fn auto_complete(&self, checks: &ArgChecks) -> ArgChecks {
        let mut out = *checks;

        // Iterative walk carrying the ancestor path of each node.
        let mut stack: Vec<(&Node, Vec<CheckKind>)> = vec![(&self.root, Vec::new())];
        while let Some((node, path)) = stack.pop() {
            if node.kind.flag(checks) {
                for ancestor in &path {
                    ancestor.set(&mut out);
                }
            }
            let mut child_path = path;
            child_path.push(node.kind);
            for child in &node.children {
                stack.push((child, child_path.clone()));
            }
        }
        out
    }

    /// Validate one argument value against its (auto-completed) checks.
    ///
    /// Depth-first over the tree; only nodes whose flag is on run, and a
    /// node's predicate runs before its children are considered. The
    /// first failure wins.
    pub async fn validate(
        &self,
        spec: &ArgSpec,
        alias: &str,
        value: Option<&ArgValue>,
        vctx: &ValidationContext<'_>,
    ) -> Result<(), ValidationError> {
        let checks = &spec.checks;
        let mut stack: Vec<&Node> = vec![&self.root];

        while let Some(node) = stack.pop() {
            if !node.kind.flag(checks) {
                continue;
            }
            run_predicate(node.kind, alias, checks, value, vctx).await?;
            for child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        Ok(())
    }
}

/// Run a single predicate. Predicates below a failed ancestor are never
/// reached, so each may assume its parent's invariant.
async fn run_predicate(
    kind: CheckKind,
    alias: &str,
    checks: &ArgChecks,
    value: Option<&ArgValue>,
    vctx: &ValidationContext<'_>,
) -> Result<(), ValidationError> {
    let fail = || Err(ValidationError::new(alias, kind.message_key()));

    if kind == CheckKind::Root {
        return Ok(());
    }
    if kind == CheckKind::NonNull {
        return if value.is_some() { Ok(()) } else { fail() };
    }

    // Every deeper predicate has NonNull above it; an absent value means
    // NonNull was off, and nothing further applies.
    let Some(value) = value else { return Ok(()) };

    match kind {
        CheckKind::EntityList => match value {
            ArgValue::Entities(_) => Ok(()),
            _ => fail(),
        },
        CheckKind::ChannelList => match value {
            ArgValue::Channels(_) => Ok(()),
            _ => fail(),
        },
        CheckKind::Temporal => match value {
            ArgValue::Time(_) => Ok(()),
            _ => fail(),
        },
        CheckKind::Array => match value {
            ArgValue::Items(_) => Ok(()),
            _ => fail(),
        },
        CheckKind::BooleanFlag => match value {
            ArgValue::Flag(_) => Ok(()),
            _ => fail(),
        },
        CheckKind::Integer => match value.as_text() {
            Some(text) if text.parse::<i64>().is_ok() => Ok(()),
            _ => fail(),
        },
        CheckKind::NonEmpty => {
            let empty = match value {
                ArgValue::Entities(set) => set.is_empty(),
                ArgValue::Channels(set) => set.is_empty(),
                ArgValue::Items(items) => items.is_empty(),
                ArgValue::Text(text) => text.is_empty(),
                _ => false,
            };
            if empty { fail() } else { Ok(()) }
        }
        CheckKind::ValidEntities => {
            let Some(refs) = value.as_entities() else {
                return Ok(());
            };
            let users: BTreeSet<u64> = refs
                .iter()
                .filter(|r| r.kind != MentionKind::Role)
                .map(|r| r.id)
                .filter(|id| !(checks.any_value_allowed && *id == ANY_SENTINEL))
                .collect();
            let roles: BTreeSet<u64> = refs
                .iter()
                .filter(|r| r.kind == MentionKind::Role)
                .map(|r| r.id)
                .collect();

            if !users.is_empty()
                && !vctx
                    .resolver
                    .resolve_entities(vctx.org_id, &users, EntityKind::User)
                    .await
            {
                return fail();
            }
            if !roles.is_empty()
                && !vctx
                    .resolver
                    .resolve_entities(vctx.org_id, &roles, EntityKind::Role)
                    .await
            {
                return fail();
            }
            Ok(())
        }
        CheckKind::RolesOnly => {
            let Some(refs) = value.as_entities() else {
                return Ok(());
            };
            if refs.iter().all(|r| r.kind == MentionKind::Role) {
                Ok(())
            } else {
                fail()
            }
        }
        CheckKind::IdsOnly => {
            let Some(refs) = value.as_entities() else {
                return Ok(());
            };
            if refs.iter().all(|r| r.kind == MentionKind::Bare) {
                Ok(())
            } else {
                fail()
            }
        }
        CheckKind::ValidChannels => {
            let Some(ids) = value.as_channels() else {
                return Ok(());
            };
            let ids: BTreeSet<u64> = ids
                .iter()
                .copied()
                .filter(|id| !(checks.any_value_allowed && *id == ANY_SENTINEL))
                .collect();
            if ids.is_empty()
                || vctx
                    .resolver
                    .resolve_entities(vctx.org_id, &ids, EntityKind::Channel)
                    .await
            {
                Ok(())
            } else {
                fail()
            }
        }
        CheckKind::DistanceOnly => match value.as_time() {
            Some(expr) if expr.kind() != TimeKind::Distance => fail(),
            _ => Ok(()),
        },
        CheckKind::ScheduleOnly => match value.as_time() {
            Some(expr) if expr.kind() == TimeKind::Distance => fail(),
            _ => Ok(()),
        },
        CheckKind::NonZeroShift => match value.as_time() {
            Some(expr) if expr.total_ms_shift() == Some(0) => fail(),
            _ => Ok(()),
        },
        CheckKind::NonNegative => match value.as_text() {
            Some(text) => match text.parse::<i64>() {
                Ok(n) if n < 0 => fail(),
                _ => Ok(()),
            },
            None => Ok(()),
        },
        CheckKind::Root | CheckKind::NonNull => Ok(()),
    }
}
