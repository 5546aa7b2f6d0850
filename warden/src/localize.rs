//! Localized string lookup.
//!
//! Every user-visible string and every keyword token the parsers match
//! against (boolean literals, time-kind keywords, unit suffixes, weekday
//! and month names) goes through the [`Localizer`] trait. The core never
//! hardcodes these beyond the `:` separator and the `*` wildcard. A
//! [`StaticCatalog`] with English defaults ships for the binary and tests;
//! deployments substitute their own lookup service behind the trait.

use std::collections::HashMap;

/// String lookup service.
pub trait Localizer: Send + Sync {
    /// Look up the string for `key`. `None` when the key is unknown.
    fn text(&self, key: &str) -> Option<&str>;

    /// Look up `key`, falling back to the key itself.
    fn string(&self, key: &str) -> String {
        self.text(key).map_or_else(|| key.to_string(), str::to_string)
    }

    /// Look up `key` and substitute positional `{0}`, `{1}`, ... markers.
    fn format(&self, key: &str, args: &[&str]) -> String {
        let mut out = self.string(key);
        for (i, arg) in args.iter().enumerate() {
            out = out.replace(&format!("{{{i}}}"), arg);
        }
        out
    }
}

/// An in-memory catalog built from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: HashMap<&'static str, &'static str>,
}

/// English defaults for every key the core consults.
const ENGLISH: &[(&str, &str)] = &[
    // Boolean argument literals.
    ("args.bool.on", "on"),
    ("args.bool.off", "off"),
    ("args.bool.true", "true"),
    ("args.bool.false", "false"),
    // Time expression kind keywords.
    ("time.kind.distance", "in"),
    ("time.kind.schedule", "at"),
    ("time.kind.recurring", "every"),
    // Unit suffixes for `<integer><suffix>` tokens.
    ("time.unit.milliseconds", "ms"),
    ("time.unit.seconds", "s"),
    ("time.unit.minutes", "m"),
    ("time.unit.hours", "h"),
    ("time.unit.days", "d"),
    ("time.unit.weeks", "w"),
    ("time.unit.months", "mo"),
    ("time.unit.years", "y"),
    // Weekday names, ISO order.
    ("time.weekday.1", "monday"),
    ("time.weekday.2", "tuesday"),
    ("time.weekday.3", "wednesday"),
    ("time.weekday.4", "thursday"),
    ("time.weekday.5", "friday"),
    ("time.weekday.6", "saturday"),
    ("time.weekday.7", "sunday"),
    // Month names.
    ("time.month.1", "january"),
    ("time.month.2", "february"),
    ("time.month.3", "march"),
    ("time.month.4", "april"),
    ("time.month.5", "may"),
    ("time.month.6", "june"),
    ("time.month.7", "july"),
    ("time.month.8", "august"),
    ("time.month.9", "september"),
    ("time.month.10", "october"),
    ("time.month.11", "november"),
    ("time.month.12", "december"),
    // Predefined time-of-day literals.
    ("time.predefined.midnight", "midnight"),
    ("time.predefined.noon", "noon"),
    // Argument aliases.
    ("args.alias.time", "time"),
    ("args.alias.message", "message"),
    ("args.alias.channels", "channels"),
    ("args.alias.targets", "targets"),
    ("args.alias.duration", "duration"),
    ("args.alias.silent", "silent"),
    // Validation error messages.
    ("error.validation.non_null", "argument `{0}` is required"),
    ("error.validation.non_empty", "argument `{0}` must not be empty"),
    (
        "error.validation.entity_list",
        "argument `{0}` must be a list of users or roles",
    ),
    (
        "error.validation.channel_list",
        "argument `{0}` must be a list of channels",
    ),
    (
        "error.validation.temporal",
        "argument `{0}` must be a time expression",
    ),
    ("error.validation.array", "argument `{0}` must be a list"),
    (
        "error.validation.boolean_flag",
        "argument `{0}` must be one of on/off/true/false",
    ),
    ("error.validation.integer", "argument `{0}` must be a number"),
    (
        "error.validation.non_negative",
        "argument `{0}` must not be negative",
    ),
    (
        "error.validation.valid_entities",
        "argument `{0}` mentions users or roles that do not exist",
    ),
    (
        "error.validation.valid_channels",
        "argument `{0}` mentions channels that do not exist",
    ),
    (
        "error.validation.roles_only",
        "argument `{0}` must mention roles only",
    ),
    (
        "error.validation.ids_only",
        "argument `{0}` must use bare ids, not mentions",
    ),
    (
        "error.validation.distance_only",
        "argument `{0}` must be a relative time (e.g. `3h 20m`)",
    ),
    (
        "error.validation.schedule_only",
        "argument `{0}` must be a calendar time, not a relative one",
    ),
    (
        "error.validation.non_zero_shift",
        "argument `{0}` must be a non-zero amount of time",
    ),
    // Command replies.
    ("error.internal", "something went wrong, please try again later"),
    ("error.unknown_command", "unknown command `{0}`"),
    ("error.permission", "you are not allowed to use `{0}`"),
    ("reply.remind.created", "reminder set, next run in {0}"),
    ("reply.mute.done", "muted {0} member(s) for {1}"),
];

impl StaticCatalog {
    /// Build the English catalog.
    #[must_use]
    pub fn english() -> Self {
        Self {
            entries: ENGLISH.iter().copied().collect(),
        }
    }

    /// Override or add a single entry. Used by tests and by deployments
    /// layering a partial translation over the defaults.
    #[must_use]
    pub fn with_entry(mut self, key: &'static str, value: &'static str) -> Self {
        self.entries.insert(key, value);
        self
    }
}

impl Localizer for StaticCatalog {
    fn text(&self, key: &str) -> Option<&str> {
        self.entries.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_fallback() {
        let catalog = StaticCatalog::english();
        assert_eq!(catalog.text("args.bool.on"), Some("on"));
        assert_eq!(catalog.string("no.such.key"), "no.such.key");
    }

    #[test]
    fn test_format_substitution() {
        let catalog = StaticCatalog::english();
        let msg = catalog.format("error.validation.non_null", &["time"]);
        assert_eq!(msg, "argument `time` is required");
    }

    #[test]
    fn test_override() {
        let catalog = StaticCatalog::english().with_entry("args.bool.on", "an");
        assert_eq!(catalog.text("args.bool.on"), Some("an"));
    }
}
