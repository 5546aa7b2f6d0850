//! The argument scanner family.
//!
//! A scanner turns a window of command text into a typed value plus the
//! number of bytes it consumed. Scanners are a closed set of variants
//! dispatched by `match`; each one is a pure function of its inputs.
//! Malformed input is never an error here — a scanner that cannot produce
//! a value returns `None` and the resolver falls back to the argument's
//! default. Only validation rejects a value that is present but invalid.

use super::mention::{EntityRef, MentionKind, MentionParser};
use crate::localize::Localizer;
use crate::message::CommandMessage;
use crate::temporal::{ShiftUnit, TimeExpr, TimeField, TimeKind, TimeParser, WallClock};
use std::collections::BTreeSet;

/// How the resolver is walking the command text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// The argument's window was located by `-name`; it owns the whole
    /// window.
    ByName,
    /// Positional scanning; the scanner must stop where the next
    /// argument plausibly begins.
    Sequential,
}

/// Result of one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Scanned {
    /// The produced value; `None` means absent/unparseable here.
    pub value: Option<ArgValue>,
    /// Bytes of the window consumed. Always `<= text.len()`.
    pub next_pos: usize,
}

impl Scanned {
    fn none(next_pos: usize) -> Self {
        Self {
            value: None,
            next_pos,
        }
    }

    fn some(value: ArgValue, next_pos: usize) -> Self {
        Self {
            value: Some(value),
            next_pos,
        }
    }
}

/// A typed argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Free text.
    Text(String),
    /// A boolean flag.
    Flag(bool),
    /// A list of trimmed strings.
    Items(Vec<String>),
    /// `key:value` pairs in declaration order.
    Fields(Vec<(String, String)>),
    /// Mentioned users/roles, deduplicated.
    Entities(BTreeSet<EntityRef>),
    /// Mentioned channel ids, deduplicated.
    Channels(BTreeSet<u64>),
    /// A temporal expression.
    Time(TimeExpr),
}

impl ArgValue {
    /// The text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The flag, if this is a boolean value.
    #[must_use]
    pub const fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }

    /// The items, if this is a list value.
    #[must_use]
    pub fn as_items(&self) -> Option<&[String]> {
        match self {
            Self::Items(v) => Some(v),
            _ => None,
        }
    }

    /// The entity set, if this is an entity-list value.
    #[must_use]
    pub const fn as_entities(&self) -> Option<&BTreeSet<EntityRef>> {
        match self {
            Self::Entities(set) => Some(set),
            _ => None,
        }
    }

    /// The channel ids, if this is a channel-list value.
    #[must_use]
    pub const fn as_channels(&self) -> Option<&BTreeSet<u64>> {
        match self {
            Self::Channels(set) => Some(set),
            _ => None,
        }
    }

    /// The temporal expression, if this is a time value.
    #[must_use]
    pub const fn as_time(&self) -> Option<&TimeExpr> {
        match self {
            Self::Time(t) => Some(t),
            _ => None,
        }
    }
}

/// Separator for array arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// Comma-separated, space-tolerant.
    Comma,
    /// Whitespace-separated.
    Space,
}

/// Everything a scan may consult besides the text window.
pub struct ScanContext<'a> {
    /// String lookup for keyword literals.
    pub catalog: &'a dyn Localizer,
    /// The message being processed (org/channel/sender ids).
    pub message: &'a CommandMessage,
    /// The org's configured UTC offset in minutes, appended to parsed
    /// schedules by the time scanner.
    pub org_offset_minutes: Option<i64>,
}

impl std::fmt::Debug for ScanContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanContext")
            .field("org_offset_minutes", &self.org_offset_minutes)
            .finish_non_exhaustive()
    }
}

impl<'a> ScanContext<'a> {
    /// Create a context without an org timezone.
    #[must_use]
    pub const fn new(catalog: &'a dyn Localizer, message: &'a CommandMessage) -> Self {
        Self {
            catalog,
            message,
            org_offset_minutes: None,
        }
    }

    /// Attach the org's UTC offset.
    #[must_use]
    pub const fn with_timezone(mut self, offset_minutes: i64) -> Self {
        self.org_offset_minutes = Some(offset_minutes);
        self
    }
}

/// Quote characters that suppress space splitting.
const QUOTES: [char; 3] = ['"', '\'', '`'];

pub(crate) fn is_quote(c: char) -> bool {
    QUOTES.contains(&c)
}

/// The scanner strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgScanner {
    /// One token (quote-aware) in sequential mode; the whole window by
    /// name.
    Simple,
    /// Always the entire remaining text.
    FullText,
    /// A separated list of strings.
    Array(Separator),
    /// One of the four localized boolean literals.
    Boolean,
    /// `key:value;key:value` pairs.
    Object,
    /// Channel mentions or bare ids.
    ChannelList,
    /// User/role mentions or bare ids.
    SubjectList,
    /// A temporal expression.
    Time,
}

impl ArgScanner {
    /// Scan a window of text. Never fails; an unusable window yields
    /// `value: None`.
    #[must_use]
    pub fn scan(&self, ctx: &ScanContext<'_>, text: &str, mode: ScanMode) -> Scanned {
        let result = match self {
            Self::Simple => scan_simple(text, mode),
            Self::FullText => scan_full(text),
            Self::Array(sep) => scan_array(text, mode, *sep),
            Self::Boolean => scan_boolean(ctx, text),
            Self::Object => scan_object(text, mode),
            Self::ChannelList => scan_channels(text, mode),
            Self::SubjectList => scan_subjects(text, mode),
            Self::Time => scan_time(ctx, text),
        };
        debug_assert!(result.next_pos <= text.len());
        result
    }
}

fn scan_simple(text: &str, mode: ScanMode) -> Scanned {
    match mode {
        ScanMode::ByName => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Scanned::none(0)
            } else {
                Scanned::some(ArgValue::Text(trimmed.to_string()), text.len())
            }
        }
        ScanMode::Sequential => {
            let (token, next_pos) = first_token(text);
            match token {
                Some(t) => Scanned::some(ArgValue::Text(t), next_pos),
                None => Scanned::none(0),
            }
        }
    }
}

fn scan_full(text: &str) -> Scanned {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Scanned::none(0)
    } else {
        Scanned::some(ArgValue::Text(trimmed.to_string()), text.len())
    }
}

/// Read one quote-aware token. Returns the token text (quotes stripped)
/// and the consumed length.
fn first_token(text: &str) -> (Option<String>, usize) {
    let lead = text.len() - text.trim_start().len();
    let rest = &text[lead..];
    let Some(first) = rest.chars().next() else {
        return (None, 0);
    };

    if is_quote(first) {
        let body = &rest[1..];
        return match body.find(first) {
            Some(close) => (Some(body[..close].to_string()), lead + close + 2),
            // Unterminated quote: the rest of the window is the token.
            None => (Some(body.to_string()), text.len()),
        };
    }

    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    (Some(rest[..end].to_string()), lead + end)
}

fn scan_array(text: &str, mode: ScanMode, sep: Separator) -> Scanned {
    let window_end = match (mode, sep) {
        (ScanMode::ByName, _) | (ScanMode::Sequential, Separator::Space) => text.len(),
        (ScanMode::Sequential, Separator::Comma) => comma_boundary(text),
    };
    let window = &text[..window_end];

    let items: Vec<String> = match sep {
        Separator::Comma => window
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        Separator::Space => window.split_whitespace().map(str::to_string).collect(),
    };

    if items.is_empty() {
        Scanned::none(0)
    } else {
        Scanned::some(ArgValue::Items(items), window_end)
    }
}

/// First unquoted space that is not adjacent to a comma — the heuristic
/// end of a comma array sharing a line with further arguments.
fn comma_boundary(text: &str) -> usize {
    let mut quote: Option<char> = None;
    let mut last_solid: Option<char> = None;

    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            last_solid = Some(ch);
            continue;
        }
        if is_quote(ch) {
            quote = Some(ch);
            last_solid = Some(ch);
            continue;
        }
        if ch.is_whitespace() {
            if last_solid == Some(',') {
                continue;
            }
            let next_solid = text[i..].chars().find(|c| !c.is_whitespace());
            if next_solid == Some(',') {
                continue;
            }
            return i;
        }
        last_solid = Some(ch);
    }
    text.len()
}

fn scan_boolean(ctx: &ScanContext<'_>, text: &str) -> Scanned {
    let (token, next_pos) = first_token(text);
    if let Some(token) = token {
        let lower = token.to_lowercase();
        for (key, value) in [
            ("args.bool.on", true),
            ("args.bool.true", true),
            ("args.bool.off", false),
            ("args.bool.false", false),
        ] {
            if lower == ctx.catalog.string(key).to_lowercase() {
                return Scanned::some(ArgValue::Flag(value), next_pos);
            }
        }
    }
    // Deliberate "failed, consumed nothing, go to defaults" signal.
    Scanned::none(text.len().min(1))
}

fn scan_object(text: &str, mode: ScanMode) -> Scanned {
    let window_end = match mode {
        ScanMode::ByName => text.len(),
        ScanMode::Sequential => object_boundary(text),
    };
    let window = &text[..window_end];
    if !has_unquoted(window, ':') {
        return Scanned::none(0);
    }

    let mut fields = Vec::new();
    for piece in split_unquoted(window, ';') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let Some(colon) = find_unquoted(piece, ':') else {
            return Scanned::none(0);
        };
        let key = piece[..colon].trim();
        let value = strip_quotes(piece[colon + 1..].trim());
        if key.is_empty() {
            return Scanned::none(0);
        }
        fields.push((key.to_string(), value.to_string()));
    }

    if fields.is_empty() {
        Scanned::none(0)
    } else {
        Scanned::some(ArgValue::Fields(fields), window_end)
    }
}

/// Heuristic end of an object: the first unquoted space after the last
/// unquoted `:`.
fn object_boundary(text: &str) -> usize {
    let Some(last_colon) = rfind_unquoted(text, ':') else {
        return 0;
    };
    let tail = &text[last_colon..];
    let mut quote: Option<char> = None;
    for (i, ch) in tail.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if is_quote(ch) => quote = Some(ch),
            None if ch.is_whitespace() => return last_colon + i,
            None => {}
        }
    }
    text.len()
}

fn strip_quotes(s: &str) -> &str {
    let mut chars = s.chars();
    if let (Some(first), Some(last)) = (chars.next(), s.chars().last()) {
        if first == last && is_quote(first) && s.len() >= 2 {
            return &s[1..s.len() - 1];
        }
    }
    s
}

fn has_unquoted(text: &str, needle: char) -> bool {
    find_unquoted(text, needle).is_some()
}

fn find_unquoted(text: &str, needle: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if is_quote(ch) => quote = Some(ch),
            None if ch == needle => return Some(i),
            None => {}
        }
    }
    None
}

fn rfind_unquoted(text: &str, needle: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut found = None;
    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if is_quote(ch) => quote = Some(ch),
            None if ch == needle => found = Some(i),
            None => {}
        }
    }
    found
}

fn split_unquoted(text: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if is_quote(ch) => quote = Some(ch),
            None if ch == sep => {
                out.push(&text[start..i]);
                start = i + sep.len_utf8();
            }
            None => {}
        }
    }
    out.push(&text[start..]);
    out
}

fn scan_channels(text: &str, mode: ScanMode) -> Scanned {
    let (refs, next_pos) = scan_mentions(text, mode, |kind| {
        matches!(kind, MentionKind::Channel | MentionKind::Bare)
    });
    match refs {
        Some(refs) => {
            let ids: BTreeSet<u64> = refs.iter().map(|r| r.id).collect();
            Scanned::some(ArgValue::Channels(ids), next_pos)
        }
        None => Scanned::none(0),
    }
}

fn scan_subjects(text: &str, mode: ScanMode) -> Scanned {
    let (refs, next_pos) = scan_mentions(text, mode, |kind| {
        matches!(
            kind,
            MentionKind::User | MentionKind::Role | MentionKind::Bare
        )
    });
    match refs {
        Some(refs) => Scanned::some(ArgValue::Entities(refs), next_pos),
        None => Scanned::none(0),
    }
}

/// Consume successive mention tokens (comma- or space-separated) into a
/// deduplicated set. Sequential mode stops at the first token that is not
/// an acceptable mention; by-name mode requires the whole window to be
/// mentions.
fn scan_mentions(
    text: &str,
    mode: ScanMode,
    accept: fn(MentionKind) -> bool,
) -> (Option<BTreeSet<EntityRef>>, usize) {
    let parser = MentionParser::new();
    let mut refs = BTreeSet::new();
    let mut pos = 0usize;

    loop {
        let rest = &text[pos..];
        let lead = rest.len() - rest.trim_start_matches([' ', '\t', ',']).len();
        let body = &rest[lead..];
        if body.is_empty() {
            break;
        }
        let end = body
            .find(|c: char| c.is_whitespace() || c == ',')
            .unwrap_or(body.len());
        let token = &body[..end];

        match parser.parse_token(token) {
            Some(entity) if accept(entity.kind) => {
                refs.insert(entity);
                pos += lead + end;
            }
            _ => {
                if mode == ScanMode::ByName {
                    return (None, 0);
                }
                break;
            }
        }
    }

    if refs.is_empty() {
        (None, 0)
    } else {
        (Some(refs), pos)
    }
}

fn scan_time(ctx: &ScanContext<'_>, text: &str) -> Scanned {
    let lead = text.len() - text.trim_start().len();
    let parser = TimeParser::new(ctx.catalog);
    let Some((mut expr, consumed)) = parser.parse(&text[lead..]) else {
        return Scanned::none(0);
    };

    // Attach the org timezone to schedules that did not name one.
    if expr.kind() != TimeKind::Distance && expr.get(ShiftUnit::Timezone).is_none() {
        if let Some(offset) = ctx.org_offset_minutes {
            expr.push(vec![TimeField::value(ShiftUnit::Timezone, offset)]);
        }
    }
    expr.auto_complete(&WallClock::now_local());

    Scanned::some(ArgValue::Time(expr), lead + consumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localize::StaticCatalog;
    use crate::temporal::Amount;

    fn ctx_parts() -> (StaticCatalog, CommandMessage) {
        (StaticCatalog::english(), CommandMessage::local("test"))
    }

    #[test]
    fn test_simple_sequential_token() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg);
        let r = ArgScanner::Simple.scan(&ctx, "bill and others", ScanMode::Sequential);
        assert_eq!(r.value, Some(ArgValue::Text("bill".into())));
        assert_eq!(r.next_pos, 4);
    }

    #[test]
    fn test_simple_quoted_token() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg);
        let r = ArgScanner::Simple.scan(&ctx, "\"bill bob\" rest", ScanMode::Sequential);
        assert_eq!(r.value, Some(ArgValue::Text("bill bob".into())));
        assert_eq!(r.next_pos, 10);
    }

    #[test]
    fn test_simple_by_name_takes_window() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg);
        let r = ArgScanner::Simple.scan(&ctx, " bill and others ", ScanMode::ByName);
        assert_eq!(r.value, Some(ArgValue::Text("bill and others".into())));
    }

    #[test]
    fn test_full_text() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg);
        let r = ArgScanner::FullText.scan(&ctx, "  drink tea  ", ScanMode::Sequential);
        assert_eq!(r.value, Some(ArgValue::Text("drink tea".into())));
        assert_eq!(r.next_pos, 13);
    }

    #[test]
    fn test_array_comma_split() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg);
        let r = ArgScanner::Array(Separator::Comma).scan(&ctx, "a, b ,c", ScanMode::ByName);
        assert_eq!(
            r.value,
            Some(ArgValue::Items(vec!["a".into(), "b".into(), "c".into()]))
        );
    }

    #[test]
    fn test_array_sequential_boundary() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg);
        let r = ArgScanner::Array(Separator::Comma).scan(&ctx, "a,b next", ScanMode::Sequential);
        assert_eq!(r.value, Some(ArgValue::Items(vec!["a".into(), "b".into()])));
        assert_eq!(r.next_pos, 3);

        // Spaces adjacent to commas do not end the array.
        let r = ArgScanner::Array(Separator::Comma).scan(&ctx, "a, b ,c", ScanMode::Sequential);
        assert_eq!(
            r.value,
            Some(ArgValue::Items(vec!["a".into(), "b".into(), "c".into()]))
        );
        assert_eq!(r.next_pos, 7);
    }

    #[test]
    fn test_boolean_literals() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg);
        for (text, expected) in [("on", true), ("TRUE", true), ("off", false), ("false", false)] {
            let r = ArgScanner::Boolean.scan(&ctx, text, ScanMode::Sequential);
            assert_eq!(r.value, Some(ArgValue::Flag(expected)), "{text}");
        }
    }

    #[test]
    fn test_boolean_failure_signal() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg);
        let r = ArgScanner::Boolean.scan(&ctx, "maybe", ScanMode::Sequential);
        assert_eq!(r.value, None);
        assert_eq!(r.next_pos, 1);

        let r = ArgScanner::Boolean.scan(&ctx, "", ScanMode::Sequential);
        assert_eq!(r.next_pos, 0);
    }

    #[test]
    fn test_object_pairs() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg);
        let r = ArgScanner::Object.scan(&ctx, "color:red;size:'x l'", ScanMode::ByName);
        assert_eq!(
            r.value,
            Some(ArgValue::Fields(vec![
                ("color".into(), "red".into()),
                ("size".into(), "x l".into()),
            ]))
        );
    }

    #[test]
    fn test_object_sequential_boundary() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg);
        let r = ArgScanner::Object.scan(&ctx, "a:1;b:2 rest", ScanMode::Sequential);
        assert_eq!(
            r.value,
            Some(ArgValue::Fields(vec![
                ("a".into(), "1".into()),
                ("b".into(), "2".into()),
            ]))
        );
        assert_eq!(r.next_pos, 7);
    }

    #[test]
    fn test_object_without_colon() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg);
        let r = ArgScanner::Object.scan(&ctx, "plain words", ScanMode::Sequential);
        assert_eq!(r.value, None);
        assert_eq!(r.next_pos, 0);
    }

    #[test]
    fn test_subject_list_dedupes() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg);
        let r = ArgScanner::SubjectList.scan(&ctx, "<@1> <@&2>, <@1> 3", ScanMode::Sequential);
        let set = r.value.as_ref().and_then(ArgValue::as_entities).unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.contains(&EntityRef::new(MentionKind::User, 1)));
        assert!(set.contains(&EntityRef::new(MentionKind::Role, 2)));
        assert!(set.contains(&EntityRef::new(MentionKind::Bare, 3)));
    }

    #[test]
    fn test_channel_list_stops_at_foreign_token() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg);
        let r = ArgScanner::ChannelList.scan(&ctx, "<#5> <#6> now", ScanMode::Sequential);
        let set = r.value.as_ref().and_then(ArgValue::as_channels).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(r.next_pos, 9);

        // A user mention is not a channel.
        let r = ArgScanner::ChannelList.scan(&ctx, "<@5>", ScanMode::Sequential);
        assert_eq!(r.value, None);
    }

    #[test]
    fn test_time_scan_appends_timezone() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg).with_timezone(120);
        let r = ArgScanner::Time.scan(&ctx, "at 14:30 then stuff", ScanMode::Sequential);
        let expr = r.value.as_ref().and_then(ArgValue::as_time).unwrap();
        assert_eq!(expr.get(ShiftUnit::Timezone), Some(Amount::Value(120)));
        // Auto-completed one-shot: coarser fields are concrete.
        assert!(!expr.has_wildcard());
        assert_eq!(r.next_pos, "at 14:30".len());
    }

    #[test]
    fn test_time_scan_distance_untouched_by_timezone() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg).with_timezone(120);
        let r = ArgScanner::Time.scan(&ctx, "3h 20m", ScanMode::Sequential);
        let expr = r.value.as_ref().and_then(ArgValue::as_time).unwrap();
        assert_eq!(expr.get(ShiftUnit::Timezone), None);
        assert_eq!(expr.total_ms_shift(), Some(12_000_000));
    }

    #[test]
    fn test_next_pos_invariant() {
        let (catalog, msg) = ctx_parts();
        let ctx = ScanContext::new(&catalog, &msg);
        let scanners = [
            ArgScanner::Simple,
            ArgScanner::FullText,
            ArgScanner::Array(Separator::Comma),
            ArgScanner::Array(Separator::Space),
            ArgScanner::Boolean,
            ArgScanner::Object,
            ArgScanner::ChannelList,
            ArgScanner::SubjectList,
            ArgScanner::Time,
        ];
        let inputs = ["", " ", "x", "a b c", "\"open", "a:1;b", "<#1>,", "3h x"];
        for scanner in scanners {
            for text in inputs {
                for mode in [ScanMode::ByName, ScanMode::Sequential] {
                    let r = scanner.scan(&ctx, text, mode);
                    assert!(r.next_pos <= text.len(), "{scanner:?} on {text:?}");
                }
            }
        }
    }
}
