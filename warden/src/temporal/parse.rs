//! Token parser for temporal expressions.
//!
//! Matching happens token by token against localized keywords; a token
//! that no matcher claims ends the expression (it belongs to the next
//! argument, not to us). Matchers run in fixed precedence: predefined
//! literal, then (for schedules) year / month name / weekday name /
//! timezone, then `HH:MM[:SS]` with per-sub-field wildcards, then generic
//! `<integer><unit-suffix>`.

use super::WILDCARD;
use super::expr::{Amount, PREDEFINED, ShiftUnit, TimeExpr, TimeField, TimeKind};
use crate::localize::Localizer;
use regex::Regex;

/// Parser over a localizer-provided keyword table.
pub struct TimeParser<'a> {
    catalog: &'a dyn Localizer,
    clock_re: Regex,
    tz_re: Regex,
}

impl std::fmt::Debug for TimeParser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeParser").finish_non_exhaustive()
    }
}

impl<'a> TimeParser<'a> {
    /// Create a parser. Compiles the two fixed patterns up front.
    #[must_use]
    pub fn new(catalog: &'a dyn Localizer) -> Self {
        // Both patterns are literals and cannot fail to compile.
        #[allow(clippy::expect_used)]
        Self {
            catalog,
            clock_re: Regex::new(r"^(\d{1,2}|\*):(\d{1,2}|\*)(?::(\d{1,2}|\*))?$")
                .expect("clock pattern"),
            tz_re: Regex::new(r"^(?:utc|gmt)?([+-])(\d{1,2})(?::(\d{2}))?$").expect("tz pattern"),
        }
    }

    /// Parse the longest temporal expression at the start of `text`.
    ///
    /// Returns the expression and the byte offset just past the last
    /// accepted token. `None` when `text` does not start with one.
    /// The result is raw: callers append the org timezone and run
    /// auto-completion themselves.
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<(TimeExpr, usize)> {
        let mut expr: Option<TimeExpr> = None;
        let mut consumed = 0usize;

        for (end, token) in tokens(text) {
            let lower = token.to_lowercase();

            let Some(e) = expr.as_mut() else {
                // First token: a kind keyword sets the kind and nothing
                // else; otherwise Distance is assumed and the token must
                // be a field.
                if let Some(kind) = self.match_kind(&lower) {
                    expr = Some(TimeExpr::new(kind));
                    consumed = end;
                    continue;
                }
                let mut first = TimeExpr::new(TimeKind::Distance);
                match self.field_token(&lower, first.kind()) {
                    Some(fields) if first.push(fields.clone()) => {
                        expr = Some(first);
                        consumed = end;
                        continue;
                    }
                    _ => return None,
                }
            };

            let accepted = self
                .field_token(&lower, e.kind())
                .is_some_and(|fields| e.push(fields));
            if accepted {
                consumed = end;
            } else {
                // This and all remaining tokens are not ours.
                break;
            }
        }

        match expr {
            Some(e) if !e.fields().is_empty() => Some((e, consumed)),
            _ => None,
        }
    }

    /// Dry-run: would `token` extend `expr` without breaking any
    /// structural invariant? Does not mutate.
    #[must_use]
    pub fn is_valid_time_def(&self, expr: &TimeExpr, token: &str) -> bool {
        self.field_token(&token.to_lowercase(), expr.kind())
            .is_some_and(|fields| expr.accepts(&fields))
    }

    fn match_kind(&self, token: &str) -> Option<TimeKind> {
        for (key, kind) in [
            ("time.kind.distance", TimeKind::Distance),
            ("time.kind.schedule", TimeKind::Schedule),
            ("time.kind.recurring", TimeKind::RecurringSchedule),
        ] {
            if token == self.catalog.string(key).to_lowercase() {
                return Some(kind);
            }
        }
        None
    }

    /// Match one lowercased token into candidate fields.
    fn field_token(&self, token: &str, kind: TimeKind) -> Option<Vec<TimeField>> {
        if let Some(fields) = self.match_predefined(token) {
            return Some(fields);
        }
        if kind != TimeKind::Distance {
            if let Some(fields) = self.match_calendar(token) {
                return Some(fields);
            }
        }
        if let Some(fields) = self.match_clock(token) {
            return Some(fields);
        }
        self.match_suffixed(token)
    }

    fn match_predefined(&self, token: &str) -> Option<Vec<TimeField>> {
        for (idx, (key, _)) in PREDEFINED.iter().enumerate() {
            if token == self.catalog.string(key).to_lowercase() {
                let idx = i64::try_from(idx).ok()?;
                return Some(vec![TimeField::value(ShiftUnit::Predefined, idx)]);
            }
        }
        None
    }

    /// Year, month name, weekday name or timezone offset.
    fn match_calendar(&self, token: &str) -> Option<Vec<TimeField>> {
        if token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit()) {
            let year: i64 = token.parse().ok()?;
            if (1970..=9999).contains(&year) {
                return Some(vec![TimeField::value(ShiftUnit::Years, year)]);
            }
        }
        for month in 1..=12i64 {
            if token == self.catalog.string(&format!("time.month.{month}")).to_lowercase() {
                return Some(vec![TimeField::value(ShiftUnit::Months, month)]);
            }
        }
        for day in 1..=7i64 {
            if token == self.catalog.string(&format!("time.weekday.{day}")).to_lowercase() {
                return Some(vec![TimeField::value(ShiftUnit::DayOfWeek, day)]);
            }
        }
        if let Some(caps) = self.tz_re.captures(token) {
            let sign: i64 = if &caps[1] == "-" { -1 } else { 1 };
            let hours: i64 = caps[2].parse().ok()?;
            let minutes: i64 = caps.get(3).map_or(Ok(0), |m| m.as_str().parse()).ok()?;
            if hours <= 14 && minutes <= 59 {
                return Some(vec![TimeField::value(
                    ShiftUnit::Timezone,
                    sign * (hours * 60 + minutes),
                )]);
            }
        }
        None
    }

    /// `HH:MM[:SS]`, each sub-field either digits or the wildcard.
    fn match_clock(&self, token: &str) -> Option<Vec<TimeField>> {
        let caps = self.clock_re.captures(token)?;

        let sub = |text: &str, max: i64| -> Option<Amount> {
            if text.len() == 1 && text.starts_with(WILDCARD) {
                return Some(Amount::Wildcard);
            }
            let v: i64 = text.parse().ok()?;
            (v <= max).then_some(Amount::Value(v))
        };

        let mut fields = vec![
            TimeField {
                unit: ShiftUnit::Hours,
                amount: sub(&caps[1], 23)?,
            },
            TimeField {
                unit: ShiftUnit::Minutes,
                amount: sub(&caps[2], 59)?,
            },
        ];
        if let Some(secs) = caps.get(3) {
            fields.push(TimeField {
                unit: ShiftUnit::Seconds,
                amount: sub(secs.as_str(), 59)?,
            });
        }
        Some(fields)
    }

    /// Generic `<integer><suffix>` (or `*<suffix>`) against the localized
    /// unit suffix table.
    fn match_suffixed(&self, token: &str) -> Option<Vec<TimeField>> {
        let (amount, rest) = if let Some(rest) = token.strip_prefix(WILDCARD) {
            (Amount::Wildcard, rest)
        } else {
            let digits_end = token
                .char_indices()
                .find(|(_, c)| !c.is_ascii_digit())
                .map_or(token.len(), |(i, _)| i);
            if digits_end == 0 {
                return None;
            }
            let value: i64 = token[..digits_end].parse().ok()?;
            (Amount::Value(value), &token[digits_end..])
        };
        if rest.is_empty() {
            return None;
        }

        for unit in [
            ShiftUnit::Milliseconds,
            ShiftUnit::Seconds,
            ShiftUnit::Minutes,
            ShiftUnit::Hours,
            ShiftUnit::Days,
            ShiftUnit::Weeks,
            ShiftUnit::Months,
            ShiftUnit::Years,
        ] {
            let key = unit.suffix_key()?;
            if rest == self.catalog.string(key).to_lowercase() {
                return Some(vec![TimeField { unit, amount }]);
            }
        }
        None
    }
}

/// Whitespace tokens with the byte offset just past each.
fn tokens(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(s) = start.take() {
                out.push((i, &text[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push((text.len(), &text[s..]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localize::StaticCatalog;

    fn parse(text: &str) -> Option<(TimeExpr, usize)> {
        let catalog = StaticCatalog::english();
        TimeParser::new(&catalog).parse(text)
    }

    #[test]
    fn test_distance_two_fields() {
        let (expr, consumed) = parse("3h 20m").unwrap();
        assert_eq!(expr.kind(), TimeKind::Distance);
        assert_eq!(expr.get(ShiftUnit::Hours), Some(Amount::Value(3)));
        assert_eq!(expr.get(ShiftUnit::Minutes), Some(Amount::Value(20)));
        assert_eq!(expr.total_ms_shift(), Some(12_000_000));
        assert_eq!(consumed, "3h 20m".len());
    }

    #[test]
    fn test_distance_keyword() {
        let (expr, _) = parse("in 45s").unwrap();
        assert_eq!(expr.kind(), TimeKind::Distance);
        assert_eq!(expr.get(ShiftUnit::Seconds), Some(Amount::Value(45)));
    }

    #[test]
    fn test_schedule_clock() {
        let (expr, _) = parse("at 14:30").unwrap();
        assert_eq!(expr.kind(), TimeKind::Schedule);
        assert_eq!(expr.get(ShiftUnit::Hours), Some(Amount::Value(14)));
        assert_eq!(expr.get(ShiftUnit::Minutes), Some(Amount::Value(30)));
    }

    #[test]
    fn test_recurring_weekday() {
        let (expr, _) = parse("every monday 09:00").unwrap();
        assert_eq!(expr.kind(), TimeKind::RecurringSchedule);
        assert_eq!(expr.get(ShiftUnit::DayOfWeek), Some(Amount::Value(1)));
        assert_eq!(expr.get(ShiftUnit::Hours), Some(Amount::Value(9)));
    }

    #[test]
    fn test_wildcard_clock() {
        let (expr, _) = parse("every *:30").unwrap();
        assert_eq!(expr.get(ShiftUnit::Hours), Some(Amount::Wildcard));
        assert_eq!(expr.get(ShiftUnit::Minutes), Some(Amount::Value(30)));
    }

    #[test]
    fn test_calendar_tokens() {
        let (expr, _) = parse("at january 5d 2027").unwrap();
        assert_eq!(expr.get(ShiftUnit::Months), Some(Amount::Value(1)));
        assert_eq!(expr.get(ShiftUnit::Days), Some(Amount::Value(5)));
        assert_eq!(expr.get(ShiftUnit::Years), Some(Amount::Value(2027)));
    }

    #[test]
    fn test_timezone_token() {
        let (expr, _) = parse("at 14:30 utc+02:00").unwrap();
        assert_eq!(expr.get(ShiftUnit::Timezone), Some(Amount::Value(120)));

        let (expr, _) = parse("at 9:00 gmt-5").unwrap();
        assert_eq!(expr.get(ShiftUnit::Timezone), Some(Amount::Value(-300)));
    }

    #[test]
    fn test_predefined_literal() {
        let (expr, _) = parse("at noon").unwrap();
        assert_eq!(expr.get(ShiftUnit::Predefined), Some(Amount::Value(1)));
    }

    #[test]
    fn test_stops_at_foreign_token() {
        let (expr, consumed) = parse("3h drink tea").unwrap();
        assert_eq!(expr.fields().len(), 1);
        assert_eq!(consumed, 2);
    }

    #[test]
    fn test_duplicate_unit_ends_expression() {
        let (expr, consumed) = parse("at 3h 4h").unwrap();
        assert_eq!(expr.get(ShiftUnit::Hours), Some(Amount::Value(3)));
        assert_eq!(consumed, "at 3h".len());
    }

    #[test]
    fn test_not_a_time() {
        assert!(parse("hello world").is_none());
        assert!(parse("").is_none());
        // A bare kind keyword with no fields is not an expression.
        assert!(parse("every").is_none());
    }

    #[test]
    fn test_wildcard_rejected_in_distance() {
        // `*h` cannot start a distance; nothing is parsed.
        assert!(parse("*h").is_none());
        let (expr, consumed) = parse("in 3h *m").unwrap();
        assert_eq!(expr.fields().len(), 1);
        assert_eq!(consumed, "in 3h".len());
    }

    #[test]
    fn test_clock_range_check() {
        assert!(parse("at 25:00").is_none());
        assert!(parse("at 14:75").is_none());
    }

    #[test]
    fn test_dry_run_does_not_mutate() {
        let catalog = StaticCatalog::english();
        let parser = TimeParser::new(&catalog);
        let (expr, _) = parser.parse("at 14:30").unwrap();

        assert!(parser.is_valid_time_def(&expr, "monday"));
        assert!(!parser.is_valid_time_def(&expr, "15:00"));
        assert_eq!(expr.fields().len(), 2);
    }

    #[test]
    fn test_single_field_distance_roundtrip() {
        let catalog = StaticCatalog::english();
        for text in ["3h", "20m", "45s", "2d", "1w", "6mo", "1y", "250ms"] {
            let (expr, _) = parse(text).unwrap();
            assert_eq!(expr.to_text(&catalog), text, "round-trip of {text}");
        }
    }

    #[test]
    fn test_schedule_roundtrip_equivalence() {
        let catalog = StaticCatalog::english();
        let parser = TimeParser::new(&catalog);
        let (expr, _) = parser.parse("every monday 09:00").unwrap();
        let rendered = expr.to_text(&catalog);
        let (reparsed, _) = parser.parse(&rendered).unwrap();

        assert_eq!(reparsed.kind(), expr.kind());
        assert_eq!(reparsed.fields().len(), expr.fields().len());
        for field in expr.fields() {
            assert_eq!(reparsed.get(field.unit), Some(field.amount), "{:?}", field.unit);
        }
    }
}
