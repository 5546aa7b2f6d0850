//! The temporal expression model.

use super::clock::WallClock;
use crate::localize::Localizer;
use serde::{Deserialize, Serialize};

/// What a temporal expression denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeKind {
    /// A relative shift from "now" (`3h 20m`).
    Distance,
    /// A one-shot calendar moment (`at 14:30`).
    Schedule,
    /// A recurring calendar pattern (`every monday 09:00`).
    RecurringSchedule,
}

/// One calendar/duration granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftUnit {
    /// A named time-of-day literal (midnight, noon).
    Predefined,
    /// Milliseconds.
    Milliseconds,
    /// Seconds.
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
    /// ISO weekday, 1 = Monday .. 7 = Sunday.
    DayOfWeek,
    /// Day of month.
    Days,
    /// Whole weeks (distances only).
    Weeks,
    /// Month of year.
    Months,
    /// Calendar year.
    Years,
    /// UTC offset in minutes east, attached from org settings.
    Timezone,
}

/// Calendar-field units in fill order, finest first. Predefined, weeks,
/// timezone and weekday are never auto-filled.
pub(crate) const FILL_ORDER: [ShiftUnit; 7] = [
    ShiftUnit::Milliseconds,
    ShiftUnit::Seconds,
    ShiftUnit::Minutes,
    ShiftUnit::Hours,
    ShiftUnit::Days,
    ShiftUnit::Months,
    ShiftUnit::Years,
];

/// Predefined literal table: localizer key and the hour it anchors to.
pub(crate) const PREDEFINED: &[(&str, i64)] =
    &[("time.predefined.midnight", 0), ("time.predefined.noon", 12)];

impl ShiftUnit {
    /// Granularity rank among calendar fields (0 = milliseconds up to
    /// 6 = years). `None` for units that are not calendar fields.
    #[must_use]
    pub(crate) const fn rank(self) -> Option<u8> {
        match self {
            Self::Milliseconds => Some(0),
            Self::Seconds => Some(1),
            Self::Minutes => Some(2),
            Self::Hours => Some(3),
            Self::Days => Some(4),
            Self::Months => Some(5),
            Self::Years => Some(6),
            _ => None,
        }
    }

    /// Smallest legal value, used when auto-filling finer units.
    #[must_use]
    pub(crate) const fn recurrence_min(self) -> i64 {
        match self {
            Self::Days | Self::Months => 1,
            _ => 0,
        }
    }

    /// Largest legal value before a carry into the next coarser unit.
    /// Days use a flat 31 regardless of month — deliberate, see module
    /// docs of [`super::clock`].
    #[must_use]
    pub(crate) const fn recurrence_max(self) -> Option<i64> {
        match self {
            Self::Milliseconds => Some(999),
            Self::Seconds | Self::Minutes => Some(59),
            Self::Hours => Some(23),
            Self::Days => Some(31),
            Self::Months => Some(12),
            _ => None,
        }
    }

    /// Millisecond multiplier for distance expressions. Months and years
    /// are calendar-naive (30 and 365 days).
    #[must_use]
    pub(crate) const fn distance_ms(self) -> Option<i64> {
        match self {
            Self::Milliseconds => Some(1),
            Self::Seconds => Some(1_000),
            Self::Minutes => Some(60_000),
            Self::Hours => Some(3_600_000),
            Self::Days => Some(86_400_000),
            Self::Weeks => Some(604_800_000),
            Self::Months => Some(2_592_000_000),
            Self::Years => Some(31_536_000_000),
            _ => None,
        }
    }

    /// Localizer key of the `<integer><suffix>` suffix for this unit.
    #[must_use]
    pub(crate) const fn suffix_key(self) -> Option<&'static str> {
        match self {
            Self::Milliseconds => Some("time.unit.milliseconds"),
            Self::Seconds => Some("time.unit.seconds"),
            Self::Minutes => Some("time.unit.minutes"),
            Self::Hours => Some("time.unit.hours"),
            Self::Days => Some("time.unit.days"),
            Self::Weeks => Some("time.unit.weeks"),
            Self::Months => Some("time.unit.months"),
            Self::Years => Some("time.unit.years"),
            _ => None,
        }
    }

    /// Whether the unit is a plain duration (legal in a Distance).
    #[must_use]
    pub(crate) const fn is_duration(self) -> bool {
        self.distance_ms().is_some()
    }
}

/// A unit amount: concrete, or the `*` wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Amount {
    /// A concrete value.
    Value(i64),
    /// Match/cycle through any value of the unit.
    Wildcard,
}

impl Amount {
    /// `true` for the wildcard.
    #[must_use]
    pub const fn is_wildcard(self) -> bool {
        matches!(self, Self::Wildcard)
    }

    /// The concrete value, if any.
    #[must_use]
    pub const fn value(self) -> Option<i64> {
        match self {
            Self::Value(v) => Some(v),
            Self::Wildcard => None,
        }
    }
}

/// One unit with its amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeField {
    /// The granularity.
    pub unit: ShiftUnit,
    /// The amount for that granularity.
    pub amount: Amount,
}

impl TimeField {
    /// Shorthand for a concrete field.
    #[must_use]
    pub const fn value(unit: ShiftUnit, v: i64) -> Self {
        Self {
            unit,
            amount: Amount::Value(v),
        }
    }

    /// Shorthand for a wildcard field.
    #[must_use]
    pub const fn wildcard(unit: ShiftUnit) -> Self {
        Self {
            unit,
            amount: Amount::Wildcard,
        }
    }
}

/// A parsed temporal expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeExpr {
    kind: TimeKind,
    fields: Vec<TimeField>,
}

impl TimeExpr {
    /// Create an empty expression of the given kind.
    #[must_use]
    pub const fn new(kind: TimeKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    /// The expression kind.
    #[must_use]
    pub const fn kind(&self) -> TimeKind {
        self.kind
    }

    /// The accumulated fields, in parse order.
    #[must_use]
    pub fn fields(&self) -> &[TimeField] {
        &self.fields
    }

    /// The amount for a unit, if that unit is set.
    #[must_use]
    pub fn get(&self, unit: ShiftUnit) -> Option<Amount> {
        self.fields.iter().find(|f| f.unit == unit).map(|f| f.amount)
    }

    /// Whether adding `candidate` would keep the expression valid.
    ///
    /// Checks all structural invariants against the union of existing and
    /// candidate fields: at most one field per unit; Predefined co-occurs
    /// with nothing; DayOfWeek excludes Days/Weeks/Months/Years; Distance
    /// expressions hold only concrete duration units; schedules never hold
    /// Weeks.
    #[must_use]
    pub fn accepts(&self, candidate: &[TimeField]) -> bool {
        let union: Vec<&TimeField> = self.fields.iter().chain(candidate.iter()).collect();

        for (i, field) in union.iter().enumerate() {
            if union[..i].iter().any(|f| f.unit == field.unit) {
                return false;
            }
        }

        let has = |unit: ShiftUnit| union.iter().any(|f| f.unit == unit);

        if has(ShiftUnit::Predefined) && union.len() > 1 {
            return false;
        }
        if has(ShiftUnit::DayOfWeek)
            && (has(ShiftUnit::Days)
                || has(ShiftUnit::Weeks)
                || has(ShiftUnit::Months)
                || has(ShiftUnit::Years))
        {
            return false;
        }

        match self.kind {
            TimeKind::Distance => union
                .iter()
                .all(|f| f.unit.is_duration() && !f.amount.is_wildcard()),
            TimeKind::Schedule | TimeKind::RecurringSchedule => !has(ShiftUnit::Weeks),
        }
    }

    /// Append fields after an [`accepts`](Self::accepts) check. Returns
    /// `false` (and leaves the expression untouched) when the union would
    /// be invalid.
    pub fn push(&mut self, candidate: Vec<TimeField>) -> bool {
        if !self.accepts(&candidate) {
            return false;
        }
        self.fields.extend(candidate);
        true
    }

    /// Whether any field carries a wildcard amount. Drives the
    /// reschedule-vs-delete decision after a task fires.
    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.fields.iter().any(|f| f.amount.is_wildcard())
    }

    /// Total millisecond shift of a Distance expression. `None` for the
    /// other kinds.
    #[must_use]
    pub fn total_ms_shift(&self) -> Option<i64> {
        if self.kind != TimeKind::Distance {
            return None;
        }
        let mut total: i64 = 0;
        for field in &self.fields {
            let mult = field.unit.distance_ms()?;
            total = total.saturating_add(field.amount.value().unwrap_or(0).saturating_mul(mult));
        }
        Some(total)
    }

    /// Fields with Predefined expanded to its concrete clock anchor
    /// (hour plus zeroed minutes/seconds/milliseconds).
    #[must_use]
    pub fn effective_fields(&self) -> Vec<TimeField> {
        let mut out = Vec::with_capacity(self.fields.len() + 3);
        for field in &self.fields {
            if field.unit == ShiftUnit::Predefined {
                let idx = usize::try_from(field.amount.value().unwrap_or(0)).unwrap_or(0);
                let hour = PREDEFINED.get(idx).map_or(0, |(_, h)| *h);
                out.push(TimeField::value(ShiftUnit::Hours, hour));
                out.push(TimeField::value(ShiftUnit::Minutes, 0));
                out.push(TimeField::value(ShiftUnit::Seconds, 0));
                out.push(TimeField::value(ShiftUnit::Milliseconds, 0));
            } else {
                out.push(*field);
            }
        }
        out
    }

    /// Fill unset calendar fields of a schedule.
    ///
    /// Only applies to Schedule/RecurringSchedule with at least one field
    /// that is neither Predefined nor Timezone. Units finer than the
    /// finest explicitly-set one get their recurrence minimum; coarser
    /// unset units get the current wall-clock value (Schedule) or a
    /// wildcard (RecurringSchedule). Predefined, Weeks, Timezone and
    /// DayOfWeek are never filled; Days is skipped when DayOfWeek is set.
    pub fn auto_complete(&mut self, now: &WallClock) {
        if self.kind == TimeKind::Distance {
            return;
        }
        let has_base = self
            .fields
            .iter()
            .any(|f| !matches!(f.unit, ShiftUnit::Predefined | ShiftUnit::Timezone));
        if !has_base {
            return;
        }

        // DayOfWeek pins day granularity for the fill threshold.
        let threshold = self
            .fields
            .iter()
            .filter_map(|f| match f.unit {
                ShiftUnit::DayOfWeek => ShiftUnit::Days.rank(),
                unit => unit.rank(),
            })
            .min();
        let Some(threshold) = threshold else { return };
        let has_weekday = self.get(ShiftUnit::DayOfWeek).is_some();

        for unit in FILL_ORDER {
            if self.get(unit).is_some() {
                continue;
            }
            if unit == ShiftUnit::Days && has_weekday {
                continue;
            }
            let Some(rank) = unit.rank() else { continue };
            let amount = if rank < threshold {
                Amount::Value(unit.recurrence_min())
            } else if self.kind == TimeKind::Schedule {
                Amount::Value(now.get(unit))
            } else {
                Amount::Wildcard
            };
            self.fields.push(TimeField { unit, amount });
        }
    }

    /// Re-express a Distance as a fully concrete one-shot Schedule at
    /// `now + total_ms_shift`. `None` for non-Distance kinds.
    #[must_use]
    pub fn to_schedule(&self, now: &WallClock) -> Option<Self> {
        let shift = self.total_ms_shift()?;
        let target = now
            .to_naive()
            .and_then(|dt| dt.checked_add_signed(chrono::Duration::milliseconds(shift)))
            .map(WallClock::from_naive)?;

        let mut fields = Vec::with_capacity(7);
        for unit in FILL_ORDER {
            fields.push(TimeField::value(unit, target.get(unit)));
        }
        // Preserve an attached timezone so the schedule stays pinned to
        // the org's zone.
        if let Some(tz) = self.get(ShiftUnit::Timezone) {
            fields.push(TimeField {
                unit: ShiftUnit::Timezone,
                amount: tz,
            });
        }
        Some(Self {
            kind: TimeKind::Schedule,
            fields,
        })
    }

    /// Render a normalized textual form that parses back to an
    /// equivalent expression.
    #[must_use]
    pub fn to_text(&self, catalog: &dyn Localizer) -> String {
        let mut parts: Vec<String> = Vec::new();

        match self.kind {
            TimeKind::Distance => {
                // Coarse to fine, `<n><suffix>` each.
                for unit in [
                    ShiftUnit::Years,
                    ShiftUnit::Months,
                    ShiftUnit::Weeks,
                    ShiftUnit::Days,
                    ShiftUnit::Hours,
                    ShiftUnit::Minutes,
                    ShiftUnit::Seconds,
                    ShiftUnit::Milliseconds,
                ] {
                    self.render_suffixed(catalog, unit, &mut parts);
                }
            }
            TimeKind::Schedule | TimeKind::RecurringSchedule => {
                let key = if self.kind == TimeKind::Schedule {
                    "time.kind.schedule"
                } else {
                    "time.kind.recurring"
                };
                parts.push(catalog.string(key));

                if let Some(Amount::Value(idx)) = self.get(ShiftUnit::Predefined) {
                    let idx = usize::try_from(idx).unwrap_or(0);
                    if let Some((lit_key, _)) = PREDEFINED.get(idx) {
                        parts.push(catalog.string(lit_key));
                    }
                }

                self.render_clock(catalog, &mut parts);

                if let Some(Amount::Value(dow)) = self.get(ShiftUnit::DayOfWeek) {
                    parts.push(catalog.string(&format!("time.weekday.{dow}")));
                }
                self.render_calendar(catalog, &mut parts);
                if let Some(tz) = self.get(ShiftUnit::Timezone) {
                    if let Some(mins) = tz.value() {
                        let sign = if mins < 0 { '-' } else { '+' };
                        let abs = mins.abs();
                        parts.push(format!("UTC{}{:02}:{:02}", sign, abs / 60, abs % 60));
                    }
                }
            }
        }
        parts.join(" ")
    }

    fn render_suffixed(&self, catalog: &dyn Localizer, unit: ShiftUnit, parts: &mut Vec<String>) {
        let (Some(amount), Some(key)) = (self.get(unit), unit.suffix_key()) else {
            return;
        };
        let suffix = catalog.string(key);
        match amount {
            Amount::Value(v) => parts.push(format!("{v}{suffix}")),
            Amount::Wildcard => parts.push(format!("{}{suffix}", super::WILDCARD)),
        }
    }

    /// Emit `H:MM[:SS]` when both hours and minutes are present,
    /// otherwise fall back to suffixed single fields.
    fn render_clock(&self, catalog: &dyn Localizer, parts: &mut Vec<String>) {
        let hours = self.get(ShiftUnit::Hours);
        let minutes = self.get(ShiftUnit::Minutes);
        let seconds = self.get(ShiftUnit::Seconds);

        let sub = |a: Amount| match a {
            Amount::Value(v) => format!("{v:02}"),
            Amount::Wildcard => super::WILDCARD.to_string(),
        };

        if let (Some(h), Some(m)) = (hours, minutes) {
            let mut clock = format!("{}:{}", sub(h), sub(m));
            if let Some(s) = seconds {
                if s != Amount::Value(0) {
                    clock.push(':');
                    clock.push_str(&sub(s));
                }
            }
            parts.push(clock);
        } else {
            // Partial clock state renders each field on its own.
            for unit in [ShiftUnit::Hours, ShiftUnit::Minutes, ShiftUnit::Seconds] {
                self.render_suffixed(catalog, unit, parts);
            }
        }
        if let Some(ms) = self.get(ShiftUnit::Milliseconds) {
            if ms != Amount::Value(0) {
                self.render_suffixed(catalog, ShiftUnit::Milliseconds, parts);
            }
        }
    }

    fn render_calendar(&self, catalog: &dyn Localizer, parts: &mut Vec<String>) {
        self.render_suffixed(catalog, ShiftUnit::Days, parts);
        match self.get(ShiftUnit::Months) {
            Some(Amount::Value(m)) => parts.push(catalog.string(&format!("time.month.{m}"))),
            Some(Amount::Wildcard) => self.render_suffixed(catalog, ShiftUnit::Months, parts),
            None => {}
        }
        self.render_suffixed(catalog, ShiftUnit::Years, parts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(y: i64, mo: i64, d: i64, h: i64, mi: i64) -> WallClock {
        WallClock {
            year: y,
            month: mo,
            day: d,
            hour: h,
            minute: mi,
            second: 0,
            milli: 0,
        }
    }

    #[test]
    fn test_duplicate_unit_rejected() {
        let mut expr = TimeExpr::new(TimeKind::Distance);
        assert!(expr.push(vec![TimeField::value(ShiftUnit::Hours, 3)]));
        assert!(!expr.push(vec![TimeField::value(ShiftUnit::Hours, 4)]));
        assert_eq!(expr.fields().len(), 1);
    }

    #[test]
    fn test_predefined_excludes_everything() {
        let mut expr = TimeExpr::new(TimeKind::Schedule);
        assert!(expr.push(vec![TimeField::value(ShiftUnit::Predefined, 0)]));
        assert!(!expr.push(vec![TimeField::value(ShiftUnit::Hours, 3)]));
    }

    #[test]
    fn test_weekday_excludes_coarser_units() {
        let mut expr = TimeExpr::new(TimeKind::RecurringSchedule);
        assert!(expr.push(vec![TimeField::value(ShiftUnit::DayOfWeek, 1)]));
        assert!(!expr.push(vec![TimeField::value(ShiftUnit::Days, 3)]));
        assert!(!expr.push(vec![TimeField::value(ShiftUnit::Months, 3)]));
        assert!(expr.push(vec![TimeField::value(ShiftUnit::Hours, 9)]));
    }

    #[test]
    fn test_distance_rejects_wildcards_and_calendar_units() {
        let mut expr = TimeExpr::new(TimeKind::Distance);
        assert!(!expr.push(vec![TimeField::wildcard(ShiftUnit::Hours)]));
        assert!(!expr.push(vec![TimeField::value(ShiftUnit::DayOfWeek, 1)]));
        assert!(!expr.push(vec![TimeField::value(ShiftUnit::Predefined, 0)]));
    }

    #[test]
    fn test_total_ms_shift() {
        let mut expr = TimeExpr::new(TimeKind::Distance);
        expr.push(vec![
            TimeField::value(ShiftUnit::Hours, 3),
            TimeField::value(ShiftUnit::Minutes, 20),
        ]);
        assert_eq!(expr.total_ms_shift(), Some(12_000_000));

        let sched = TimeExpr::new(TimeKind::Schedule);
        assert_eq!(sched.total_ms_shift(), None);
    }

    #[test]
    fn test_auto_complete_schedule_uses_now() {
        let now = clock(2026, 8, 6, 4, 0);
        let mut expr = TimeExpr::new(TimeKind::Schedule);
        expr.push(vec![TimeField::value(ShiftUnit::Hours, 3)]);
        expr.auto_complete(&now);

        // Finer than hours: zeroed. Coarser: copied from now.
        assert_eq!(expr.get(ShiftUnit::Minutes), Some(Amount::Value(0)));
        assert_eq!(expr.get(ShiftUnit::Seconds), Some(Amount::Value(0)));
        assert_eq!(expr.get(ShiftUnit::Milliseconds), Some(Amount::Value(0)));
        assert_eq!(expr.get(ShiftUnit::Days), Some(Amount::Value(6)));
        assert_eq!(expr.get(ShiftUnit::Months), Some(Amount::Value(8)));
        assert_eq!(expr.get(ShiftUnit::Years), Some(Amount::Value(2026)));
    }

    #[test]
    fn test_auto_complete_recurring_uses_wildcards() {
        let now = clock(2026, 8, 6, 4, 0);
        let mut expr = TimeExpr::new(TimeKind::RecurringSchedule);
        expr.push(vec![TimeField::value(ShiftUnit::Hours, 3)]);
        expr.auto_complete(&now);

        assert_eq!(expr.get(ShiftUnit::Minutes), Some(Amount::Value(0)));
        assert_eq!(expr.get(ShiftUnit::Days), Some(Amount::Wildcard));
        assert_eq!(expr.get(ShiftUnit::Months), Some(Amount::Wildcard));
        assert_eq!(expr.get(ShiftUnit::Years), Some(Amount::Wildcard));
        assert!(expr.has_wildcard());
    }

    #[test]
    fn test_auto_complete_skips_day_for_weekday() {
        let now = clock(2026, 8, 6, 4, 0);
        let mut expr = TimeExpr::new(TimeKind::RecurringSchedule);
        expr.push(vec![TimeField::value(ShiftUnit::DayOfWeek, 1)]);
        expr.auto_complete(&now);

        assert_eq!(expr.get(ShiftUnit::Days), None);
        // Weekday pins day granularity: time-of-day is zeroed.
        assert_eq!(expr.get(ShiftUnit::Hours), Some(Amount::Value(0)));
        assert_eq!(expr.get(ShiftUnit::Months), Some(Amount::Wildcard));
    }

    #[test]
    fn test_auto_complete_skips_predefined_only() {
        let now = clock(2026, 8, 6, 4, 0);
        let mut expr = TimeExpr::new(TimeKind::Schedule);
        expr.push(vec![TimeField::value(ShiftUnit::Predefined, 0)]);
        expr.auto_complete(&now);
        assert_eq!(expr.fields().len(), 1);
    }

    #[test]
    fn test_to_schedule() {
        let now = clock(2026, 8, 6, 22, 0);
        let mut expr = TimeExpr::new(TimeKind::Distance);
        expr.push(vec![TimeField::value(ShiftUnit::Hours, 3)]);

        let sched = expr.to_schedule(&now).unwrap();
        assert_eq!(sched.kind(), TimeKind::Schedule);
        // 22:00 + 3h crosses midnight.
        assert_eq!(sched.get(ShiftUnit::Days), Some(Amount::Value(7)));
        assert_eq!(sched.get(ShiftUnit::Hours), Some(Amount::Value(1)));
        assert!(!sched.has_wildcard());
    }

    #[test]
    fn test_effective_fields_expands_predefined() {
        let mut expr = TimeExpr::new(TimeKind::Schedule);
        expr.push(vec![TimeField::value(ShiftUnit::Predefined, 1)]);
        let fields = expr.effective_fields();
        assert!(fields.contains(&TimeField::value(ShiftUnit::Hours, 12)));
        assert!(fields.contains(&TimeField::value(ShiftUnit::Minutes, 0)));
    }
}
