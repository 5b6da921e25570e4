//! Time window arithmetic.
//!
//! Pure functions that turn an alarm's wall-clock [`TimeOfDay`] into concrete
//! instants in a given time zone. The same offsets drive both notification
//! scheduling and catch-up detection on launch.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone};

use crate::alarm::TimeOfDay;

/// Number of notifications scheduled per alarm activation (primary + repeats).
///
/// Fixed, not derived from `max_attempts` or the snooze interval. With a
/// large snooze interval the last repeat can land far from the primary
/// trigger; callers that need a different horizon pass their own budget.
pub const REPEAT_BUDGET: u32 = 10;

/// The span during which an alarm is still considered ringing.
///
/// Both ends are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWindow<Tz: TimeZone> {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl<Tz: TimeZone> ActiveWindow<Tz> {
    pub fn contains(&self, instant: &DateTime<Tz>) -> bool {
        self.start <= *instant && *instant <= self.end
    }
}

/// The occurrence of `time` on the given local calendar date.
///
/// Ambiguous local times (DST fall-back) resolve to the earlier instant;
/// nonexistent ones (DST spring-forward gap) to the first valid minute after
/// the gap.
pub fn occurrence_on<Tz: TimeZone>(time: TimeOfDay, date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    resolve_local(tz, date.and_time(time.to_naive_time()))
}

/// Next instant matching `time`: today if still ahead of `now`, otherwise
/// tomorrow.
pub fn primary_trigger<Tz: TimeZone>(time: TimeOfDay, now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    let candidate = occurrence_on(time, today, &tz);
    if candidate > *now {
        return candidate;
    }
    match today.succ_opt() {
        Some(tomorrow) => occurrence_on(time, tomorrow, &tz),
        None => candidate + Duration::days(1),
    }
}

/// Fire time of the repeat at `index`, counted from the primary trigger.
pub fn repeat_trigger<Tz: TimeZone>(
    primary: &DateTime<Tz>,
    index: u32,
    snooze_minutes: u32,
) -> DateTime<Tz> {
    primary.clone() + Duration::minutes(i64::from(index) * i64::from(snooze_minutes))
}

/// Today's active window for `time`.
///
/// `start` is today's occurrence (even if it already passed) and `end` is
/// the fire time of the last repeat, `start + snooze * (budget - 1)`.
pub fn active_window<Tz: TimeZone>(
    time: TimeOfDay,
    snooze_minutes: u32,
    repeat_budget: u32,
    now: &DateTime<Tz>,
) -> ActiveWindow<Tz> {
    let start = occurrence_on(time, now.date_naive(), &now.timezone());
    let end = repeat_trigger(&start, repeat_budget.saturating_sub(1), snooze_minutes);
    ActiveWindow { start, end }
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt;
    }
    // DST gaps are at most a few hours; walk forward to the first valid minute.
    let mut probe = naive;
    for _ in 0..(24 * 60) {
        probe += Duration::minutes(1);
        if let Some(dt) = tz.from_local_datetime(&probe).earliest() {
            return dt;
        }
    }
    tz.from_utc_datetime(&naive)
}
