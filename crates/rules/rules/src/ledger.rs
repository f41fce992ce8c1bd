//! Budget accounting for rules.
//!
//! Every rule that has been evaluated owns a [`RuleData`] entry counting the
//! views consumed in the current window. The ledger decides when that
//! window ends, either after a rolling amount of elapsed time or at a
//! calendar boundary (start of month, or a configured weekday).

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeDelta, Utc, Weekday};
use chrono_tz::Tz;
use tracing::{debug, warn};

use paygate_core::{Budget, BudgetType, CalendarPeriod, RollingUnit, RuleData};

use crate::error::RuleError;

/// Weekday used when a weekly budget names an unknown day.
const FALLBACK_WEEKDAY: Weekday = Weekday::Sun;

/// Parse a weekday name such as `"Sunday"` or `"sun"` (case-insensitive).
pub fn parse_weekday(name: &str) -> Result<Weekday, RuleError> {
    name.trim()
        .parse::<Weekday>()
        .map_err(|_| RuleError::InvalidWeekday(name.to_owned()))
}

/// Applies budget reset policies in a fixed timezone.
///
/// Calendar boundaries (month starts, weekdays) are computed in the
/// ledger's timezone; rolling windows are timezone-independent.
#[derive(Debug, Clone, Copy)]
pub struct BudgetLedger {
    timezone: Tz,
}

impl Default for BudgetLedger {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl BudgetLedger {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Build a ledger from an IANA timezone name (e.g. `"America/New_York"`).
    pub fn with_timezone_name(name: &str) -> Result<Self, RuleError> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| RuleError::InvalidTimezone(name.to_owned()))
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// A fresh ledger entry whose window starts at `now`.
    pub fn start(&self, now: DateTime<Utc>) -> RuleData {
        RuleData::new(now, self.weekday_number(now))
    }

    /// Decide whether `data`'s window has ended at `now`.
    ///
    /// Returns `(true, reset_entry)` when it has, otherwise `(false, data)`
    /// unchanged. A `now` at or before the last reset never resets, which
    /// keeps `last_reset_at` non-decreasing.
    pub fn check_reset_counters(
        &self,
        data: &RuleData,
        budget: &Budget,
        now: DateTime<Utc>,
    ) -> (bool, RuleData) {
        if self.window_elapsed(data.last_reset_at, budget, now) {
            debug!(
                last_reset_at = %data.last_reset_at,
                %now,
                counter = data.counter,
                "budget window elapsed, resetting"
            );
            (true, self.start(now))
        } else {
            (false, data.clone())
        }
    }

    /// Returns `true` if the entry has consumed its allowance.
    pub fn check_over_budget(data: &RuleData, limit: u32) -> bool {
        data.counter >= limit
    }

    /// Returns `true` if `page_id` has not been counted in the current window.
    pub fn check_not_viewed(data: &RuleData, page_id: &str) -> bool {
        !data.has_viewed(page_id)
    }

    fn window_elapsed(&self, last: DateTime<Utc>, budget: &Budget, now: DateTime<Utc>) -> bool {
        if now <= last {
            return false;
        }

        match budget.budget_type {
            BudgetType::Rolling => {
                let elapsed = now - last;
                let amount = i64::from(budget.rolling_amount);
                match budget.rolling_unit {
                    RollingUnit::Days => elapsed >= TimeDelta::days(amount),
                    RollingUnit::Hours => elapsed > TimeDelta::hours(amount),
                }
            }
            BudgetType::Calendar => {
                let now = now.with_timezone(&self.timezone);
                let last = last.with_timezone(&self.timezone);
                match budget.calendar_period {
                    CalendarPeriod::Monthly => {
                        (now.year(), now.month()) > (last.year(), last.month())
                    }
                    CalendarPeriod::Weekly => {
                        if now.year() != last.year() {
                            return true;
                        }
                        let weekday = parse_weekday(&budget.calendar_weekday).unwrap_or_else(|e| {
                            warn!(error = %e, fallback = %FALLBACK_WEEKDAY, "weekly budget weekday");
                            FALLBACK_WEEKDAY
                        });
                        last.date_naive() < most_recent(weekday, now.date_naive())
                    }
                }
            }
        }
    }

    fn weekday_number(&self, at: DateTime<Utc>) -> u32 {
        at.with_timezone(&self.timezone)
            .weekday()
            .number_from_sunday()
    }
}

/// The latest date on or before `date` that falls on `weekday`.
fn most_recent(weekday: Weekday, date: NaiveDate) -> NaiveDate {
    let back = (7 + date.weekday().num_days_from_sunday() - weekday.num_days_from_sunday()) % 7;
    date.checked_sub_days(Days::new(u64::from(back)))
        .unwrap_or(NaiveDate::MIN)
}
