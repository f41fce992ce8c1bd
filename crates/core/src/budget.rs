use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which reset strategy a budget uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetType {
    /// Reset after a fixed amount of elapsed time.
    #[default]
    Rolling,
    /// Reset on calendar boundaries (month or week).
    Calendar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarPeriod {
    #[default]
    Monthly,
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollingUnit {
    #[default]
    Days,
    Hours,
}

/// View-count reset schedule attached to a rule.
///
/// Only the branch selected by `budget_type` is consulted: the rolling
/// fields for [`BudgetType::Rolling`], the calendar fields otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    #[serde(rename = "type", default)]
    pub budget_type: BudgetType,
    #[serde(default)]
    pub calendar_period: CalendarPeriod,
    /// Weekday name on which weekly budgets reset (e.g. `"Sunday"`).
    #[serde(default = "default_weekday")]
    pub calendar_weekday: String,
    #[serde(default)]
    pub rolling_unit: RollingUnit,
    #[serde(default)]
    pub rolling_amount: u32,
}

fn default_weekday() -> String {
    "Sunday".to_owned()
}

impl Default for Budget {
    fn default() -> Self {
        Self::rolling_days(30)
    }
}

impl Budget {
    /// A rolling budget that resets after `amount` days.
    pub fn rolling_days(amount: u32) -> Self {
        Self {
            budget_type: BudgetType::Rolling,
            calendar_period: CalendarPeriod::default(),
            calendar_weekday: default_weekday(),
            rolling_unit: RollingUnit::Days,
            rolling_amount: amount,
        }
    }

    /// A rolling budget that resets after `amount` hours.
    pub fn rolling_hours(amount: u32) -> Self {
        Self {
            rolling_unit: RollingUnit::Hours,
            ..Self::rolling_days(amount)
        }
    }

    /// A calendar budget that resets at the start of every month.
    pub fn monthly() -> Self {
        Self {
            budget_type: BudgetType::Calendar,
            calendar_period: CalendarPeriod::Monthly,
            calendar_weekday: default_weekday(),
            rolling_unit: RollingUnit::default(),
            rolling_amount: 0,
        }
    }

    /// A calendar budget that resets each time `weekday` begins.
    pub fn weekly(weekday: impl Into<String>) -> Self {
        Self {
            calendar_period: CalendarPeriod::Weekly,
            calendar_weekday: weekday.into(),
            ..Self::monthly()
        }
    }
}

/// Ledger entry tracking one rule's consumption of its budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleData {
    pub counter: u32,
    pub last_reset_at: DateTime<Utc>,
    #[serde(default)]
    pub viewed_page_ids: Option<BTreeSet<String>>,
    /// Weekday of `last_reset_at`, 1 = Sunday through 7 = Saturday.
    #[serde(default)]
    pub last_reset_weekday: u32,
}

impl RuleData {
    /// A fresh entry whose window starts at `last_reset_at`.
    pub fn new(last_reset_at: DateTime<Utc>, last_reset_weekday: u32) -> Self {
        Self {
            counter: 0,
            last_reset_at,
            viewed_page_ids: None,
            last_reset_weekday,
        }
    }

    /// Returns `true` if `page_id` was already counted in the current window.
    pub fn has_viewed(&self, page_id: &str) -> bool {
        self.viewed_page_ids
            .as_ref()
            .is_some_and(|ids| ids.contains(page_id))
    }

    /// Count a view of `page_id`.
    pub fn record_view(&mut self, page_id: &str) {
        self.counter = self.counter.saturating_add(1);
        self.viewed_page_ids
            .get_or_insert_with(BTreeSet::new)
            .insert(page_id.to_owned());
    }
}
