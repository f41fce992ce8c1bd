pub mod budget;
pub mod entitlement;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod page;
pub mod rule;

pub use budget::{Budget, BudgetType, CalendarPeriod, RollingUnit, RuleData};
pub use entitlement::{Entitlements, Sku};
pub use error::FetchError;
pub use fetch::{EntitlementFetcher, RuleFetcher, StaticFetcher};
pub use geo::{GeoField, GeoSignal};
pub use page::{EvaluationResult, PageViewRequest};
pub use rule::{Condition, Rule, RuleId, RuleSet, RuleType};
