//! Evaluation primitives for the paywall decision engine.
//!
//! - [`evaluate_conditions`] matches page attributes against a rule.
//! - [`evaluate_geo_conditions`] matches the viewer's geographic signal.
//! - [`EntitlementEvaluator`] decides whether the viewer's skus exempt them.
//! - [`BudgetLedger`] resets and checks per-rule view counters.
//!
//! The orchestration lives in `paygate-manager`.

pub mod engine;
pub mod error;
pub mod ledger;

pub use engine::condition::evaluate_conditions;
pub use engine::entitlement::{
    DEFAULT_FREE_TIER_SKU, DEFAULT_REGISTERED_SKU, EntitlementCheck, EntitlementEvaluator,
};
pub use engine::geo::evaluate_geo_conditions;
pub use error::RuleError;
pub use ledger::{BudgetLedger, parse_weekday};
