use paygate_core::{Entitlements, Rule};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::RuleError;

/// Sku held by every viewer on the free tier. Holding it never exempts.
pub const DEFAULT_FREE_TIER_SKU: &str = "guest";

/// Marker a rule lists in its excluded skus to exempt every logged-in viewer.
pub const DEFAULT_REGISTERED_SKU: &str = "registered";

/// Whether a rule's sku exclusion applies to the viewer, and through which sku.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntitlementCheck {
    pub excluded: bool,
    pub sku: Option<String>,
}

impl EntitlementCheck {
    /// The rule's exclusion does not apply to this viewer.
    pub fn not_excluded() -> Self {
        Self::default()
    }

    /// The viewer matched the rule's exclusion list through `sku`.
    pub fn excluded_by(sku: impl Into<String>) -> Self {
        Self {
            excluded: true,
            sku: Some(sku.into()),
        }
    }

    /// Parse the positional wire form `[excluded, sku]`.
    ///
    /// The first element must be a boolean and the second a string or
    /// `null`. Anything else is rejected.
    pub fn from_positional(params: &[Value]) -> Result<Self, RuleError> {
        let [excluded, sku, ..] = params else {
            return Err(RuleError::MalformedEntitlementParams(format!(
                "expected at least 2 elements, got {}",
                params.len()
            )));
        };
        let excluded = excluded.as_bool().ok_or_else(|| {
            RuleError::MalformedEntitlementParams(format!("expected boolean flag, got {excluded}"))
        })?;
        let sku = match sku {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => {
                return Err(RuleError::MalformedEntitlementParams(format!(
                    "expected sku string, got {other}"
                )));
            }
        };
        Ok(Self { excluded, sku })
    }
}

/// Decides whether a viewer's entitlements take them out of a rule.
///
/// A `true` result keeps the rule in force for the viewer; `false` means the
/// viewer holds a sku that exempts them.
#[derive(Debug, Clone)]
pub struct EntitlementEvaluator {
    free_tier_sku: String,
    registered_sku: String,
}

impl Default for EntitlementEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_FREE_TIER_SKU, DEFAULT_REGISTERED_SKU)
    }
}

impl EntitlementEvaluator {
    pub fn new(free_tier_sku: impl Into<String>, registered_sku: impl Into<String>) -> Self {
        Self {
            free_tier_sku: free_tier_sku.into(),
            registered_sku: registered_sku.into(),
        }
    }

    pub fn free_tier_sku(&self) -> &str {
        &self.free_tier_sku
    }

    /// Evaluate a typed check.
    pub fn evaluate(&self, check: &EntitlementCheck) -> bool {
        if !check.excluded {
            return true;
        }
        match check.sku.as_deref() {
            None => true,
            Some(sku) => sku == self.free_tier_sku,
        }
    }

    /// Evaluate the positional form, failing open.
    ///
    /// Malformed input keeps the rule in force instead of surfacing an
    /// error to the page.
    pub fn evaluate_positional(&self, params: &[Value]) -> bool {
        match EntitlementCheck::from_positional(params) {
            Ok(check) => self.evaluate(&check),
            Err(e) => {
                warn!(error = %e, "entitlement check failed (fail-open)");
                true
            }
        }
    }

    /// Derive the check for a viewer against `rule`.
    ///
    /// A paid sku in the rule's exclusion list wins over the free-tier sku.
    /// Failing that, a logged-in viewer is excluded through the registered
    /// marker when the rule lists it; anonymous viewers never are.
    pub fn check_for_viewer(
        &self,
        rule: &Rule,
        entitlements: &Entitlements,
        logged_in: bool,
    ) -> EntitlementCheck {
        if rule.excluded_skus.is_empty() {
            return EntitlementCheck::not_excluded();
        }

        let mut free_tier_match = None;
        for sku in &entitlements.skus {
            if !rule.excluded_skus.contains(&sku.id) {
                continue;
            }
            if sku.id == self.free_tier_sku {
                free_tier_match = Some(&sku.id);
            } else {
                debug!(rule = rule.id, sku = %sku.id, "viewer holds excluded sku");
                return EntitlementCheck::excluded_by(sku.id.clone());
            }
        }

        if logged_in && rule.excluded_skus.contains(&self.registered_sku) {
            return EntitlementCheck::excluded_by(self.registered_sku.clone());
        }

        free_tier_match.map_or_else(EntitlementCheck::not_excluded, |sku| {
            EntitlementCheck::excluded_by(sku.clone())
        })
    }

    /// Returns `true` if `rule` still applies to the viewer.
    pub fn rule_applies(&self, rule: &Rule, entitlements: &Entitlements, logged_in: bool) -> bool {
        self.evaluate(&self.check_for_viewer(rule, entitlements, logged_in))
    }
}
