use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use paygate_core::{EntitlementFetcher, RuleFetcher, StaticFetcher};
use paygate_rules::{BudgetLedger, EntitlementEvaluator};
use paygate_state::StateStore;

use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::manager::{PaywallManager, Phase};
use crate::metrics::EvaluationMetrics;

/// Fluent builder for constructing a [`PaywallManager`].
///
/// A [`StateStore`] and a [`RuleFetcher`] must be supplied. Without an
/// entitlement fetcher, logged-in viewers fall back to cached entitlements.
pub struct PaywallManagerBuilder {
    store: Option<Arc<dyn StateStore>>,
    rule_fetcher: Option<Arc<dyn RuleFetcher>>,
    entitlement_fetcher: Option<Arc<dyn EntitlementFetcher>>,
    config: ManagerConfig,
}

impl PaywallManagerBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            rule_fetcher: None,
            entitlement_fetcher: None,
            config: ManagerConfig::default(),
        }
    }

    /// Set the state store implementation.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn rule_fetcher(mut self, fetcher: Arc<dyn RuleFetcher>) -> Self {
        self.rule_fetcher = Some(fetcher);
        self
    }

    #[must_use]
    pub fn entitlement_fetcher(mut self, fetcher: Arc<dyn EntitlementFetcher>) -> Self {
        self.entitlement_fetcher = Some(fetcher);
        self
    }

    /// Use one collaborator for both documents.
    #[must_use]
    pub fn fetcher<F>(self, fetcher: Arc<F>) -> Self
    where
        F: RuleFetcher + EntitlementFetcher + 'static,
    {
        let rules: Arc<dyn RuleFetcher> = Arc::clone(&fetcher) as Arc<dyn RuleFetcher>;
        self.rule_fetcher(rules).entitlement_fetcher(fetcher)
    }

    #[must_use]
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Consume the builder and produce a [`PaywallManager`].
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Configuration`] if a required collaborator is
    /// missing or the configured timezone is unknown.
    pub fn build(self) -> Result<PaywallManager, ManagerError> {
        let store = self
            .store
            .ok_or_else(|| ManagerError::Configuration("state store is required".into()))?;

        let rule_fetcher = self
            .rule_fetcher
            .ok_or_else(|| ManagerError::Configuration("rule fetcher is required".into()))?;

        let entitlement_fetcher = self
            .entitlement_fetcher
            .unwrap_or_else(|| Arc::new(StaticFetcher::new()));

        let ledger = match self.config.timezone.as_deref() {
            Some(name) => BudgetLedger::with_timezone_name(name)
                .map_err(|e| ManagerError::Configuration(e.to_string()))?,
            None => BudgetLedger::default(),
        };

        let entitlement_evaluator = EntitlementEvaluator::new(
            self.config.free_tier_sku.clone(),
            self.config.registered_sku.clone(),
        );

        Ok(PaywallManager {
            store,
            rule_fetcher,
            entitlement_fetcher,
            config: self.config,
            ledger,
            entitlement_evaluator,
            phase: Mutex::new(Phase::Uninitialized),
            snapshot: RwLock::new(None),
            rule_locks: DashMap::new(),
            metrics: Arc::new(EvaluationMetrics::default()),
        })
    }
}

impl Default for PaywallManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
