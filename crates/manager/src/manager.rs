use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use paygate_core::{
    EntitlementFetcher, Entitlements, EvaluationResult, FetchError, PageViewRequest, Rule,
    RuleData, RuleFetcher, RuleId, RuleSet, RuleType,
};
use paygate_rules::{
    BudgetLedger, EntitlementEvaluator, evaluate_conditions, evaluate_geo_conditions,
};
use paygate_state::{StateError, StateKey, StateStore};

use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::metrics::EvaluationMetrics;

/// Lifecycle phase of a [`PaywallManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initializing,
    Ready,
}

/// Where the active rule set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitSource {
    /// Both documents were fetched (or supplied by the caller).
    Network,
    /// Fetching failed and the persisted documents were used instead.
    Cache,
}

/// The documents evaluation runs against. Replaced wholesale on refresh.
#[derive(Debug)]
pub(crate) struct Snapshot {
    rules: RuleSet,
    entitlements: Entitlements,
    logged_in: bool,
}

/// Decides, per page view, whether the page is shown and which campaign
/// to present.
///
/// Built with [`PaywallManagerBuilder`](crate::PaywallManagerBuilder).
/// Until [`initialize`](Self::initialize) succeeds every page is shown.
pub struct PaywallManager {
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) rule_fetcher: Arc<dyn RuleFetcher>,
    pub(crate) entitlement_fetcher: Arc<dyn EntitlementFetcher>,
    pub(crate) config: ManagerConfig,
    pub(crate) ledger: BudgetLedger,
    pub(crate) entitlement_evaluator: EntitlementEvaluator,
    pub(crate) phase: Mutex<Phase>,
    pub(crate) snapshot: RwLock<Option<Arc<Snapshot>>>,
    pub(crate) rule_locks: DashMap<RuleId, Arc<Mutex<()>>>,
    pub(crate) metrics: Arc<EvaluationMetrics>,
}

impl PaywallManager {
    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &EvaluationMetrics {
        &self.metrics
    }

    /// Number of rules in the active rule set, if any.
    pub fn rule_count(&self) -> Option<usize> {
        self.snapshot.read().as_ref().map(|s| s.rules.len())
    }

    /// Fetch the rule set and entitlements, persist them and become ready.
    ///
    /// `cached_entitlements` short-circuits the entitlement fetch. When the
    /// rule fetch fails and `use_cached_paywall` is set, the persisted
    /// documents are used and [`InitSource::Cache`] is returned.
    ///
    /// Calling this on a ready manager refreshes it; on failure the previous
    /// rule set stays active.
    ///
    /// # Errors
    ///
    /// Fails when neither the network nor the cache yields usable documents,
    /// or when another initialization is running. A fetch that outlives
    /// `init_timeout_seconds` counts as a failed fetch.
    #[instrument(skip(self, cached_entitlements), fields(namespace = %self.config.namespace))]
    pub async fn initialize(
        &self,
        now: DateTime<Utc>,
        logged_in: bool,
        cached_entitlements: Option<Entitlements>,
    ) -> Result<InitSource, ManagerError> {
        let previous = {
            let mut phase = self.phase.lock();
            if *phase == Phase::Initializing {
                return Err(ManagerError::AlreadyInitializing);
            }
            std::mem::replace(&mut *phase, Phase::Initializing)
        };

        let deadline = Instant::now() + self.config.init_timeout();
        match self.load(logged_in, cached_entitlements, deadline).await {
            Ok((snapshot, source)) => {
                self.seed_ledger(&snapshot.rules, now);
                info!(rules = snapshot.rules.len(), ?source, "paywall initialized");
                *self.snapshot.write() = Some(Arc::new(snapshot));
                *self.phase.lock() = Phase::Ready;
                Ok(source)
            }
            Err(e) => {
                warn!(error = %e, "paywall initialization failed");
                let restored = if previous == Phase::Ready {
                    Phase::Ready
                } else {
                    Phase::Uninitialized
                };
                *self.phase.lock() = restored;
                Err(e)
            }
        }
    }

    async fn load(
        &self,
        logged_in: bool,
        cached_entitlements: Option<Entitlements>,
        deadline: Instant,
    ) -> Result<(Snapshot, InitSource), ManagerError> {
        match self.bounded(deadline, self.rule_fetcher.fetch_rules()).await {
            Ok(rules) => {
                match rules.to_document() {
                    Ok(document) => self.store_document(&self.key_rule_set(), &document),
                    Err(e) => self.persistence_failed(&self.key_rule_set(), &e),
                }
                let entitlements = self
                    .resolve_entitlements(logged_in, cached_entitlements, deadline)
                    .await?;
                Ok((
                    Snapshot {
                        rules,
                        entitlements,
                        logged_in,
                    },
                    InitSource::Network,
                ))
            }
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "rule fetch failed");
                if !self.config.use_cached_paywall {
                    return Err(ManagerError::RuleFetch(e));
                }
                let rules = self.load_document::<RuleSet>(&self.key_rule_set());
                let entitlements = cached_entitlements
                    .or_else(|| self.load_document::<Entitlements>(&self.key_entitlements()));
                match (rules, entitlements) {
                    (Some(rules), Some(entitlements)) => {
                        info!("using cached paywall");
                        self.metrics.increment_cache_fallbacks();
                        Ok((
                            Snapshot {
                                rules,
                                entitlements,
                                logged_in,
                            },
                            InitSource::Cache,
                        ))
                    }
                    _ => Err(ManagerError::RuleFetch(e)),
                }
            }
        }
    }

    async fn resolve_entitlements(
        &self,
        logged_in: bool,
        cached_entitlements: Option<Entitlements>,
        deadline: Instant,
    ) -> Result<Entitlements, ManagerError> {
        let entitlements = match cached_entitlements {
            Some(entitlements) => entitlements,
            None if !logged_in => Entitlements::default(),
            None => match self
                .bounded(deadline, self.entitlement_fetcher.fetch_entitlements())
                .await
            {
                Ok(entitlements) => entitlements,
                Err(e) => {
                    warn!(error = %e, "entitlement fetch failed");
                    let cached = if self.config.use_cached_paywall {
                        self.load_document::<Entitlements>(&self.key_entitlements())
                    } else {
                        None
                    };
                    return cached.ok_or(ManagerError::EntitlementFetch(e));
                }
            },
        };
        self.persist(&self.key_entitlements(), &entitlements);
        Ok(entitlements)
    }

    /// Run a fetch, failing it with [`FetchError::Timeout`] at `deadline`.
    async fn bounded<T>(
        &self,
        deadline: Instant,
        fetch: impl Future<Output = Result<T, FetchError>>,
    ) -> Result<T, FetchError> {
        tokio::time::timeout_at(deadline, fetch)
            .await
            .unwrap_or_else(|_| Err(FetchError::Timeout(self.config.init_timeout())))
    }

    /// Create a fresh ledger entry for every rule that has none.
    fn seed_ledger(&self, rules: &RuleSet, now: DateTime<Utc>) {
        for rule in rules {
            let key = self.key_rule_data(rule.id);
            let lock = self.rule_lock(rule.id);
            let _guard = lock.lock();
            match self.store.get(&key) {
                Ok(Some(_)) => {}
                Ok(None) => self.persist(&key, &self.ledger.start(now)),
                Err(e) => warn!(error = %e, rule = rule.id, "failed to read ledger entry"),
            }
        }
    }

    /// Evaluate a page view against the current time.
    pub fn evaluate(&self, page: &PageViewRequest) -> EvaluationResult {
        self.evaluate_at(page, Utc::now())
    }

    /// Evaluate a page view as of `now`.
    ///
    /// Rules are tried in order; the first one whose conditions, geography
    /// and entitlements match and whose budget has room decides the result.
    /// With no such rule the page is shown.
    #[instrument(skip(self, page), fields(page_id = %page.page_id))]
    pub fn evaluate_at(&self, page: &PageViewRequest, now: DateTime<Utc>) -> EvaluationResult {
        self.metrics.increment_evaluated();

        // A refresh in progress keeps serving the previous snapshot.
        let snapshot = self.snapshot.read().clone();
        let Some(snapshot) = snapshot else {
            debug!("paywall not ready, showing page");
            self.metrics.increment_shown();
            return EvaluationResult::allow(&page.page_id);
        };

        for rule in &snapshot.rules {
            if !evaluate_conditions(rule.conditions.as_ref(), &page.attributes) {
                continue;
            }
            if !evaluate_geo_conditions(rule.geo_conditions.as_ref(), page.geo.as_ref()) {
                debug!(rule = rule.id, "geo conditions not met");
                continue;
            }
            if !self.entitlement_evaluator.rule_applies(
                rule,
                &snapshot.entitlements,
                snapshot.logged_in,
            ) {
                debug!(rule = rule.id, "viewer exempt by entitlement");
                continue;
            }
            if !self.consume_budget(rule, &page.page_id, now) {
                debug!(rule = rule.id, "budget exhausted");
                continue;
            }

            let result = decide(rule, &page.page_id);
            if result.show {
                self.metrics.increment_shown();
            } else {
                self.metrics.increment_hidden();
            }
            info!(rule = rule.id, show = result.show, "rule applied");
            return result;
        }

        self.metrics.increment_shown();
        EvaluationResult::allow(&page.page_id)
    }

    /// Reset the rule's window if due, then count the view.
    ///
    /// Returns `false` when the rule is over budget for an unseen page. A
    /// page already counted in the current window always passes and is not
    /// counted twice.
    fn consume_budget(&self, rule: &Rule, page_id: &str, now: DateTime<Utc>) -> bool {
        let key = self.key_rule_data(rule.id);
        let lock = self.rule_lock(rule.id);
        let _guard = lock.lock();

        // An unreadable entry is left alone: the rule is skipped rather than
        // restarted from zero.
        let (stored, mut dirty) = match self.read_document::<RuleData>(&key) {
            Ok(Some(data)) => (data, false),
            Ok(None) => (self.ledger.start(now), true),
            Err(e) => {
                warn!(error = %e, rule = rule.id, "failed to read ledger entry, skipping rule");
                return false;
            }
        };
        let (reset, mut data) = self.ledger.check_reset_counters(&stored, &rule.budget, now);
        if reset {
            debug!(rule = rule.id, "budget window reset");
            dirty = true;
        }

        let mut passes = true;
        if BudgetLedger::check_not_viewed(&data, page_id) {
            if rule
                .limit
                .is_some_and(|limit| BudgetLedger::check_over_budget(&data, limit))
            {
                passes = false;
            } else {
                data.record_view(page_id);
                dirty = true;
            }
        }

        if dirty {
            self.persist(&key, &data);
        }
        passes
    }

    /// The persisted rule set document, if any.
    pub fn get_paywall_cache(&self) -> Option<String> {
        match self.store.get(&self.key_rule_set()) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "failed to read paywall cache");
                None
            }
        }
    }

    /// Remove every persisted document, ledger entries included.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::State`] if the store cannot be cleared.
    pub fn clear_paywall_cache(&self) -> Result<(), ManagerError> {
        self.store.clear()?;
        info!(namespace = %self.config.namespace, "paywall cache cleared");
        Ok(())
    }

    /// Drop the active rule set. Evaluation shows every page until the next
    /// successful [`initialize`](Self::initialize).
    pub fn reset(&self) {
        let mut phase = self.phase.lock();
        if *phase == Phase::Initializing {
            return;
        }
        *self.snapshot.write() = None;
        *phase = Phase::Uninitialized;
    }

    fn rule_lock(&self, id: RuleId) -> Arc<Mutex<()>> {
        Arc::clone(self.rule_locks.entry(id).or_default().value())
    }

    fn key_rule_set(&self) -> StateKey {
        StateKey::rule_set(self.config.namespace.as_str())
    }

    fn key_entitlements(&self) -> StateKey {
        StateKey::entitlements(self.config.namespace.as_str())
    }

    fn key_rule_data(&self, id: RuleId) -> StateKey {
        StateKey::rule_data(self.config.namespace.as_str(), id)
    }

    /// Read and parse a persisted document. Missing, `null` and unreadable
    /// documents all read as absent.
    fn load_document<T: DeserializeOwned>(&self, key: &StateKey) -> Option<T> {
        self.read_document(key).unwrap_or_else(|e| {
            warn!(error = %e, key = %key.canonical(), "failed to read document");
            None
        })
    }

    /// Like [`load_document`](Self::load_document), but a store failure is
    /// returned instead of reading as absent.
    fn read_document<T: DeserializeOwned>(&self, key: &StateKey) -> Result<Option<T>, StateError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        if raw.trim() == "null" {
            return Ok(None);
        }
        match serde_json::from_str(&raw) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                warn!(error = %e, key = %key.canonical(), "discarding unparsable document");
                Ok(None)
            }
        }
    }

    /// Serialize and store a document. Failures are logged, never returned.
    fn persist<T: Serialize>(&self, key: &StateKey, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.store_document(key, &raw),
            Err(e) => self.persistence_failed(key, &e),
        }
    }

    fn store_document(&self, key: &StateKey, raw: &str) {
        if let Err(e) = self.store.set(key, raw) {
            self.persistence_failed(key, &e);
        }
    }

    fn persistence_failed(&self, key: &StateKey, error: &dyn std::fmt::Display) {
        self.metrics.increment_persistence_failures();
        warn!(error = %error, key = %key.canonical(), "failed to persist document");
    }
}

fn decide(rule: &Rule, page_id: &str) -> EvaluationResult {
    let show = rule.rule_type != RuleType::HideOnMatch;
    EvaluationResult {
        page_id: page_id.to_owned(),
        show,
        campaign: if show {
            None
        } else {
            rule.campaign_code.clone()
        },
    }
}
