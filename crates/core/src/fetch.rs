//! Collaborators that deliver the rule set and the entitlement document.
//!
//! The engine does not care about transport; `paygate-client` provides the
//! HTTP implementation.

use async_trait::async_trait;

use crate::entitlement::Entitlements;
use crate::error::FetchError;
use crate::rule::RuleSet;

/// Source of the active rule set.
#[async_trait]
pub trait RuleFetcher: Send + Sync {
    async fn fetch_rules(&self) -> Result<RuleSet, FetchError>;
}

/// Source of the viewer's entitlement document.
#[async_trait]
pub trait EntitlementFetcher: Send + Sync {
    async fn fetch_entitlements(&self) -> Result<Entitlements, FetchError>;
}

/// A fetcher that always serves the same documents. Useful for embedding
/// a bundled rule set and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    rules: Option<RuleSet>,
    entitlements: Option<Entitlements>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    #[must_use]
    pub fn with_entitlements(mut self, entitlements: Entitlements) -> Self {
        self.entitlements = Some(entitlements);
        self
    }
}

#[async_trait]
impl RuleFetcher for StaticFetcher {
    async fn fetch_rules(&self) -> Result<RuleSet, FetchError> {
        self.rules
            .clone()
            .ok_or_else(|| FetchError::Unavailable("no rule set configured".into()))
    }
}

#[async_trait]
impl EntitlementFetcher for StaticFetcher {
    async fn fetch_entitlements(&self) -> Result<Entitlements, FetchError> {
        self.entitlements
            .clone()
            .ok_or_else(|| FetchError::Unavailable("no entitlements configured".into()))
    }
}
