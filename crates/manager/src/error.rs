use thiserror::Error;

use paygate_core::FetchError;

/// Errors surfaced by [`PaywallManager`](crate::PaywallManager) lifecycle calls.
///
/// Page evaluation never returns these; it degrades to showing the page.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The rule set could not be fetched and no usable cache exists.
    #[error("rule fetch failed: {0}")]
    RuleFetch(#[source] FetchError),

    /// The entitlement document could not be fetched and no usable cache exists.
    #[error("entitlement fetch failed: {0}")]
    EntitlementFetch(#[source] FetchError),

    /// An error occurred in the state store.
    #[error("state error: {0}")]
    State(#[from] paygate_state::StateError),

    /// Another `initialize` call is in progress.
    #[error("initialization already in progress")]
    AlreadyInitializing,

    /// The manager was misconfigured (e.g. missing required components).
    #[error("configuration error: {0}")]
    Configuration(String),
}
