//! Paywall decision orchestration.
//!
//! [`PaywallManager`] fetches the active rule set and the viewer's
//! entitlements, persists both for offline use, and evaluates page views
//! against the rules while tracking each rule's view budget in a
//! [`StateStore`](paygate_state::StateStore).
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use paygate_core::{PageViewRequest, RuleSet, StaticFetcher};
//! use paygate_manager::PaywallManagerBuilder;
//! use paygate_state_memory::MemoryStateStore;
//!
//! # async fn example() -> Result<(), paygate_manager::ManagerError> {
//! let manager = PaywallManagerBuilder::new()
//!     .store(Arc::new(MemoryStateStore::new()))
//!     .fetcher(Arc::new(StaticFetcher::new().with_rules(RuleSet::default())))
//!     .build()?;
//! manager.initialize(chrono::Utc::now(), false, None).await?;
//! let result = manager.evaluate(&PageViewRequest::new("article-1"));
//! assert!(result.show);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod manager;
pub mod metrics;

pub use builder::PaywallManagerBuilder;
pub use config::ManagerConfig;
pub use error::ManagerError;
pub use manager::{InitSource, PaywallManager, Phase};
pub use metrics::{EvaluationMetrics, MetricsSnapshot};
