use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters tracking evaluation outcomes.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct EvaluationMetrics {
    /// Page views evaluated.
    pub evaluated: AtomicU64,
    /// Evaluations that ended with the page shown.
    pub shown: AtomicU64,
    /// Evaluations that ended with the page hidden.
    pub hidden: AtomicU64,
    /// Initializations served from the persisted cache.
    pub cache_fallbacks: AtomicU64,
    /// Writes to the state store that failed.
    pub persistence_failures: AtomicU64,
}

impl EvaluationMetrics {
    pub fn increment_evaluated(&self) {
        self.evaluated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_shown(&self) {
        self.shown.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_hidden(&self) {
        self.hidden.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cache_fallbacks(&self) {
        self.cache_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_persistence_failures(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            evaluated: self.evaluated.load(Ordering::Relaxed),
            shown: self.shown.load(Ordering::Relaxed),
            hidden: self.hidden.load(Ordering::Relaxed),
            cache_fallbacks: self.cache_fallbacks.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`EvaluationMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub evaluated: u64,
    pub shown: u64,
    pub hidden: u64,
    pub cache_fallbacks: u64,
    pub persistence_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        assert_eq!(EvaluationMetrics::default().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn increments_are_reflected_in_snapshot() {
        let m = EvaluationMetrics::default();
        m.increment_evaluated();
        m.increment_evaluated();
        m.increment_hidden();
        m.increment_shown();
        m.increment_cache_fallbacks();
        m.increment_persistence_failures();
        let snap = m.snapshot();
        assert_eq!(snap.evaluated, 2);
        assert_eq!(snap.hidden, 1);
        assert_eq!(snap.shown, 1);
        assert_eq!(snap.cache_fallbacks, 1);
        assert_eq!(snap.persistence_failures, 1);
    }
}
