use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};

use paygate_core::{
    Budget, Condition, Entitlements, GeoSignal, PageViewRequest, Rule, RuleData, RuleSet,
    RuleType, StaticFetcher,
};
use paygate_manager::{PaywallManager, PaywallManagerBuilder};
use paygate_state::{StateError, StateKey, StateStore};
use paygate_state_memory::MemoryStateStore;

/// Monday 2021-07-26 10:00 UTC.
fn monday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 7, 26, 10, 0, 0).unwrap()
}

fn manager_with(store: Arc<dyn StateStore>, rules: Vec<Rule>) -> PaywallManager {
    PaywallManagerBuilder::new()
        .store(store)
        .fetcher(Arc::new(StaticFetcher::new().with_rules(RuleSet::new(rules))))
        .build()
        .unwrap()
}

async fn ready(rules: Vec<Rule>) -> (PaywallManager, Arc<MemoryStateStore>) {
    let store = Arc::new(MemoryStateStore::new());
    let manager = manager_with(store.clone(), rules);
    manager.initialize(monday(), false, None).await.unwrap();
    (manager, store)
}

fn ledger(store: &MemoryStateStore, rule: i64) -> RuleData {
    let raw = store
        .get(&StateKey::rule_data("paywall", rule))
        .unwrap()
        .unwrap();
    serde_json::from_str(&raw).unwrap()
}

/// Restrict `rule` to mobile pages, which every [`page`] is.
fn on_mobile(rule: Rule) -> Rule {
    rule.with_condition("deviceType", Condition::include(["mobile"]))
}

fn metered(id: i64, limit: u32) -> Rule {
    on_mobile(Rule::new(id, RuleType::HideOnMatch, Budget::rolling_days(30)))
        .with_campaign("meter")
        .with_limit(limit)
}

fn page(id: &str) -> PageViewRequest {
    PageViewRequest::new(id).with_attribute("deviceType", "mobile")
}

#[test]
fn uninitialized_manager_shows_everything() {
    let manager = manager_with(
        Arc::new(MemoryStateStore::new()),
        vec![on_mobile(Rule::new(1, RuleType::HideOnMatch, Budget::default()))],
    );
    let result = manager.evaluate_at(&page("p1"), monday());
    assert!(result.show);
    assert!(result.campaign.is_none());
    assert_eq!(result.page_id, "p1");
}

#[tokio::test]
async fn hide_on_match_for_matching_device() {
    let rule = Rule::new(1, RuleType::HideOnMatch, Budget::rolling_days(30))
        .with_condition("deviceType", Condition::include(["mobile"]))
        .with_campaign("spring");
    let (manager, store) = ready(vec![rule]).await;

    let later = monday() + Duration::hours(1);
    let mobile = manager.evaluate_at(&page("p1").with_attribute("deviceType", "mobile"), later);
    assert!(!mobile.show);
    assert_eq!(mobile.campaign.as_deref(), Some("spring"));

    let tablet = manager.evaluate_at(&page("p2").with_attribute("deviceType", "tablet"), later);
    assert!(tablet.show);
    assert!(tablet.campaign.is_none());

    let data = ledger(&store, 1);
    assert_eq!(data.counter, 1);
    assert!(data.has_viewed("p1"));
    assert!(!data.has_viewed("p2"));
}

#[tokio::test]
async fn page_without_attribute_does_not_match() {
    let rule = Rule::new(1, RuleType::HideOnMatch, Budget::default())
        .with_condition("deviceType", Condition::exclude(["desktop"]));
    let (manager, _store) = ready(vec![rule]).await;
    assert!(manager.evaluate_at(&PageViewRequest::new("p1"), monday()).show);
}

#[tokio::test]
async fn exhausted_budget_lets_pages_through() {
    let (manager, store) = ready(vec![metered(1, 2)]).await;
    let t = monday() + Duration::hours(1);

    assert!(!manager.evaluate_at(&page("a"), t).show);
    assert!(!manager.evaluate_at(&page("b"), t).show);
    let over = manager.evaluate_at(&page("c"), t);
    assert!(over.show);
    assert!(over.campaign.is_none());
    assert_eq!(ledger(&store, 1).counter, 2);
}

#[tokio::test]
async fn revisiting_a_page_is_not_counted_twice() {
    let (manager, store) = ready(vec![metered(1, 2)]).await;
    let t = monday() + Duration::hours(1);

    manager.evaluate_at(&page("a"), t);
    manager.evaluate_at(&page("b"), t);
    let again = manager.evaluate_at(&page("a"), t + Duration::minutes(5));
    assert!(!again.show);
    assert_eq!(again.campaign.as_deref(), Some("meter"));
    assert_eq!(ledger(&store, 1).counter, 2);
}

#[tokio::test]
async fn rolling_window_resets_budget() {
    let (manager, store) = ready(vec![metered(1, 1)]).await;

    assert!(!manager.evaluate_at(&page("a"), monday()).show);
    assert!(manager.evaluate_at(&page("b"), monday() + Duration::days(29)).show);

    let next_window = monday() + Duration::days(30);
    assert!(!manager.evaluate_at(&page("b"), next_window).show);

    let data = ledger(&store, 1);
    assert_eq!(data.counter, 1);
    assert_eq!(data.last_reset_at, next_window);
    assert!(!data.has_viewed("a"));
}

#[tokio::test]
async fn weekly_budget_resets_on_boundary_day() {
    let rule = on_mobile(Rule::new(1, RuleType::HideOnMatch, Budget::weekly("Sunday")))
        .with_campaign("weekly")
        .with_limit(1);
    let (manager, store) = ready(vec![rule]).await;

    let tuesday = Utc.with_ymd_and_hms(2021, 7, 27, 9, 0, 0).unwrap();
    let wednesday = Utc.with_ymd_and_hms(2021, 7, 28, 9, 0, 0).unwrap();
    let sunday = Utc.with_ymd_and_hms(2021, 8, 1, 9, 0, 0).unwrap();

    assert!(!manager.evaluate_at(&page("a"), tuesday).show);
    assert!(manager.evaluate_at(&page("b"), wednesday).show);
    assert!(!manager.evaluate_at(&page("b"), sunday).show);
    assert_eq!(ledger(&store, 1).last_reset_weekday, 1);
}

#[tokio::test]
async fn over_budget_rule_falls_through_to_next() {
    let first = metered(1, 1).with_campaign("first");
    let second =
        on_mobile(Rule::new(2, RuleType::HideOnMatch, Budget::monthly())).with_campaign("second");
    let (manager, _store) = ready(vec![first, second]).await;

    let a = manager.evaluate_at(&page("a"), monday());
    assert_eq!(a.campaign.as_deref(), Some("first"));
    let b = manager.evaluate_at(&page("b"), monday());
    assert!(!b.show);
    assert_eq!(b.campaign.as_deref(), Some("second"));
}

#[tokio::test]
async fn first_matching_rule_wins() {
    let news = Rule::new(1, RuleType::ShowOnMatch, Budget::default())
        .with_condition("section", Condition::include(["news"]))
        .with_campaign("unused");
    let everything =
        on_mobile(Rule::new(2, RuleType::HideOnMatch, Budget::default())).with_campaign("all");
    let (manager, store) = ready(vec![news, everything]).await;

    let result = manager.evaluate_at(&page("p1").with_attribute("section", "news"), monday());
    assert!(result.show);
    assert!(result.campaign.is_none());
    assert_eq!(ledger(&store, 1).counter, 1);
    assert_eq!(ledger(&store, 2).counter, 0);

    let sports = manager.evaluate_at(&page("p2").with_attribute("section", "sports"), monday());
    assert!(!sports.show);
    assert_eq!(sports.campaign.as_deref(), Some("all"));
}

#[tokio::test]
async fn premium_viewer_is_exempt() {
    let rule = on_mobile(Rule::new(1, RuleType::HideOnMatch, Budget::default()))
        .with_excluded_sku("guest")
        .with_excluded_sku("premium")
        .with_campaign("subscribe");

    let store = Arc::new(MemoryStateStore::new());
    let manager = manager_with(store.clone(), vec![rule.clone()]);
    manager
        .initialize(monday(), true, Some(Entitlements::new(["premium"])))
        .await
        .unwrap();
    assert!(manager.evaluate_at(&page("p1"), monday()).show);
    assert_eq!(ledger(&store, 1).counter, 0);

    let guest = manager_with(Arc::new(MemoryStateStore::new()), vec![rule]);
    guest
        .initialize(monday(), false, Some(Entitlements::new(["guest"])))
        .await
        .unwrap();
    assert!(!guest.evaluate_at(&page("p1"), monday()).show);
}

#[tokio::test]
async fn registered_marker_exempts_logged_in_viewers() {
    let rule = on_mobile(Rule::new(1, RuleType::HideOnMatch, Budget::default()))
        .with_excluded_sku("registered");

    let logged_in = manager_with(Arc::new(MemoryStateStore::new()), vec![rule.clone()]);
    logged_in
        .initialize(monday(), true, Some(Entitlements::default()))
        .await
        .unwrap();
    assert!(logged_in.evaluate_at(&page("p1"), monday()).show);

    let (anonymous, _store) = ready(vec![rule]).await;
    assert!(!anonymous.evaluate_at(&page("p1"), monday()).show);
}

#[tokio::test]
async fn geo_conditions_gate_rules() {
    let rule = on_mobile(Rule::new(1, RuleType::HideOnMatch, Budget::default()))
        .with_geo_condition("country_code", Condition::include(["US"]));
    let (manager, _store) = ready(vec![rule]).await;

    let geo = |cc: &str| GeoSignal {
        country_code: Some(cc.to_owned()),
        ..GeoSignal::default()
    };
    assert!(!manager.evaluate_at(&page("p1").with_geo(geo("US")), monday()).show);
    assert!(manager.evaluate_at(&page("p2").with_geo(geo("CA")), monday()).show);
    assert!(manager.evaluate_at(&page("p3"), monday()).show);
}

#[tokio::test]
async fn metrics_track_outcomes() {
    let (manager, _store) = ready(vec![metered(1, 1)]).await;
    manager.evaluate_at(&page("a"), monday());
    manager.evaluate_at(&page("b"), monday());
    manager.evaluate_at(&page("c"), monday());

    let snap = manager.metrics().snapshot();
    assert_eq!(snap.evaluated, 3);
    assert_eq!(snap.hidden, 1);
    assert_eq!(snap.shown, 2);
    assert_eq!(snap.persistence_failures, 0);
}

#[tokio::test]
async fn concurrent_views_respect_the_limit() {
    let (manager, store) = ready(vec![metered(1, 5)]).await;
    let manager = Arc::new(manager);

    let hidden: usize = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let manager = Arc::clone(&manager);
                s.spawn(move || {
                    (0..10)
                        .filter(|i| {
                            !manager
                                .evaluate_at(&page(&format!("t{t}-p{i}")), monday())
                                .show
                        })
                        .count()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(hidden, 5);
    assert_eq!(ledger(&store, 1).counter, 5);
}

/// Reads through to memory but rejects every write.
struct ReadOnlyStore(MemoryStateStore);

impl StateStore for ReadOnlyStore {
    fn get(&self, key: &StateKey) -> Result<Option<String>, StateError> {
        self.0.get(key)
    }

    fn set(&self, _key: &StateKey, _value: &str) -> Result<(), StateError> {
        Err(StateError::Backend("read-only".into()))
    }

    fn delete(&self, key: &StateKey) -> Result<bool, StateError> {
        self.0.delete(key)
    }

    fn clear(&self) -> Result<(), StateError> {
        self.0.clear()
    }
}

#[tokio::test]
async fn persistence_failures_do_not_block_evaluation() {
    let manager = manager_with(
        Arc::new(ReadOnlyStore(MemoryStateStore::new())),
        vec![metered(1, 1)],
    );
    manager.initialize(monday(), false, None).await.unwrap();

    let result = manager.evaluate_at(&page("a"), monday());
    assert!(!result.show);
    assert_eq!(result.campaign.as_deref(), Some("meter"));
    assert!(manager.metrics().snapshot().persistence_failures > 0);
}

/// Memory store whose next read fails once `fail_next_read` is set.
struct FlakyReadStore {
    inner: MemoryStateStore,
    fail_next_read: AtomicBool,
}

impl StateStore for FlakyReadStore {
    fn get(&self, key: &StateKey) -> Result<Option<String>, StateError> {
        if self.fail_next_read.swap(false, Ordering::SeqCst) {
            return Err(StateError::Backend("connection reset".into()));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &StateKey, value: &str) -> Result<(), StateError> {
        self.inner.set(key, value)
    }

    fn delete(&self, key: &StateKey) -> Result<bool, StateError> {
        self.inner.delete(key)
    }

    fn clear(&self) -> Result<(), StateError> {
        self.inner.clear()
    }
}

#[tokio::test]
async fn unreadable_ledger_entry_is_left_untouched() {
    let store = Arc::new(FlakyReadStore {
        inner: MemoryStateStore::new(),
        fail_next_read: AtomicBool::new(false),
    });
    let manager = manager_with(store.clone(), vec![metered(1, 3)]);
    manager.initialize(monday(), false, None).await.unwrap();

    let t = monday() + Duration::days(1);
    manager.evaluate_at(&page("a"), t);
    manager.evaluate_at(&page("b"), t);

    store.fail_next_read.store(true, Ordering::SeqCst);
    let skipped = manager.evaluate_at(&page("c"), t);
    assert!(skipped.show);
    assert!(skipped.campaign.is_none());

    let data = ledger(&store.inner, 1);
    assert_eq!(data.counter, 2);
    assert_eq!(data.last_reset_at, monday());
    assert!(data.has_viewed("a") && data.has_viewed("b"));

    assert!(!manager.evaluate_at(&page("c"), t).show);
    assert_eq!(ledger(&store.inner, 1).counter, 3);
}
