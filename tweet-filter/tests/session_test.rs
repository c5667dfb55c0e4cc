use chrono::{Duration, TimeZone, Utc};
use std::cell::Cell;
use tweet_filter::{
    DashboardSession, FetchOutcome, FilterCategory, FilterState, MemoryStore, QueryPlan, RecordPage,
    RecordStore, StoreError, ViewStatus,
};
use utils_common::{Sentiment, TweetRecord};

/// 45 条推文，每小时一条，从 2024-03-01 00:00 开始
fn dataset() -> Vec<TweetRecord> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    (0..45u64)
        .map(|i| TweetRecord {
            id: format!("{:03}", i),
            text: if i % 3 == 0 {
                format!("NRM rally update #{}", i)
            } else {
                format!("Market report #{}", i)
            },
            username: if i % 5 == 0 { "nrm_official".to_string() } else { format!("citizen{}", i) },
            url: Some(format!("https://x.com/i/status/{}", i)),
            like_count: i * 3,
            reply_count: i % 4,
            retweet_count: i,
            sentiment_score: match i % 3 {
                0 => Some(Sentiment::Positive),
                1 => Some(Sentiment::Negative),
                _ => None,
            },
            created_at: start + Duration::hours(i as i64),
            district: None,
        })
        .collect()
}

/// 可以按需失败的存储
struct FlakyStore {
    inner: MemoryStore,
    fail: Cell<bool>,
}

impl RecordStore for FlakyStore {
    fn execute(&self, plan: &QueryPlan) -> Result<RecordPage, StoreError> {
        if self.fail.get() {
            return Err(StoreError::Rejected {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        self.inner.execute(plan)
    }
}

#[test]
fn pages_through_unfiltered_results() {
    let store = MemoryStore::new(dataset());
    let mut session = DashboardSession::default();

    assert_eq!(session.refresh(&store), FetchOutcome::Applied);
    assert_eq!(session.pagination().total_pages, 3);
    assert_eq!(session.records()[0].id, "044");

    session.next_page();
    session.next_page();
    session.refresh(&store);
    assert_eq!(session.records().len(), 5);
    assert_eq!(session.records()[4].id, "000");

    session.next_page();
    assert_eq!(session.pagination().current_page, 3);
}

#[test]
fn search_and_sentiment_combine() {
    let store = MemoryStore::new(dataset());
    let mut session = DashboardSession::default();

    session.set_search("nrm", FilterCategory::All);
    session.refresh(&store);
    // i % 3 == 0 或 i % 5 == 0
    assert_eq!(session.total_count(), 21);

    session.set_sentiment(Some(Sentiment::Positive));
    session.refresh(&store);
    assert_eq!(session.total_count(), 15);
    assert!(session
        .headline()
        .starts_with("Showing 15 tweets for \"nrm\" with sentiment Positive"));
}

#[test]
fn numeric_and_date_filters_against_store() {
    let store = MemoryStore::new(dataset());
    let mut session = DashboardSession::default();

    session.set_search("30-60", FilterCategory::Likes);
    session.refresh(&store);
    assert_eq!(session.total_count(), 11);

    session.set_search(">=40", FilterCategory::Retweets);
    session.refresh(&store);
    assert_eq!(session.total_count(), 5);

    session.set_search("2024-03-02", FilterCategory::Date);
    session.refresh(&store);
    assert_eq!(session.total_count(), 21);

    session.set_search("likes galore", FilterCategory::Likes);
    session.refresh(&store);
    assert_eq!(session.total_count(), 45);
}

#[test]
fn empty_result_is_not_a_failure() {
    let store = MemoryStore::new(dataset());
    let mut session = DashboardSession::default();
    session.set_search("no such words", FilterCategory::All);
    assert_eq!(session.refresh(&store), FetchOutcome::Applied);
    assert_eq!(session.status(), &ViewStatus::Empty);
    assert_eq!(session.pagination().total_pages, 1);
}

#[test]
fn failure_keeps_last_good_page() {
    let store = FlakyStore {
        inner: MemoryStore::new(dataset()),
        fail: Cell::new(false),
    };
    let mut session = DashboardSession::default();
    session.refresh(&store);
    let shown: Vec<String> = session.records().iter().map(|r| r.id.clone()).collect();

    store.fail.set(true);
    session.next_page();
    assert_eq!(session.refresh(&store), FetchOutcome::Failed);
    assert_eq!(
        session.status(),
        &ViewStatus::Failed("查询被拒绝 (503): service unavailable".to_string())
    );
    let still_shown: Vec<String> = session.records().iter().map(|r| r.id.clone()).collect();
    assert_eq!(shown, still_shown);
    assert_eq!(session.pagination().total_pages, 3);

    store.fail.set(false);
    assert_eq!(session.refresh(&store), FetchOutcome::Applied);
    assert_eq!(session.records()[0].id, "024");
}

#[test]
fn stale_response_cannot_overwrite_newer_one() {
    let store = MemoryStore::new(dataset());
    let mut session = DashboardSession::default();

    let a = session.issue();
    session.set_search("nrm_official", FilterCategory::Username);
    let b = session.issue();

    let b_result = store.execute(&b.plan);
    let a_result = store.execute(&a.plan);
    assert_eq!(session.complete(b.sequence, b_result), FetchOutcome::Applied);
    assert_eq!(session.complete(a.sequence, a_result), FetchOutcome::Stale);

    assert_eq!(session.total_count(), 9);
    assert!(session.records().iter().all(|r| r.username == "nrm_official"));
}

#[test]
fn filter_state_round_trips_through_json() {
    let mut filters = FilterState::search("10-100", FilterCategory::Likes);
    filters.sentiment = Some(Sentiment::Neutral);
    filters.date_range.from = Some("2024-03-01".to_string());

    let json = serde_json::to_string(&filters).unwrap();
    let restored: FilterState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, filters);
}
