//! Integration Tests for the cached query layer
//!
//! Runs the read functions against an in-memory backend that counts how
//! often each table is queried.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use horsebox_cache::queries::{
    invalidate, CachedQueries, Condition, LeadFilter, ListQuery, Listing, OperationsBackend,
    QuoteFilter, Record, Table,
};
use horsebox_cache::tasks::{CacheWarmer, WarmupOutcome};
use horsebox_cache::{QueryError, ReadThroughCache, TtlPolicy};

// == Fake Backend ==

#[derive(Default)]
struct FakeBackend {
    rows: Mutex<HashMap<Table, Vec<Record>>>,
    calls: Mutex<HashMap<Table, usize>>,
    failing: AtomicBool,
}

impl FakeBackend {
    fn with_rows(rows: Vec<(Table, Vec<Record>)>) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(rows.into_iter().collect()),
            ..Self::default()
        })
    }

    fn calls(&self, table: Table) -> usize {
        self.calls.lock().get(&table).copied().unwrap_or(0)
    }

    fn matching(&self, table: Table, conditions: &[Condition]) -> anyhow::Result<Vec<Record>> {
        *self.calls.lock().entry(table).or_default() += 1;
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }

        let rows = self.rows.lock().get(&table).cloned().unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter(|row| {
                conditions.iter().all(|condition| match condition {
                    Condition::Eq(column, value) => row.get(*column) == Some(value),
                    Condition::NotNull(column) => {
                        row.get(*column).map_or(false, |v| !v.is_null())
                    }
                    Condition::Gte(..) => true,
                })
            })
            .collect())
    }
}

#[async_trait]
impl OperationsBackend for FakeBackend {
    async fn list(&self, table: Table, query: &ListQuery) -> anyhow::Result<Listing> {
        let rows = self.matching(table, &query.conditions)?;
        let total = rows.len() as u64;
        let rows = match query.range {
            Some((offset, limit)) => rows
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect(),
            None => rows,
        };
        Ok(Listing {
            rows,
            total: query.with_count.then_some(total),
        })
    }

    async fn fetch_one(&self, table: Table, query: &ListQuery) -> anyhow::Result<Option<Record>> {
        Ok(self.matching(table, &query.conditions)?.into_iter().next())
    }

    async fn count(&self, table: Table, conditions: &[Condition]) -> anyhow::Result<u64> {
        Ok(self.matching(table, conditions)?.len() as u64)
    }
}

// == Helper Functions ==

fn leads() -> Vec<Record> {
    (1..=25)
        .map(|id| {
            json!({
                "id": id.to_string(),
                "first_name": "Rider",
                "last_name": id.to_string(),
                "stage": if id % 5 == 0 { "quotation" } else { "inquiry" },
                "status": "active",
                "quote_amount": if id % 5 == 0 { Value::from(40000.0) } else { Value::Null },
            })
        })
        .collect()
}

fn pricing() -> Vec<Record> {
    vec![
        json!({"id": 1, "model": "3.5t", "category": "chassis", "name": "Base", "is_available": true}),
        json!({"id": 2, "model": "3.5t", "category": "paint", "name": "Gloss", "is_available": false}),
        json!({"id": 3, "model": "4.5t", "category": "chassis", "name": "Base", "is_available": true}),
        json!({"id": 4, "model": "7.2t", "category": "chassis", "name": "Base", "is_available": true}),
    ]
}

fn setup() -> (Arc<FakeBackend>, Arc<CachedQueries<FakeBackend>>) {
    let backend = FakeBackend::with_rows(vec![
        (Table::Leads, leads()),
        (Table::Builds, vec![json!({"id": "B-1", "status": "active"})]),
        (Table::PricingOptions, pricing()),
        (
            Table::KnowledgeBase,
            vec![json!({"id": 1, "slug": "towing", "published": true, "category": "safety"})],
        ),
        (
            Table::Quotes,
            vec![json!({"id": "Q-1", "lead_id": "5", "status": "sent"})],
        ),
    ]);
    let queries = CachedQueries::new(
        Arc::clone(&backend),
        Arc::new(ReadThroughCache::new()),
        TtlPolicy::default(),
    );
    (backend, Arc::new(queries))
}

// == Read-Through ==

#[tokio::test]
async fn test_leads_page_hits_backend_once() {
    let (backend, queries) = setup();
    let filter = LeadFilter::default();

    let first = queries.leads_page(1, 20, &filter).await.unwrap();
    let second = queries.leads_page(1, 20, &filter).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(backend.calls(Table::Leads), 1);
    assert_eq!(first.items.len(), 20);
    assert_eq!(first.pagination.total, 25);
    assert_eq!(first.pagination.total_pages, 2);
}

#[tokio::test]
async fn test_pages_and_filters_are_cached_separately() {
    let (backend, queries) = setup();
    let quotation = LeadFilter {
        stage: Some("quotation".to_string()),
        ..LeadFilter::default()
    };

    let page_two = queries.leads_page(2, 20, &LeadFilter::default()).await.unwrap();
    let filtered = queries.leads_page(1, 20, &quotation).await.unwrap();
    let small = queries.leads_page(1, 10, &LeadFilter::default()).await.unwrap();

    assert_eq!(page_two.items.len(), 5);
    assert_eq!(filtered.pagination.total, 5);
    assert_eq!(small.items.len(), 10);
    assert_eq!(backend.calls(Table::Leads), 3);
}

#[tokio::test]
async fn test_invalid_page_never_reaches_backend() {
    let (backend, queries) = setup();

    let result = queries.leads_page(0, 20, &LeadFilter::default()).await;

    assert!(matches!(result, Err(QueryError::InvalidPage { page: 0, .. })));
    assert_eq!(backend.calls(Table::Leads), 0);
}

#[tokio::test]
async fn test_backend_failure_is_not_cached() {
    let (backend, queries) = setup();
    backend.failing.store(true, Ordering::SeqCst);

    let result = queries.quotes_page(1, 20, &QuoteFilter::default()).await;
    assert!(matches!(result, Err(QueryError::Backend(_))));

    backend.failing.store(false, Ordering::SeqCst);
    let page = queries.quotes_page(1, 20, &QuoteFilter::default()).await.unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(backend.calls(Table::Quotes), 2);
    assert_eq!(queries.cache().stats().load_failures, 1);
}

#[tokio::test]
async fn test_missing_lead_is_not_found_and_not_cached() {
    let (backend, queries) = setup();

    let result = queries.lead("999").await;
    assert!(matches!(result, Err(QueryError::NotFound { table: "leads", .. })));

    let _ = queries.lead("999").await;
    assert_eq!(backend.calls(Table::Leads), 2);

    let lead = queries.lead("5").await.unwrap();
    assert_eq!(lead["stage"], "quotation");
}

#[tokio::test]
async fn test_monitor_records_misses_only() {
    let (backend, queries) = setup();

    queries.quotes_page(1, 20, &QuoteFilter::default()).await.unwrap();
    queries.quotes_page(1, 20, &QuoteFilter::default()).await.unwrap();
    assert_eq!(queries.monitor().stats().total_queries, 1, "The hit is not timed");

    backend.failing.store(true, Ordering::SeqCst);
    let _ = queries.lead("5").await;

    let stats = queries.monitor().stats();
    assert_eq!(stats.total_queries, 2);
    assert_eq!(stats.error_count, 1);

    let recent = queries.monitor().recent(2);
    assert_eq!(recent[0].query, "fetch_leads");
    assert!(recent[0].error.is_some());
    assert_eq!(recent[1].query, "page_quotes");
}

#[tokio::test]
async fn test_dashboard_metrics() {
    let (backend, queries) = setup();

    let metrics = queries.dashboard_metrics().await.unwrap();
    queries.dashboard_metrics().await.unwrap();

    assert_eq!(metrics.total_leads, 25);
    assert_eq!(metrics.active_builds, 1);
    assert_eq!(metrics.recent_quotes, 5);
    assert_eq!(metrics.total_pipeline_value, 200_000.0);
    assert_eq!(backend.calls(Table::Builds), 1);
}

#[tokio::test]
async fn test_pipeline_groups_every_stage() {
    let (_, queries) = setup();

    let pipeline = queries.pipeline().await.unwrap();

    assert_eq!(pipeline.len(), 7);
    assert_eq!(pipeline["inquiry"].len(), 20);
    assert_eq!(pipeline["quotation"].len(), 5);
    assert!(pipeline["closed_won"].is_empty());
}

#[tokio::test]
async fn test_pricing_options_filters() {
    let (backend, queries) = setup();

    let available = queries.pricing_options(Some("3.5t"), None, true).await.unwrap();
    let everything = queries.pricing_options(Some("3.5t"), None, false).await.unwrap();
    let all_models = queries.pricing_options(None, None, true).await.unwrap();

    assert_eq!(available.len(), 1);
    assert_eq!(everything.len(), 2);
    assert_eq!(all_models.len(), 3);
    assert_eq!(backend.calls(Table::PricingOptions), 3);
}

#[tokio::test]
async fn test_concurrent_reads_share_one_load() {
    let (backend, queries) = setup();

    let reads = (0..8).map(|_| {
        let queries = Arc::clone(&queries);
        tokio::spawn(async move { queries.knowledge_base_articles(None).await })
    });
    for read in futures::future::join_all(reads).await {
        assert_eq!(read.unwrap().unwrap().len(), 1);
    }

    assert_eq!(backend.calls(Table::KnowledgeBase), 1);
}

// == Invalidation ==

#[tokio::test]
async fn test_lead_write_invalidation_forces_reload() {
    let (backend, queries) = setup();
    let filter = LeadFilter::default();

    queries.leads_page(1, 20, &filter).await.unwrap();
    queries.lead("5").await.unwrap();
    queries.pipeline().await.unwrap();
    queries.pricing_options(None, None, true).await.unwrap();
    assert_eq!(backend.calls(Table::Leads), 3);

    let removed = invalidate::leads(queries.cache());
    assert_eq!(removed, 3);

    queries.leads_page(1, 20, &filter).await.unwrap();
    queries.pricing_options(None, None, true).await.unwrap();
    assert_eq!(backend.calls(Table::Leads), 4);
    assert_eq!(
        backend.calls(Table::PricingOptions),
        1,
        "Pricing survives a lead write"
    );
}

#[tokio::test]
async fn test_knowledge_base_invalidation() {
    let (backend, queries) = setup();

    queries.knowledge_base_articles(Some("safety")).await.unwrap();
    queries.knowledge_base_article("towing").await.unwrap();

    assert_eq!(invalidate::knowledge_base(queries.cache()), 2);

    queries.knowledge_base_article("towing").await.unwrap();
    assert_eq!(backend.calls(Table::KnowledgeBase), 3);
}

#[tokio::test(start_paused = true)]
async fn test_short_tier_expires() {
    let (backend, queries) = setup();

    queries.pipeline().await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    queries.pipeline().await.unwrap();

    assert_eq!(backend.calls(Table::Leads), 2);
}

// == Warmup ==

#[tokio::test]
async fn test_warmup_preloads_pricing_and_dashboard() {
    let (backend, queries) = setup();
    let warmer = CacheWarmer::new(queries.warmup_tasks(), Duration::from_secs(60));

    let outcome = warmer.warm().await;
    assert!(matches!(
        outcome,
        WarmupOutcome::Completed {
            succeeded: 6,
            failed: 0,
            ..
        }
    ));

    let calls = backend.calls(Table::PricingOptions);
    queries.pricing_options(Some("4.5t"), None, true).await.unwrap();
    queries.dashboard_metrics().await.unwrap();
    assert_eq!(backend.calls(Table::PricingOptions), calls, "Served from cache");
    assert_eq!(backend.calls(Table::Builds), 1);
}

#[tokio::test]
async fn test_warmup_reports_backend_failures() {
    let (backend, queries) = setup();
    backend.failing.store(true, Ordering::SeqCst);
    let warmer = CacheWarmer::new(queries.warmup_tasks(), Duration::ZERO);

    let outcome = warmer.warm().await;

    assert!(matches!(
        outcome,
        WarmupOutcome::Completed {
            succeeded: 0,
            failed: 6,
            ..
        }
    ));
    assert!(queries.cache().is_empty());
}
