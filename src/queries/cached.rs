//! Cached reads over the operations backend
//!
//! Each read builds its key from `cache::keys::resource`, picks a TTL tier,
//! and runs the backend query only on a miss.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::keys::resource;
use crate::cache::{ReadThroughCache, TtlPolicy, TtlTier};
use crate::error::QueryError;
use crate::queries::backend::{columns, Condition, ListQuery, OperationsBackend, Record, Table};
use crate::queries::monitor::QueryMonitor;
use crate::tasks::{WarmupPriority, WarmupTask};

/// Pipeline stages, in board order.
pub const PIPELINE_STAGES: [&str; 7] = [
    "inquiry",
    "qualification",
    "specification",
    "quotation",
    "negotiation",
    "closed_won",
    "closed_lost",
];

const RECENT_QUOTE_DAYS: i64 = 30;
const DEFAULT_LEAD_SCORE: i64 = 50;

// == Filters ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadFilter {
    pub stage: Option<String>,
    pub status: Option<String>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryFilter {
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteFilter {
    pub status: Option<String>,
    pub lead_id: Option<String>,
}

// == Results ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(u64::from(limit)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub items: Vec<Record>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub total_leads: u64,
    pub active_builds: u64,
    pub recent_quotes: u64,
    pub total_pipeline_value: f64,
}

/// One lead as shown on the pipeline board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineCard {
    pub id: Value,
    pub organization: String,
    pub contact: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub value: f64,
    pub model: String,
    pub assigned_to: String,
    pub created_at: Option<String>,
    pub score: i64,
    pub stage: String,
}

/// Cards grouped by stage; every stage in [`PIPELINE_STAGES`] is present.
pub type Pipeline = BTreeMap<String, Vec<PipelineCard>>;

// == Cached Queries ==
/// Read functions of the operations platform, memoized in a shared cache.
pub struct CachedQueries<B> {
    backend: Arc<B>,
    cache: Arc<ReadThroughCache>,
    ttl: TtlPolicy,
    monitor: Arc<QueryMonitor>,
}

impl<B: OperationsBackend> CachedQueries<B> {
    pub fn new(backend: Arc<B>, cache: Arc<ReadThroughCache>, ttl: TtlPolicy) -> Self {
        Self {
            backend,
            cache,
            ttl,
            monitor: Arc::new(QueryMonitor::default()),
        }
    }

    /// Times backend calls with `monitor` instead of a private one.
    pub fn with_monitor(mut self, monitor: Arc<QueryMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn cache(&self) -> &Arc<ReadThroughCache> {
        &self.cache
    }

    pub fn monitor(&self) -> &Arc<QueryMonitor> {
        &self.monitor
    }

    // == Dashboard ==
    pub async fn dashboard_metrics(&self) -> Result<Arc<DashboardMetrics>, QueryError> {
        self.cache
            .cached(resource::dashboard_stats(), self.ttl.ttl(TtlTier::Medium), || async {
                let active = [Condition::Eq("status", Value::from("active"))];
                let since = (Utc::now() - ChronoDuration::days(RECENT_QUOTE_DAYS)).to_rfc3339();
                let recent = ListQuery::select("quote_amount")
                    .gte("created_at", since)
                    .not_null("quote_amount");

                let (total_leads, active_builds, recent_quotes) = tokio::try_join!(
                    self.monitor
                        .observe("count_leads", self.backend.count(Table::Leads, &[])),
                    self.monitor
                        .observe("count_active_builds", self.backend.count(Table::Builds, &active)),
                    self.monitor
                        .observe("list_recent_quotes", self.backend.list(Table::Leads, &recent)),
                )?;

                let total_pipeline_value = recent_quotes
                    .rows
                    .iter()
                    .filter_map(|row| number(row, "quote_amount"))
                    .sum();

                Ok::<_, QueryError>(DashboardMetrics {
                    total_leads,
                    active_builds,
                    recent_quotes: recent_quotes.rows.len() as u64,
                    total_pipeline_value,
                })
            })
            .await
    }

    // == Pipeline ==
    /// All leads grouped by stage in one query.
    pub async fn pipeline(&self) -> Result<Arc<Pipeline>, QueryError> {
        self.cache
            .cached(resource::pipeline_data(), self.ttl.ttl(TtlTier::Short), || async {
                let query = ListQuery::select(columns::LEAD).order("created_at", false);
                let leads = self
                    .monitor
                    .observe("list_pipeline_leads", self.backend.list(Table::Leads, &query))
                    .await?;

                let mut pipeline: Pipeline = PIPELINE_STAGES
                    .iter()
                    .map(|stage| (stage.to_string(), Vec::new()))
                    .collect();
                for row in &leads.rows {
                    let card = pipeline_card(row);
                    pipeline.entry(card.stage.clone()).or_default().push(card);
                }
                Ok::<_, QueryError>(pipeline)
            })
            .await
    }

    // == Leads ==
    pub async fn leads_page(
        &self,
        page: u32,
        limit: u32,
        filter: &LeadFilter,
    ) -> Result<Arc<Page>, QueryError> {
        check_page(page, limit)?;
        let key = resource::leads_page(page, limit, filter)?;
        let query = ListQuery::select(columns::LEAD)
            .eq_opt("stage", filter.stage.as_deref())
            .eq_opt("status", filter.status.as_deref())
            .eq_opt("assigned_to", filter.assigned_to.as_deref())
            .order("created_at", false);

        self.cached_page(key.into(), TtlTier::Short, Table::Leads, query, page, limit)
            .await
    }

    /// A lead with its activity history.
    pub async fn lead(&self, lead_id: &str) -> Result<Arc<Record>, QueryError> {
        let query = ListQuery::select(columns::LEAD_WITH_ACTIVITIES).eq("id", lead_id);
        self.cached_one(resource::lead(lead_id).into(), TtlTier::Medium, Table::Leads, query, lead_id)
            .await
    }

    // == Customers ==
    pub async fn customers_page(&self, page: u32, limit: u32) -> Result<Arc<Page>, QueryError> {
        check_page(page, limit)?;
        let query = ListQuery::select(columns::CUSTOMER).order("created_at", false);

        self.cached_page(
            resource::customers_page(page, limit).into(),
            TtlTier::Medium,
            Table::Customers,
            query,
            page,
            limit,
        )
        .await
    }

    // == Inventory ==
    /// Every inventory item, unpaginated.
    pub async fn inventory_list(&self) -> Result<Arc<Vec<Record>>, QueryError> {
        self.cache
            .cached(resource::inventory_list(), self.ttl.ttl(TtlTier::Medium), || async {
                let query = ListQuery::select(columns::INVENTORY).order("name", true);
                let listing = self
                    .monitor
                    .observe("list_inventory", self.backend.list(Table::Inventory, &query))
                    .await?;
                Ok::<_, QueryError>(listing.rows)
            })
            .await
    }

    pub async fn inventory_page(
        &self,
        page: u32,
        limit: u32,
        filter: &InventoryFilter,
    ) -> Result<Arc<Page>, QueryError> {
        check_page(page, limit)?;
        let key = resource::inventory_page(page, limit, filter)?;
        let query = ListQuery::select(columns::INVENTORY)
            .eq_opt("category", filter.category.as_deref())
            .eq_opt("status", filter.status.as_deref())
            .order("name", true);

        self.cached_page(key.into(), TtlTier::Short, Table::Inventory, query, page, limit)
            .await
    }

    // == Quotes ==
    pub async fn quotes_page(
        &self,
        page: u32,
        limit: u32,
        filter: &QuoteFilter,
    ) -> Result<Arc<Page>, QueryError> {
        check_page(page, limit)?;
        let key = resource::quotes_page(page, limit, filter)?;
        let query = ListQuery::select(columns::QUOTE)
            .eq_opt("status", filter.status.as_deref())
            .eq_opt("lead_id", filter.lead_id.as_deref())
            .order("created_at", false);

        self.cached_page(key.into(), TtlTier::Short, Table::Quotes, query, page, limit)
            .await
    }

    // == Pricing ==
    pub async fn pricing_options(
        &self,
        model: Option<&str>,
        category: Option<&str>,
        available_only: bool,
    ) -> Result<Arc<Vec<Record>>, QueryError> {
        let key = resource::pricing_options(model, category, available_only);
        let mut query = ListQuery::select(columns::PRICING)
            .eq_opt("model", model)
            .eq_opt("category", category)
            .order("display_order", true)
            .order("category", true)
            .order("name", true);
        if available_only {
            query = query.eq("is_available", true);
        }

        self.cache
            .cached(key, self.ttl.ttl(TtlTier::Pricing), || async {
                let listing = self
                    .monitor
                    .observe("list_pricing_options", self.backend.list(Table::PricingOptions, &query))
                    .await?;
                Ok::<_, QueryError>(listing.rows)
            })
            .await
    }

    // == Knowledge Base ==
    pub async fn knowledge_base_articles(
        &self,
        category: Option<&str>,
    ) -> Result<Arc<Vec<Record>>, QueryError> {
        let query = ListQuery::select(columns::KB_ARTICLE)
            .eq("published", true)
            .eq_opt("category", category)
            .order("created_at", false);

        self.cache
            .cached(resource::kb_list(category), self.ttl.ttl(TtlTier::Long), || async {
                let listing = self
                    .monitor
                    .observe("list_kb_articles", self.backend.list(Table::KnowledgeBase, &query))
                    .await?;
                Ok::<_, QueryError>(listing.rows)
            })
            .await
    }

    pub async fn knowledge_base_article(&self, slug: &str) -> Result<Arc<Record>, QueryError> {
        let query = ListQuery::select(columns::KB_ARTICLE)
            .eq("slug", slug)
            .eq("published", true);
        self.cached_one(resource::kb_article(slug).into(), TtlTier::Long, Table::KnowledgeBase, query, slug)
            .await
    }

    // == Warmup ==
    /// Reads worth having hot before the first request: configurator pricing
    /// first, then the dashboard and pipeline board.
    pub fn warmup_tasks(self: &Arc<Self>) -> Vec<WarmupTask> {
        let mut tasks = Vec::new();

        for model in [Some("3.5t"), Some("4.5t"), Some("7.2t"), None] {
            let queries = Arc::clone(self);
            let name = format!("pricing_{}", model.unwrap_or("all"));
            tasks.push(WarmupTask::new(name, WarmupPriority::Critical, move || {
                let queries = Arc::clone(&queries);
                async move {
                    queries.pricing_options(model, None, true).await?;
                    Ok(())
                }
            }));
        }

        let queries = Arc::clone(self);
        tasks.push(WarmupTask::new("dashboard_metrics", WarmupPriority::High, move || {
            let queries = Arc::clone(&queries);
            async move {
                queries.dashboard_metrics().await?;
                Ok(())
            }
        }));

        let queries = Arc::clone(self);
        tasks.push(WarmupTask::new("pipeline_data", WarmupPriority::High, move || {
            let queries = Arc::clone(&queries);
            async move {
                queries.pipeline().await?;
                Ok(())
            }
        }));

        tasks
    }

    async fn cached_page(
        &self,
        key: String,
        tier: TtlTier,
        table: Table,
        query: ListQuery,
        page: u32,
        limit: u32,
    ) -> Result<Arc<Page>, QueryError> {
        let offset = u64::from(page - 1) * u64::from(limit);
        let query = query.range(offset, u64::from(limit)).counted();

        self.cache
            .cached(key, self.ttl.ttl(tier), || async {
                let name = format!("page_{}", table.as_str());
                let listing = self
                    .monitor
                    .observe(&name, self.backend.list(table, &query))
                    .await?;
                let total = listing.total.unwrap_or(listing.rows.len() as u64);
                debug!(table = table.as_str(), page, total, "loaded page");
                Ok::<_, QueryError>(Page {
                    items: listing.rows,
                    pagination: Pagination::new(page, limit, total),
                })
            })
            .await
    }

    async fn cached_one(
        &self,
        key: String,
        tier: TtlTier,
        table: Table,
        query: ListQuery,
        lookup: &str,
    ) -> Result<Arc<Record>, QueryError> {
        self.cache
            .cached(key, self.ttl.ttl(tier), || async {
                let name = format!("fetch_{}", table.as_str());
                self.monitor
                    .observe(&name, self.backend.fetch_one(table, &query))
                    .await?
                    .ok_or_else(|| QueryError::NotFound {
                        table: table.as_str(),
                        key: lookup.to_string(),
                    })
            })
            .await
    }
}

fn check_page(page: u32, limit: u32) -> Result<(), QueryError> {
    if page == 0 || limit == 0 {
        return Err(QueryError::InvalidPage { page, limit });
    }
    Ok(())
}

// == Row Helpers ==
fn text<'a>(row: &'a Record, field: &str) -> Option<&'a str> {
    row.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn number(row: &Record, field: &str) -> Option<f64> {
    row.get(field).and_then(Value::as_f64)
}

fn pipeline_card(row: &Record) -> PipelineCard {
    let contact = format!(
        "{} {}",
        text(row, "first_name").unwrap_or_default(),
        text(row, "last_name").unwrap_or_default()
    )
    .trim()
    .to_string();

    PipelineCard {
        id: row.get("id").cloned().unwrap_or(Value::Null),
        organization: text(row, "company")
            .map(str::to_string)
            .unwrap_or_else(|| contact.clone()),
        contact,
        email: text(row, "email").map(str::to_string),
        phone: text(row, "phone").map(str::to_string),
        value: number(row, "quote_amount").unwrap_or(0.0),
        model: text(row, "model_interest").unwrap_or("Not specified").to_string(),
        assigned_to: text(row, "assigned_to").unwrap_or("Unassigned").to_string(),
        created_at: text(row, "created_at").map(str::to_string),
        score: row
            .get("lead_score")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_LEAD_SCORE),
        stage: text(row, "stage").unwrap_or(PIPELINE_STAGES[0]).to_string(),
    }
}
