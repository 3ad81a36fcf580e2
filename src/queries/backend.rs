//! Hosted backend boundary
//!
//! The cache layer knows nothing about the database's query language,
//! connections, or auth. It describes reads with [`ListQuery`] and lets an
//! [`OperationsBackend`] implementation run them.

use async_trait::async_trait;
use serde_json::Value;

/// One row as returned by the backend.
pub type Record = Value;

/// Tables read through the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Leads,
    Builds,
    Customers,
    Inventory,
    Quotes,
    PricingOptions,
    KnowledgeBase,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Leads => "leads",
            Table::Builds => "builds",
            Table::Customers => "customers",
            Table::Inventory => "inventory",
            Table::Quotes => "quotes",
            Table::PricingOptions => "pricing_options",
            Table::KnowledgeBase => "knowledge_base",
        }
    }
}

// == Column Lists ==
/// Column projections, so reads never over-fetch.
pub mod columns {
    pub const LEAD: &str = "id,first_name,last_name,email,phone,company,stage,status,lead_score,quote_amount,created_at,updated_at,assigned_to,model_interest,configurator_snapshot";
    pub const LEAD_WITH_ACTIVITIES: &str = "id,first_name,last_name,email,phone,company,stage,status,lead_score,quote_amount,created_at,updated_at,assigned_to,model_interest,configurator_snapshot,lead_activities(id,activity_type,description,created_at,metadata)";
    pub const CUSTOMER: &str = "id,first_name,last_name,email,phone,company,address,status,total_spent,created_at,updated_at";
    pub const INVENTORY: &str = "id,name,sku,quantity,unit_price,category,location,status,created_at,updated_at";
    pub const KB_ARTICLE: &str = "id,title,slug,excerpt,content,category,tags,author,published,views,created_at,updated_at";
    pub const QUOTE: &str = "id,lead_id,quote_number,total_price,status,created_at,valid_until,sent_at,viewed_at";
    pub const PRICING: &str = "id,model,category,subcategory,name,description,sku,price,vat_rate,is_default,is_available,dependencies,incompatible_with,display_order,image_url";
}

// == Conditions ==
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(&'static str, Value),
    Gte(&'static str, Value),
    NotNull(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub ascending: bool,
}

/// A read against one table.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub columns: &'static str,
    pub conditions: Vec<Condition>,
    pub order: Vec<Order>,
    /// Zero-based offset and row count
    pub range: Option<(u64, u64)>,
    /// Ask for the total matching row count alongside the rows
    pub with_count: bool,
}

impl ListQuery {
    pub fn select(columns: &'static str) -> Self {
        Self {
            columns,
            conditions: Vec::new(),
            order: Vec::new(),
            range: None,
            with_count: false,
        }
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(column, value.into()));
        self
    }

    /// Adds an equality condition only when `value` is present.
    pub fn eq_opt(self, column: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.eq(column, value),
            None => self,
        }
    }

    pub fn gte(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Gte(column, value.into()));
        self
    }

    pub fn not_null(mut self, column: &'static str) -> Self {
        self.conditions.push(Condition::NotNull(column));
        self
    }

    pub fn order(mut self, column: &'static str, ascending: bool) -> Self {
        self.order.push(Order { column, ascending });
        self
    }

    pub fn range(mut self, offset: u64, limit: u64) -> Self {
        self.range = Some((offset, limit));
        self
    }

    pub fn counted(mut self) -> Self {
        self.with_count = true;
        self
    }
}

/// Rows returned for a [`ListQuery`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub rows: Vec<Record>,
    /// Total matching rows, when requested
    pub total: Option<u64>,
}

// == Backend Trait ==
/// The hosted database, as seen by the read path.
#[async_trait]
pub trait OperationsBackend: Send + Sync + 'static {
    async fn list(&self, table: Table, query: &ListQuery) -> anyhow::Result<Listing>;

    /// Fetches at most one row matching `query`.
    async fn fetch_one(&self, table: Table, query: &ListQuery) -> anyhow::Result<Option<Record>>;

    /// Counts rows matching `conditions` without returning them.
    async fn count(&self, table: Table, conditions: &[Condition]) -> anyhow::Result<u64>;
}
