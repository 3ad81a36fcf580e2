//! Cache key construction
//!
//! Keys are `<resource>:<operation>:<params>`. Every segment is escaped so a
//! parameter cannot forge a separator, and filters are rendered as canonical
//! JSON (sorted fields, nulls dropped) so equal filters always share a key
//! no matter how they were built.

use std::fmt::{self, Display, Write as _};

use serde::Serialize;
use serde_json::Value;

use crate::error::{CacheError, Result};

/// Segment separator.
pub const SEPARATOR: char = ':';

/// Rendering of an absent optional parameter or an empty filter.
pub const ANY: &str = "*";

// == Cache Key ==
/// Builder for a namespaced cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    segments: Vec<String>,
    filter: Option<String>,
}

impl CacheKey {
    /// Starts a key for `resource`.
    pub fn new(resource: &str) -> Self {
        Self {
            segments: vec![escape(resource)],
            filter: None,
        }
    }

    /// Appends an operation name such as `page` or `list`.
    pub fn op(self, operation: &str) -> Self {
        self.param(operation)
    }

    /// Appends one parameter segment.
    pub fn param(mut self, value: impl Display) -> Self {
        self.segments.push(escape(&value.to_string()));
        self
    }

    /// Appends an optional parameter, rendering `None` as [`ANY`].
    pub fn param_opt(self, value: Option<impl Display>) -> Self {
        match value {
            Some(value) => self.param(value),
            None => self.raw(ANY),
        }
    }

    /// Sets the filter segment, always rendered last.
    ///
    /// # Errors
    /// Fails if `filter` cannot be represented as JSON.
    pub fn filter<F: Serialize + ?Sized>(mut self, filter: &F) -> Result<Self> {
        let value = serde_json::to_value(filter)
            .map_err(|err| CacheError::InvalidKey(format!("filter not serializable: {}", err)))?;
        self.filter = Some(canonical_filter(&value));
        Ok(self)
    }

    /// Renders the key as a prefix matching it and every key extending it.
    pub fn as_prefix(&self) -> String {
        let mut prefix = self.segments.join(":");
        prefix.push(SEPARATOR);
        prefix
    }

    fn raw(mut self, segment: &str) -> Self {
        self.segments.push(segment.to_string());
        self
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join(":"))?;
        if let Some(filter) = &self.filter {
            f.write_char(SEPARATOR)?;
            f.write_str(filter)?;
        }
        Ok(())
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.to_string()
    }
}

// == Escaping ==
/// Percent-escapes the characters that carry meaning inside a key.
pub fn escape(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for ch in segment.chars() {
        match ch {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            '*' => out.push_str("%2A"),
            _ => out.push(ch),
        }
    }
    out
}

// == Canonical Filters ==
/// Renders a filter value as canonical JSON, or [`ANY`] when it constrains nothing.
pub fn canonical_filter(value: &Value) -> String {
    match strip_nulls(value) {
        None => ANY.to_string(),
        Some(Value::Object(map)) if map.is_empty() => ANY.to_string(),
        Some(value) => {
            let mut out = String::new();
            write_canonical(&value, &mut out);
            out
        }
    }
}

fn strip_nulls(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => Some(Value::Object(
            map.iter()
                .filter_map(|(k, v)| strip_nulls(v).map(|v| (k.clone(), v)))
                .collect(),
        )),
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| strip_nulls(item).unwrap_or(Value::Null))
                .collect(),
        )),
        other => Some(other.clone()),
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<_> = map.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, value)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

// == Resource Keys ==
/// Key builders for every cached read of the operations platform.
pub mod resource {
    use super::*;

    pub fn dashboard_stats() -> CacheKey {
        CacheKey::new("dashboard").op("stats")
    }

    pub fn dashboard_metrics(user_id: Option<&str>) -> CacheKey {
        CacheKey::new("dashboard").op("metrics").param_opt(user_id)
    }

    pub fn pipeline_data() -> CacheKey {
        CacheKey::new("pipeline").op("data")
    }

    pub fn pipeline_stage_count(stage: &str) -> CacheKey {
        CacheKey::new("pipeline").op("stage").param(stage).op("count")
    }

    pub fn lead(id: &str) -> CacheKey {
        CacheKey::new("lead").param(id)
    }

    pub fn leads_page<F: Serialize>(page: u32, limit: u32, filter: &F) -> Result<CacheKey> {
        CacheKey::new("leads").op("page").param(page).param(limit).filter(filter)
    }

    pub fn customer(id: &str) -> CacheKey {
        CacheKey::new("customer").param(id)
    }

    pub fn customers_page(page: u32, limit: u32) -> CacheKey {
        CacheKey::new("customers").op("page").param(page).param(limit)
    }

    pub fn inventory_list() -> CacheKey {
        CacheKey::new("inventory").op("list")
    }

    pub fn inventory_item(id: &str) -> CacheKey {
        CacheKey::new("inventory").op("item").param(id)
    }

    pub fn inventory_page<F: Serialize>(page: u32, limit: u32, filter: &F) -> Result<CacheKey> {
        CacheKey::new("inventory").op("page").param(page).param(limit).filter(filter)
    }

    pub fn quote(id: &str) -> CacheKey {
        CacheKey::new("quote").param(id)
    }

    pub fn quotes_page<F: Serialize>(page: u32, limit: u32, filter: &F) -> Result<CacheKey> {
        CacheKey::new("quotes").op("page").param(page).param(limit).filter(filter)
    }

    pub fn pricing_config() -> CacheKey {
        CacheKey::new("pricing").op("config")
    }

    pub fn model_pricing(model_id: &str) -> CacheKey {
        CacheKey::new("pricing").op("model").param(model_id)
    }

    pub fn pricing_options(
        model: Option<&str>,
        category: Option<&str>,
        available_only: bool,
    ) -> CacheKey {
        CacheKey::new("pricing")
            .op("options")
            .param_opt(model)
            .param_opt(category)
            .op(if available_only { "available" } else { "all" })
    }

    pub fn kb_article(slug: &str) -> CacheKey {
        CacheKey::new("kb").op("article").param(slug)
    }

    pub fn kb_list(category: Option<&str>) -> CacheKey {
        CacheKey::new("kb").op("list").param_opt(category)
    }

    pub fn search_results(index: &str, query: &str) -> CacheKey {
        CacheKey::new("search").param(index).param(query)
    }
}

// == Invalidation Prefixes ==
/// Prefixes used by writers to clear every variant of a resource.
pub mod prefix {
    pub const DASHBOARD: &str = "dashboard:";
    pub const PIPELINE: &str = "pipeline:";
    pub const LEADS_PAGES: &str = "leads:page:";
    pub const LEAD: &str = "lead:";
    pub const CUSTOMERS_PAGES: &str = "customers:page:";
    pub const CUSTOMER: &str = "customer:";
    pub const INVENTORY: &str = "inventory:";
    pub const INVENTORY_PAGES: &str = "inventory:page:";
    pub const QUOTES_PAGES: &str = "quotes:page:";
    pub const QUOTE: &str = "quote:";
    pub const KNOWLEDGE_BASE: &str = "kb:";
    pub const PRICING: &str = "pricing:";
    pub const SEARCH: &str = "search:";
}
