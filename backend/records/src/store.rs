use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Merchants,
    Surveys,
    Lotteries,
    Responses,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Merchants => "merchants",
            Table::Surveys => "surveys",
            Table::Lotteries => "lotteries",
            Table::Responses => "responses",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(&'static str, String),
    In(&'static str, Vec<String>),
}

impl Filter {
    pub fn eq(column: &'static str, value: impl ToString) -> Self {
        Filter::Eq(column, value.to_string())
    }

    pub fn any_of<T: ToString>(column: &'static str, values: &[T]) -> Self {
        Filter::In(column, values.iter().map(ToString::to_string).collect())
    }

    pub fn column(&self) -> &'static str {
        match self {
            Filter::Eq(column, _) | Filter::In(column, _) => column,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: &'static str,
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub columns: Option<&'static str>,
    pub filters: Vec<Filter>,
    /// Applied left to right, later entries break ties.
    pub order: Vec<Order>,
    /// (offset, limit)
    pub window: Option<(usize, usize)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: &'static str) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn newest_first(mut self, column: &'static str) -> Self {
        self.order.push(Order {
            column,
            descending: true,
        });
        self
    }

    /// Ascending tie-breaker, skipped when the column is already ordered on.
    pub fn then_ascending(mut self, column: &'static str) -> Self {
        if self.order.iter().all(|order| order.column != column) {
            self.order.push(Order {
                column,
                descending: false,
            });
        }
        self
    }

    pub fn window(mut self, offset: usize, limit: usize) -> Self {
        self.window = Some((offset, limit));
        self
    }
}

/// Hosted table store. Every call may fail transiently.
#[async_trait]
pub trait RecordStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError>;

    async fn update(&self, table: Table, id: &str, patch: Value)
    -> Result<Option<Value>, StoreError>;

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError>;

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, StoreError>;

    async fn count(&self, table: Table, filters: &[Filter]) -> Result<u64, StoreError>;
}
