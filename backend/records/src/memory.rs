use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering::Relaxed},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    error::StoreError,
    store::{Filter, Query, RecordStore, Table},
};

/// In-process store with the same filter, order and window semantics as the hosted one.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<Table, Vec<Value>>>,
    failures: AtomicUsize,
    calls: AtomicU64,
    selects: Mutex<Vec<Query>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n` calls fail with a 503.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Relaxed);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Relaxed)
    }

    /// Every select received so far, oldest first.
    pub async fn selects(&self) -> Vec<Query> {
        self.selects.lock().await.clone()
    }

    pub async fn rows(&self, table: Table) -> Vec<Value> {
        self.tables
            .lock()
            .await
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Relaxed);

        let injected = self
            .failures
            .fetch_update(Relaxed, Relaxed, |n| n.checked_sub(1))
            .is_ok();

        if injected {
            return Err(StoreError::Status {
                status: 503,
                body: "injected failure".to_string(),
            });
        }

        Ok(())
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn matches(row: &Value, filter: &Filter) -> bool {
    let field = row.get(filter.column()).and_then(text);

    match (filter, field) {
        (Filter::Eq(_, expected), Some(actual)) => &actual == expected,
        (Filter::In(_, expected), Some(actual)) => expected.contains(&actual),
        (_, None) => false,
    }
}

fn compare(a: &Value, b: &Value, column: &str) -> Ordering {
    let a = a.get(column).and_then(text);
    let b = b.get(column).and_then(text);

    a.cmp(&b)
}

fn project(row: &Value, columns: Option<&str>) -> Value {
    let Some(columns) = columns.filter(|c| *c != "*") else {
        return row.clone();
    };

    let projected = columns
        .split(',')
        .map(str::trim)
        .filter_map(|column| row.get(column).map(|v| (column.to_string(), v.clone())))
        .collect();

    Value::Object(projected)
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        self.enter()?;

        self.tables
            .lock()
            .await
            .entry(table)
            .or_default()
            .push(row.clone());

        Ok(row)
    }

    async fn update(
        &self,
        table: Table,
        id: &str,
        patch: Value,
    ) -> Result<Option<Value>, StoreError> {
        self.enter()?;

        let mut tables = self.tables.lock().await;
        let id_filter = Filter::eq("id", id);

        let Some(row) = tables
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|row| matches(row, &id_filter)))
        else {
            return Ok(None);
        };

        if let (Value::Object(target), Value::Object(fields)) = (&mut *row, patch) {
            target.extend(fields);
        }

        Ok(Some(row.clone()))
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        self.enter()?;

        let id_filter = Filter::eq("id", id);
        if let Some(rows) = self.tables.lock().await.get_mut(&table) {
            rows.retain(|row| !matches(row, &id_filter));
        }

        Ok(())
    }

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, StoreError> {
        self.enter()?;
        self.selects.lock().await.push(query.clone());

        let tables = self.tables.lock().await;
        let mut rows: Vec<&Value> = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|f| matches(row, f)))
                    .collect()
            })
            .unwrap_or_default();

        // stable, so rows equal on every key keep insertion order
        rows.sort_by(|a, b| {
            query.order.iter().fold(Ordering::Equal, |ordering, order| {
                ordering.then_with(|| {
                    let ordering = compare(a, b, order.column);
                    if order.descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                })
            })
        });

        let (offset, limit) = query.window.unwrap_or((0, usize::MAX));

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| project(row, query.columns))
            .collect())
    }

    async fn count(&self, table: Table, filters: &[Filter]) -> Result<u64, StoreError> {
        self.enter()?;

        let tables = self.tables.lock().await;
        let count = tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| filters.iter().all(|f| matches(row, f)))
                    .count()
            })
            .unwrap_or(0);

        Ok(count as u64)
    }
}
