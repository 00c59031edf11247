//! # Hosted Store
//!
//! PostgREST dialect over HTTPS. One table per collection, filters encoded in the query string.
//!
//! ## Requests
//! - Select: `GET /rest/v1/{table}?select=..&col=eq.v&col=in.("a","b")&order=col.desc,id.asc&offset=..&limit=..`
//! - Insert: `POST` with `Prefer: return=representation`, first row of the echoed array
//! - Update: `PATCH ?id=eq.{id}` with `Prefer: return=representation`, empty array means no such row
//! - Delete: `DELETE ?id=eq.{id}`
//! - Count: `HEAD` with `Prefer: count=exact`, total read from `Content-Range: 0-24/3573`
//!
//! ## Notes
//! - The store silently caps unwindowed selects (1000 rows by default), see [`crate::database`] for paging.
//! - 409 is a unique constraint violation on the store side.
use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::{AUTHORIZATION, CONTENT_RANGE, HeaderMap, HeaderValue},
};
use serde_json::Value;
use tracing::debug;

use crate::{
    error::StoreError,
    store::{Filter, Query, RecordStore, Table},
};

const REST_PATH: &str = "rest/v1";

pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, StoreError> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, table: Table) -> String {
        format!("{}/{REST_PATH}/{}", self.base_url, table.name())
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.api_key) {
            headers.insert("apikey", key);
        }
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
            headers.insert(AUTHORIZATION, bearer);
        }

        headers
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.headers(self.headers())
    }
}

fn encode_filter(filter: &Filter) -> (String, String) {
    match filter {
        Filter::Eq(column, value) => (column.to_string(), format!("eq.{value}")),
        Filter::In(column, values) => {
            let quoted: Vec<String> = values
                .iter()
                .map(|v| format!("\"{}\"", v.replace('"', "\\\"")))
                .collect();

            (column.to_string(), format!("in.({})", quoted.join(",")))
        }
    }
}

pub fn encode_query(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![(
        "select".to_string(),
        query.columns.unwrap_or("*").to_string(),
    )];

    params.extend(query.filters.iter().map(encode_filter));

    if !query.order.is_empty() {
        let order: Vec<String> = query
            .order
            .iter()
            .map(|order| {
                let direction = if order.descending { "desc" } else { "asc" };
                format!("{}.{direction}", order.column)
            })
            .collect();
        params.push(("order".to_string(), order.join(",")));
    }

    if let Some((offset, limit)) = query.window {
        params.push(("offset".to_string(), offset.to_string()));
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

/// Total from a `Content-Range` value such as `0-24/3573` or `*/0`.
pub fn parse_total(content_range: &str) -> Option<u64> {
    content_range.rsplit_once('/')?.1.trim().parse().ok()
}

async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::CONFLICT {
        return Err(StoreError::Conflict(body));
    }

    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn rows(response: Response) -> Result<Vec<Value>, StoreError> {
    let text = check(response).await?.text().await?;

    Ok(serde_json::from_str(&text)?)
}

#[async_trait]
impl RecordStore for RestStore {
    fn backend_tag(&self) -> &'static str {
        "rest"
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value, StoreError> {
        let response = self
            .request(self.client.post(self.url(table)))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;

        rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::Missing(table.name()))
    }

    async fn update(
        &self,
        table: Table,
        id: &str,
        patch: Value,
    ) -> Result<Option<Value>, StoreError> {
        let response = self
            .request(self.client.patch(self.url(table)))
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{id}"))])
            .json(&patch)
            .send()
            .await?;

        Ok(rows(response).await?.into_iter().next())
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), StoreError> {
        let response = self
            .request(self.client.delete(self.url(table)))
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, StoreError> {
        let params = encode_query(query);
        debug!("select {table} {params:?}");

        let response = self
            .request(self.client.get(self.url(table)))
            .query(&params)
            .send()
            .await?;

        rows(response).await
    }

    async fn count(&self, table: Table, filters: &[Filter]) -> Result<u64, StoreError> {
        let mut params = vec![("select".to_string(), "id".to_string())];
        params.extend(filters.iter().map(encode_filter));

        let response = self
            .request(self.client.head(self.url(table)))
            .header("Prefer", "count=exact")
            .query(&params)
            .send()
            .await?;

        let response = check(response).await?;
        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_total)
            .ok_or(StoreError::Missing(table.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_total() {
        assert_eq!(parse_total("0-24/3573"), Some(3573));
        assert_eq!(parse_total("*/0"), Some(0));
        assert_eq!(parse_total("*/*"), None);
        assert_eq!(parse_total("garbage"), None);
    }

    #[test]
    fn test_encode_query() {
        let query = Query::new()
            .columns("submitted_at")
            .filter(Filter::any_of("survey_id", &["a", "b"]))
            .filter(Filter::eq("active", true))
            .newest_first("submitted_at")
            .then_ascending("id")
            .window(1000, 1000);

        let params = encode_query(&query);

        assert_eq!(
            params,
            vec![
                ("select".to_string(), "submitted_at".to_string()),
                ("survey_id".to_string(), "in.(\"a\",\"b\")".to_string()),
                ("active".to_string(), "eq.true".to_string()),
                ("order".to_string(), "submitted_at.desc,id.asc".to_string()),
                ("offset".to_string(), "1000".to_string()),
                ("limit".to_string(), "1000".to_string()),
            ]
        );
    }

    #[test]
    fn test_default_projection() {
        let params = encode_query(&Query::new());
        assert_eq!(params, vec![("select".to_string(), "*".to_string())]);
    }
}
