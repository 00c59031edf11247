//! # Database
//!
//! Typed accessors over a [`RecordStore`].
//!
//! ## Guarantees
//! - Every store call goes through the [`RetryPolicy`], transient failures only.
//! - Listings page through offset windows until a short page or the page cap,
//!   so the store's default row cap never truncates a result. Pages are always
//!   ordered with `id` last, otherwise the store may repeat or skip rows between windows.
//! - Inclusion filters are split into chunks of [`ID_CHUNK`] ids to keep request URLs bounded.
//!
//! ## Known gaps
//! - Username uniqueness is check-then-insert. Two concurrent registrations with
//!   the same name can both pass the check; only a unique index on the store closes it.
use std::sync::Arc;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{Lottery, Merchant, MerchantPatch, Response, Survey},
    retry::RetryPolicy,
    store::{Filter, Query, RecordStore, Table},
};

pub const ID_CHUNK: usize = 100;

#[derive(Debug, Clone)]
pub struct Paging {
    pub page_size: usize,
    pub max_pages: usize,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            page_size: 1000,
            max_pages: 100,
        }
    }
}

#[derive(Deserialize)]
struct IdRow {
    id: Uuid,
}

#[derive(Deserialize)]
struct TimestampRow {
    submitted_at: String,
}

#[derive(Clone)]
pub struct Database {
    store: Arc<dyn RecordStore>,
    retry: RetryPolicy,
    paging: Paging,
}

fn decode<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(StoreError::from))
        .collect()
}

fn encode<T: Serialize>(row: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(row)?)
}

impl Database {
    pub fn new(store: Arc<dyn RecordStore>, retry: RetryPolicy, paging: Paging) -> Self {
        Self {
            store,
            retry,
            paging,
        }
    }

    pub fn backend_tag(&self) -> &'static str {
        self.store.backend_tag()
    }

    async fn insert<T: Serialize + DeserializeOwned>(
        &self,
        table: Table,
        row: &T,
    ) -> Result<T, StoreError> {
        let store = &self.store;
        let row = encode(row)?;

        let stored = self
            .retry
            .run(&format!("insert into {table}"), || {
                store.insert(table, row.clone())
            })
            .await?;

        Ok(serde_json::from_value(stored)?)
    }

    async fn update<T: DeserializeOwned>(
        &self,
        table: Table,
        id: Uuid,
        patch: Value,
    ) -> Result<Option<T>, StoreError> {
        let store = &self.store;
        let id = id.to_string();

        let updated = self
            .retry
            .run(&format!("update {table}"), || {
                store.update(table, &id, patch.clone())
            })
            .await?;

        updated
            .map(|row| serde_json::from_value(row).map_err(StoreError::from))
            .transpose()
    }

    async fn delete(&self, table: Table, id: Uuid) -> Result<(), StoreError> {
        let store = &self.store;
        let id = id.to_string();

        self.retry
            .run(&format!("delete from {table}"), || store.delete(table, &id))
            .await
    }

    async fn count(&self, table: Table, filters: &[Filter]) -> Result<u64, StoreError> {
        let store = &self.store;

        self.retry
            .run(&format!("count {table}"), || store.count(table, filters))
            .await
    }

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, StoreError> {
        let store = &self.store;

        self.retry
            .run(&format!("select from {table}"), || store.select(table, query))
            .await
    }

    async fn fetch_one<T: DeserializeOwned>(
        &self,
        table: Table,
        filter: Filter,
    ) -> Result<Option<T>, StoreError> {
        let query = Query::new().filter(filter).window(0, 1);
        let rows = self.select(table, &query).await?;

        Ok(decode(rows)?.into_iter().next())
    }

    async fn fetch_all<T: DeserializeOwned>(
        &self,
        table: Table,
        query: Query,
    ) -> Result<Vec<T>, StoreError> {
        let Paging {
            page_size,
            max_pages,
        } = self.paging;
        // offset windows are only stable over a total order
        let query = query.then_ascending("id");
        let mut rows = Vec::new();

        for page in 0..max_pages {
            let windowed = query.clone().window(page * page_size, page_size);
            let batch = self.select(table, &windowed).await?;
            let exhausted = batch.len() < page_size;

            rows.extend(batch);

            if exhausted {
                return decode(rows);
            }
        }

        warn!("{table} listing stopped at the {max_pages} page cap");
        decode(rows)
    }

    async fn fetch_all_in<T: DeserializeOwned>(
        &self,
        table: Table,
        query: Query,
        column: &'static str,
        ids: &[Uuid],
    ) -> Result<Vec<T>, StoreError> {
        let mut rows = Vec::new();

        for chunk in ids.chunks(ID_CHUNK) {
            let chunked = query.clone().filter(Filter::any_of(column, chunk));
            rows.extend(self.fetch_all(table, chunked).await?);
        }

        Ok(rows)
    }

    // merchants

    pub async fn get_merchant(&self, id: Uuid) -> Result<Option<Merchant>, StoreError> {
        self.fetch_one(Table::Merchants, Filter::eq("id", id)).await
    }

    pub async fn find_merchant_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Merchant>, StoreError> {
        self.fetch_one(Table::Merchants, Filter::eq("username", username))
            .await
    }

    pub async fn register_merchant(&self, merchant: &Merchant) -> Result<Merchant, StoreError> {
        if self
            .find_merchant_by_username(&merchant.username)
            .await?
            .is_some()
        {
            return Err(StoreError::Conflict("Username already exists".to_string()));
        }

        self.insert(Table::Merchants, merchant).await
    }

    pub async fn update_merchant(
        &self,
        id: Uuid,
        patch: &MerchantPatch,
    ) -> Result<Option<Merchant>, StoreError> {
        if let Some(username) = &patch.username {
            if let Some(existing) = self.find_merchant_by_username(username).await? {
                if existing.id != id {
                    return Err(StoreError::Conflict("Username already exists".to_string()));
                }
            }
        }

        self.update(Table::Merchants, id, encode(patch)?).await
    }

    pub async fn delete_merchant(&self, id: Uuid) -> Result<(), StoreError> {
        self.delete(Table::Merchants, id).await
    }

    pub async fn list_merchants(&self) -> Result<Vec<Merchant>, StoreError> {
        self.fetch_all(Table::Merchants, Query::new()).await
    }

    pub async fn list_sub_merchants(&self, owner_id: Uuid) -> Result<Vec<Merchant>, StoreError> {
        let query = Query::new().filter(Filter::eq("owner_id", owner_id));
        self.fetch_all(Table::Merchants, query).await
    }

    pub async fn count_owners(&self) -> Result<u64, StoreError> {
        self.count(Table::Merchants, &[Filter::eq("role", "owner")])
            .await
    }

    pub async fn count_merchants(&self) -> Result<u64, StoreError> {
        self.count(Table::Merchants, &[]).await
    }

    // surveys

    pub async fn insert_survey(&self, survey: &Survey) -> Result<Survey, StoreError> {
        self.insert(Table::Surveys, survey).await
    }

    /// `created_at` is left as stored.
    pub async fn update_survey(&self, survey: &Survey) -> Result<Option<Survey>, StoreError> {
        let mut patch = encode(survey)?;
        if let Value::Object(fields) = &mut patch {
            fields.remove("id");
            fields.remove("created_at");
        }

        self.update(Table::Surveys, survey.id, patch).await
    }

    pub async fn delete_survey(&self, id: Uuid) -> Result<(), StoreError> {
        self.delete(Table::Surveys, id).await
    }

    pub async fn get_survey(&self, id: Uuid) -> Result<Option<Survey>, StoreError> {
        self.fetch_one(Table::Surveys, Filter::eq("id", id)).await
    }

    pub async fn list_all_surveys(&self) -> Result<Vec<Survey>, StoreError> {
        let query = Query::new().newest_first("created_at");
        self.fetch_all(Table::Surveys, query).await
    }

    pub async fn list_surveys_for(&self, merchant_ids: &[Uuid]) -> Result<Vec<Survey>, StoreError> {
        let query = Query::new().newest_first("created_at");
        let mut surveys: Vec<Survey> = self
            .fetch_all_in(Table::Surveys, query, "merchant_id", merchant_ids)
            .await?;

        // chunks are each ordered, the union is not
        surveys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(surveys)
    }

    pub async fn all_survey_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        let rows: Vec<IdRow> = self
            .fetch_all(Table::Surveys, Query::new().columns("id"))
            .await?;

        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    pub async fn survey_ids_for(&self, merchant_ids: &[Uuid]) -> Result<Vec<Uuid>, StoreError> {
        let rows: Vec<IdRow> = self
            .fetch_all_in(
                Table::Surveys,
                Query::new().columns("id"),
                "merchant_id",
                merchant_ids,
            )
            .await?;

        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    // lotteries

    pub async fn insert_lottery(&self, lottery: &Lottery) -> Result<Lottery, StoreError> {
        self.insert(Table::Lotteries, lottery).await
    }

    /// Replaces name and prizes; ownership is fixed at creation.
    pub async fn update_lottery(&self, lottery: &Lottery) -> Result<Option<Lottery>, StoreError> {
        let patch = serde_json::json!({
            "name": lottery.name,
            "prizes": encode(&lottery.prizes)?,
        });

        self.update(Table::Lotteries, lottery.id, patch).await
    }

    pub async fn delete_lottery(&self, id: Uuid) -> Result<(), StoreError> {
        self.delete(Table::Lotteries, id).await
    }

    pub async fn get_lottery(&self, id: Uuid) -> Result<Option<Lottery>, StoreError> {
        self.fetch_one(Table::Lotteries, Filter::eq("id", id)).await
    }

    pub async fn list_all_lotteries(&self) -> Result<Vec<Lottery>, StoreError> {
        self.fetch_all(Table::Lotteries, Query::new()).await
    }

    pub async fn list_lotteries_for(
        &self,
        merchant_ids: &[Uuid],
    ) -> Result<Vec<Lottery>, StoreError> {
        self.fetch_all_in(Table::Lotteries, Query::new(), "merchant_id", merchant_ids)
            .await
    }

    // responses

    pub async fn insert_response(&self, response: &Response) -> Result<Response, StoreError> {
        self.insert(Table::Responses, response).await
    }

    pub async fn list_responses(
        &self,
        survey_id: Option<Uuid>,
    ) -> Result<Vec<Response>, StoreError> {
        let mut query = Query::new().newest_first("submitted_at");
        if let Some(survey_id) = survey_id {
            query = query.filter(Filter::eq("survey_id", survey_id));
        }

        self.fetch_all(Table::Responses, query).await
    }

    pub async fn count_responses(&self, survey_ids: &[Uuid]) -> Result<u64, StoreError> {
        let mut total = 0;

        for chunk in survey_ids.chunks(ID_CHUNK) {
            total += self
                .count(Table::Responses, &[Filter::any_of("survey_id", chunk)])
                .await?;
        }

        Ok(total)
    }

    pub async fn response_timestamps(&self, survey_ids: &[Uuid]) -> Result<Vec<String>, StoreError> {
        let rows: Vec<TimestampRow> = self
            .fetch_all_in(
                Table::Responses,
                Query::new().columns("submitted_at"),
                "survey_id",
                survey_ids,
            )
            .await?;

        Ok(rows.into_iter().map(|row| row.submitted_at).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, time::Duration};

    use super::*;
    use crate::{memory::MemoryStore, models::Role};

    fn database(store: Arc<MemoryStore>, page_size: usize) -> Database {
        Database::new(
            store,
            RetryPolicy {
                max_attempts: 3,
                delay: Duration::ZERO,
            },
            Paging {
                page_size,
                max_pages: 100,
            },
        )
    }

    fn response(survey_id: Uuid, day: u32) -> Response {
        Response {
            id: Uuid::new_v4(),
            survey_id,
            customer_id: Uuid::new_v4(),
            answers: BTreeMap::new(),
            submitted_at: format!("2025-03-{day:02}T12:00:00+00:00"),
        }
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_username() {
        let db = database(Arc::new(MemoryStore::new()), 10);

        let first = Merchant::new("A".into(), "alice".into(), "pw".into(), Role::Owner, None);
        db.register_merchant(&first).await.unwrap();

        let second = Merchant::new("B".into(), "alice".into(), "pw".into(), Role::Manager, None);
        let err = db.register_merchant(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        assert_eq!(db.list_merchants().await.unwrap().len(), 1);
        assert_eq!(db.count_owners().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_merchant_username_checks() {
        let db = database(Arc::new(MemoryStore::new()), 10);

        let alice = Merchant::new("A".into(), "alice".into(), "pw".into(), Role::Owner, None);
        let bob = Merchant::new("B".into(), "bob".into(), "pw".into(), Role::Manager, None);
        db.register_merchant(&alice).await.unwrap();
        db.register_merchant(&bob).await.unwrap();

        let taken = MerchantPatch {
            username: Some("alice".into()),
            ..Default::default()
        };
        assert!(matches!(
            db.update_merchant(bob.id, &taken).await,
            Err(StoreError::Conflict(_))
        ));

        let unchanged = MerchantPatch {
            username: Some("bob".into()),
            restaurant_name: Some("Bob's".into()),
            ..Default::default()
        };
        let updated = db.update_merchant(bob.id, &unchanged).await.unwrap().unwrap();
        assert_eq!(updated.restaurant_name, "Bob's");
        assert_eq!(updated.password.as_deref(), Some("pw"));

        assert!(
            db.update_merchant(Uuid::new_v4(), &unchanged)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_listing_pages_past_page_size() {
        let store = Arc::new(MemoryStore::new());
        let db = database(store.clone(), 2);
        let survey_id = Uuid::new_v4();

        for day in 1..=5 {
            db.insert_response(&response(survey_id, day)).await.unwrap();
        }

        let listed = db.list_responses(Some(survey_id)).await.unwrap();
        assert_eq!(listed.len(), 5);
        assert!(listed[0].submitted_at > listed[4].submitted_at);

        let timestamps = db.response_timestamps(&[survey_id]).await.unwrap();
        assert_eq!(timestamps.len(), 5);
    }

    #[tokio::test]
    async fn test_paged_reads_end_on_id_order() {
        let store = Arc::new(MemoryStore::new());
        let db = database(store.clone(), 2);
        let survey_id = Uuid::new_v4();

        let mut inserted = Vec::new();
        for _ in 0..5 {
            let response = db.insert_response(&response(survey_id, 7)).await.unwrap();
            inserted.push(response.id);
        }

        let listed = db.list_responses(Some(survey_id)).await.unwrap();
        let mut listed_ids: Vec<Uuid> = listed.iter().map(|r| r.id).collect();
        inserted.sort();
        assert_eq!(listed_ids, inserted);

        db.response_timestamps(&[survey_id]).await.unwrap();
        db.list_merchants().await.unwrap();

        let selects = store.selects().await;
        assert!(selects.len() >= 3 + 3 + 1);
        for query in &selects {
            let last = query.order.last().unwrap();
            assert_eq!(last.column, "id");
            assert!(!last.descending);
        }
        assert_eq!(selects[0].order[0].column, "submitted_at");

        listed_ids.dedup();
        assert_eq!(listed_ids.len(), 5);
    }

    #[tokio::test]
    async fn test_reads_survive_transient_failures() {
        let store = Arc::new(MemoryStore::new());
        let db = database(store.clone(), 10);
        let survey_id = Uuid::new_v4();

        db.insert_response(&response(survey_id, 1)).await.unwrap();
        store.fail_next(2);

        assert_eq!(db.count_responses(&[survey_id]).await.unwrap(), 1);

        store.fail_next(3);
        assert!(db.count_responses(&[survey_id]).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_id_sets_skip_the_store() {
        let store = Arc::new(MemoryStore::new());
        let db = database(store.clone(), 10);

        assert_eq!(db.count_responses(&[]).await.unwrap(), 0);
        assert!(db.response_timestamps(&[]).await.unwrap().is_empty());
        assert!(db.survey_ids_for(&[]).await.unwrap().is_empty());
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_counts_span_id_chunks() {
        let db = database(Arc::new(MemoryStore::new()), 1000);
        let survey_ids: Vec<Uuid> = (0..ID_CHUNK + 5).map(|_| Uuid::new_v4()).collect();

        for survey_id in &survey_ids {
            db.insert_response(&response(*survey_id, 2)).await.unwrap();
        }

        assert_eq!(
            db.count_responses(&survey_ids).await.unwrap(),
            survey_ids.len() as u64
        );
    }
}
