//! Local copy of the income and expense collections
//!
//! Each fetch is tagged with a generation. A response is applied only if no
//! newer fetch for the same kind was started in the meantime, so a slow
//! response can never overwrite fresher data. Edits and deletes are applied
//! locally first and rolled back if the service refuses them.
//!
//! `refresh` and `refresh_all` hold `&mut self` across the request, so two
//! of them never overlap on one book. The generation guard matters for
//! callers that share a book and drive `begin_fetch` and `complete_fetch`
//! themselves around their own requests.

use chrono::{DateTime, Utc};
use finance_core::{NewRecord, Record, RecordKind, RecordPatch};

use crate::api::ApiClient;
use crate::error::ApiError;

/// Fetch sequence number, newest wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

#[derive(Debug, Default)]
struct Slot {
    records: Vec<Record>,
    issued: u64,
}

#[derive(Debug, Default)]
pub struct RecordBook {
    income: Slot,
    expenses: Slot,
}

impl RecordBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: RecordKind) -> &Slot {
        match kind {
            RecordKind::Income => &self.income,
            RecordKind::Expense => &self.expenses,
        }
    }

    fn slot_mut(&mut self, kind: RecordKind) -> &mut Slot {
        match kind {
            RecordKind::Income => &mut self.income,
            RecordKind::Expense => &mut self.expenses,
        }
    }

    pub fn records(&self, kind: RecordKind) -> &[Record] {
        &self.slot(kind).records
    }

    #[cfg(test)]
    pub fn find(&self, kind: RecordKind, id: &str) -> Option<&Record> {
        self.records(kind).iter().find(|r| r.id == id)
    }

    // =========================================================================
    // Fetching
    // =========================================================================

    /// Start a fetch; supersedes every earlier one for the same kind
    pub fn begin_fetch(&mut self, kind: RecordKind) -> Generation {
        let slot = self.slot_mut(kind);
        slot.issued += 1;
        Generation(slot.issued)
    }

    /// Apply a fetch result unless a newer fetch was started since.
    /// Returns whether the records were applied.
    pub fn complete_fetch(&mut self, kind: RecordKind, generation: Generation, records: Vec<Record>) -> bool {
        let slot = self.slot_mut(kind);
        if generation.0 != slot.issued {
            tracing::debug!(
                %kind,
                generation = generation.0,
                newest = slot.issued,
                "discarding stale response"
            );
            return false;
        }
        slot.records = records;
        true
    }

    pub async fn refresh(&mut self, client: &ApiClient, kind: RecordKind) -> Result<usize, ApiError> {
        let generation = self.begin_fetch(kind);
        let records = client.list_records(kind).await?;
        let count = records.len();
        self.complete_fetch(kind, generation, records);
        Ok(count)
    }

    /// Fetch both collections concurrently
    pub async fn refresh_all(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        let income_gen = self.begin_fetch(RecordKind::Income);
        let expense_gen = self.begin_fetch(RecordKind::Expense);

        let (income, expenses) = tokio::try_join!(
            client.list_records(RecordKind::Income),
            client.list_records(RecordKind::Expense)
        )?;

        tracing::debug!(income = income.len(), expenses = expenses.len(), "fetched records");
        self.complete_fetch(RecordKind::Income, income_gen, income);
        self.complete_fetch(RecordKind::Expense, expense_gen, expenses);
        Ok(())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub async fn create(&mut self, client: &ApiClient, new: &NewRecord) -> Result<Record, ApiError> {
        let created = client.create_record(new).await?;
        self.slot_mut(created.kind).records.push(created.clone());
        Ok(created)
    }

    fn mutable_index(&self, kind: RecordKind, id: &str, now: DateTime<Utc>) -> Result<usize, ApiError> {
        let index = self
            .records(kind)
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| ApiError::NotFound {
                kind,
                id: id.to_string(),
            })?;

        let record = &self.records(kind)[index];
        if !record.editability(now).is_mutable() {
            return Err(ApiError::Locked(match record.created_at {
                Some(created) => format!("created {}, edit window closed", created.format("%Y-%m-%d %H:%M UTC")),
                None => "creation time unknown".to_string(),
            }));
        }
        Ok(index)
    }

    /// Patch a record locally, then on the service; undone on failure
    pub async fn update(
        &mut self,
        client: &ApiClient,
        kind: RecordKind,
        id: &str,
        patch: &RecordPatch,
        now: DateTime<Utc>,
    ) -> Result<Record, ApiError> {
        patch.validate()?;
        let index = self.mutable_index(kind, id, now)?;

        let original = self.records(kind)[index].clone();
        let records = &mut self.slot_mut(kind).records;
        patch.apply_to(&mut records[index]);
        let updated = records[index].clone();

        match client.update_record(&original, patch).await {
            Ok(()) => Ok(updated),
            Err(e) => {
                tracing::warn!(%kind, %id, error = %e, "update refused, restoring record");
                if let Some(slot) = self.slot_mut(kind).records.iter_mut().find(|r| r.id == id) {
                    *slot = original;
                }
                Err(e)
            }
        }
    }

    /// Remove a record locally, then on the service; reinserted on failure
    pub async fn delete(
        &mut self,
        client: &ApiClient,
        kind: RecordKind,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Record, ApiError> {
        let index = self.mutable_index(kind, id, now)?;
        let removed = self.slot_mut(kind).records.remove(index);

        match client.delete_record(&removed).await {
            Ok(()) => Ok(removed),
            Err(e) => {
                tracing::warn!(%kind, %id, error = %e, "delete refused, restoring record");
                let records = &mut self.slot_mut(kind).records;
                let at = index.min(records.len());
                records.insert(at, removed);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::session::Session;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::{delete, put};
    use chrono::TimeDelta;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn record(id: &str, created_at: Option<DateTime<Utc>>) -> Record {
        Record {
            id: id.to_string(),
            kind: RecordKind::Expense,
            amount: dec!(100),
            category: "Food".to_string(),
            division: None,
            description: "lunch".to_string(),
            date: None,
            created_at,
        }
    }

    async fn client_for(router: Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let config = Config {
            base_url: format!("http://{}", addr),
            timeout: Duration::from_millis(500),
            max_retries: 2,
            backoff_base: Duration::from_millis(5),
            ..Config::default()
        };
        ApiClient::new(&config, Session::with_token("tok")).unwrap()
    }

    fn loaded_book(now: DateTime<Utc>) -> RecordBook {
        let mut book = RecordBook::new();
        let generation = book.begin_fetch(RecordKind::Expense);
        book.complete_fetch(
            RecordKind::Expense,
            generation,
            vec![
                record("a", Some(now - TimeDelta::hours(1))),
                record("b", Some(now - TimeDelta::hours(2))),
                record("old", Some(now - TimeDelta::hours(13))),
            ],
        );
        book
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut book = RecordBook::new();
        let first = book.begin_fetch(RecordKind::Income);
        let second = book.begin_fetch(RecordKind::Income);
        assert!(second > first);

        assert!(book.complete_fetch(RecordKind::Income, second, vec![record("new", None)]));
        assert!(!book.complete_fetch(RecordKind::Income, first, vec![record("stale", None)]));
        assert_eq!(book.records(RecordKind::Income)[0].id, "new");
    }

    #[test]
    fn test_generations_are_per_kind() {
        let mut book = RecordBook::new();
        let income = book.begin_fetch(RecordKind::Income);
        book.begin_fetch(RecordKind::Expense);

        assert!(book.complete_fetch(RecordKind::Income, income, vec![record("i", None)]));
        assert_eq!(book.records(RecordKind::Income).len(), 1);
        assert!(book.records(RecordKind::Expense).is_empty());
    }

    #[tokio::test]
    async fn test_locked_record_refused_before_request() {
        let now = Utc::now();
        // No routes: any request would fail with 404, not Locked
        let client = client_for(Router::new()).await;
        let mut book = loaded_book(now);

        let patch = RecordPatch {
            amount: Some(dec!(1)),
            ..Default::default()
        };
        let err = book
            .update(&client, RecordKind::Expense, "old", &patch, now)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Locked(_)));
        assert_eq!(book.find(RecordKind::Expense, "old").unwrap().amount, dec!(100));

        let err = book.delete(&client, RecordKind::Expense, "missing", now).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_refused_update_rolls_back() {
        let now = Utc::now();
        let router = Router::new().route("/api/expenses/{id}", put(|| async { StatusCode::FORBIDDEN }));
        let client = client_for(router).await;
        let mut book = loaded_book(now);

        let patch = RecordPatch {
            amount: Some(dec!(42)),
            description: Some("dinner".to_string()),
            ..Default::default()
        };
        let err = book
            .update(&client, RecordKind::Expense, "a", &patch, now)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Locked(_)));

        let restored = book.find(RecordKind::Expense, "a").unwrap();
        assert_eq!(restored.amount, dec!(100));
        assert_eq!(restored.description, "lunch");
    }

    #[tokio::test]
    async fn test_accepted_update_is_kept() {
        let now = Utc::now();
        let router = Router::new().route("/api/expenses/{id}", put(|| async { StatusCode::OK }));
        let client = client_for(router).await;
        let mut book = loaded_book(now);

        let patch = RecordPatch {
            category: Some("Fuel".to_string()),
            ..Default::default()
        };
        let updated = book
            .update(&client, RecordKind::Expense, "b", &patch, now)
            .await
            .unwrap();
        assert_eq!(updated.category, "Fuel");
        assert_eq!(book.find(RecordKind::Expense, "b").unwrap().category, "Fuel");
    }

    #[tokio::test]
    async fn test_failed_delete_restores_position() {
        let now = Utc::now();
        let router = Router::new().route(
            "/api/expenses/{id}",
            delete(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let client = client_for(router).await;
        let mut book = loaded_book(now);

        let err = book.delete(&client, RecordKind::Expense, "a", now).await.unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 500, .. }));

        let ids: Vec<&str> = book.records(RecordKind::Expense).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "old"]);
    }

    #[tokio::test]
    async fn test_successful_delete_removes() {
        let now = Utc::now();
        let router = Router::new().route("/api/expenses/{id}", delete(|| async { StatusCode::NO_CONTENT }));
        let client = client_for(router).await;
        let mut book = loaded_book(now);

        let removed = book.delete(&client, RecordKind::Expense, "b", now).await.unwrap();
        assert_eq!(removed.id, "b");
        assert!(book.find(RecordKind::Expense, "b").is_none());
        assert_eq!(book.records(RecordKind::Expense).len(), 2);
    }
}
