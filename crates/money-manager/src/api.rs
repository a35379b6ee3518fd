//! REST client for the records service
//!
//! Every call has a timeout. Idempotent calls (GET, PUT, DELETE) are retried
//! on transient failures with exponential backoff; creates are sent once.
//! A 401 expires the session and is returned immediately.

use chrono::{DateTime, Utc};
use finance_core::records::{RawRecord, ingest};
use finance_core::{CategoryTotal, Editability, NewRecord, Record, RecordKind, RecordPatch};
use reqwest::Method;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::Config;
use crate::constants;
use crate::error::{ApiError, RequestKind, classify};
use crate::profile::{Profile, ProfileUpdate};
use crate::recurring::{NewRecurring, RecurringExpense, ingest_recurring};
use crate::session::Session;

/// Login response
#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
    message: Option<String>,
}

/// One request, described so it can be re-sent
struct Call {
    method: Method,
    path: String,
    body: Option<Value>,
    auth: bool,
    /// Set for edits and deletes: the record's creation time
    mutation_of: Option<Option<DateTime<Utc>>>,
}

impl Call {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            auth: true,
            mutation_of: None,
        }
    }

    fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn anonymous(mut self) -> Self {
        self.auth = false;
        self
    }

    fn mutation_of(mut self, record: &Record) -> Self {
        self.mutation_of = Some(record.created_at);
        self
    }

    fn is_idempotent(&self) -> bool {
        self.method != Method::POST
    }

    fn request_kind(&self) -> RequestKind {
        match self.mutation_of {
            Some(created_at) => RequestKind::Mutation(Editability::at(created_at, Utc::now())),
            None if self.auth => RequestKind::Authenticated,
            None => RequestKind::Anonymous,
        }
    }
}

/// Records service client
pub struct ApiClient {
    http: reqwest::Client,
    config: Config,
    session: Session,
}

impl ApiClient {
    pub fn new(config: &Config, session: Session) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            http,
            config: config.clone(),
            session,
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange credentials for a token and store it in the session
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let call = Call::new(Method::POST, constants::LOGIN_PATH)
            .anonymous()
            .body(serde_json::json!({ "email": email, "password": password }));
        let response: LoginResponse = self.fetch_json(&call).await?;

        match response.token.filter(|t| !t.trim().is_empty()) {
            Some(token) => {
                self.session.authenticate(&token)?;
                Ok(())
            }
            None => Err(ApiError::Rejected {
                status: 200,
                message: response
                    .message
                    .unwrap_or_else(|| "Invalid email or password".to_string()),
            }),
        }
    }

    // =========================================================================
    // Income and expenses
    // =========================================================================

    /// Fetch the full collection; filtering happens locally
    pub async fn list_records(&self, kind: RecordKind) -> Result<Vec<Record>, ApiError> {
        let call = Call::new(Method::GET, collection_path(kind));
        let values = self.fetch_list(&call).await?;
        Ok(ingest(kind, values))
    }

    /// Create a record; the response echoes it with id and createdAt
    pub async fn create_record(&self, record: &NewRecord) -> Result<Record, ApiError> {
        let body = serde_json::to_value(record).map_err(|e| ApiError::Decode(e.to_string()))?;
        let call = Call::new(Method::POST, collection_path(record.kind)).body(body);
        let raw: RawRecord = self.fetch_json(&call).await?;

        Record::normalize(record.kind, raw).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn update_record(&self, record: &Record, patch: &RecordPatch) -> Result<(), ApiError> {
        patch.validate()?;
        let body = serde_json::to_value(patch).map_err(|e| ApiError::Decode(e.to_string()))?;
        let call = Call::new(Method::PUT, record_path(record.kind, &record.id))
            .body(body)
            .mutation_of(record);
        self.execute(&call).await.map(|_| ())
    }

    pub async fn delete_record(&self, record: &Record) -> Result<(), ApiError> {
        let call = Call::new(Method::DELETE, record_path(record.kind, &record.id)).mutation_of(record);
        self.execute(&call).await.map(|_| ())
    }

    /// Server-side per-category expense totals
    pub async fn expense_summary(&self) -> Result<Vec<CategoryTotal>, ApiError> {
        let call = Call::new(Method::GET, constants::CATEGORY_SUMMARY_PATH);
        let values = self.fetch_list(&call).await?;

        Ok(values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<CategoryTotal>(value) {
                Ok(total) => Some(total),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed category summary entry");
                    None
                }
            })
            .collect())
    }

    // =========================================================================
    // Recurring expenses
    // =========================================================================

    pub async fn list_recurring(&self) -> Result<Vec<RecurringExpense>, ApiError> {
        let call = Call::new(Method::GET, constants::RECURRING_PATH);
        let values = self.fetch_list(&call).await?;
        Ok(ingest_recurring(values))
    }

    pub async fn create_recurring(&self, expense: &NewRecurring) -> Result<(), ApiError> {
        let body = serde_json::to_value(expense).map_err(|e| ApiError::Decode(e.to_string()))?;
        let call = Call::new(Method::POST, constants::RECURRING_PATH).body(body);
        self.execute(&call).await.map(|_| ())
    }

    pub async fn delete_recurring(&self, id: &str) -> Result<(), ApiError> {
        let call = Call::new(Method::DELETE, format!("{}/{}", constants::RECURRING_PATH, id));
        self.execute(&call).await.map(|_| ())
    }

    // =========================================================================
    // Account
    // =========================================================================

    pub async fn account_summary(&self) -> Result<Profile, ApiError> {
        let call = Call::new(Method::GET, constants::ACCOUNT_SUMMARY_PATH);
        let value: Value = self.fetch_json(&call).await?;
        Ok(Profile::from_value(value))
    }

    /// Profile picture URL, if one was uploaded
    pub async fn profile_picture(&self) -> Result<Option<String>, ApiError> {
        let call = Call::new(Method::GET, constants::PROFILE_PATH);
        let value: Value = self.fetch_json(&call).await?;
        Ok(Profile::from_value(value).profile_pic)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), ApiError> {
        let body = serde_json::to_value(update).map_err(|e| ApiError::Decode(e.to_string()))?;
        let call = Call::new(Method::PUT, constants::PROFILE_PATH).body(body);
        self.execute(&call).await.map(|_| ())
    }

    // =========================================================================
    // Transport
    // =========================================================================

    async fn fetch_json<T: DeserializeOwned>(&self, call: &Call) -> Result<T, ApiError> {
        let body = self.execute(call).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Fetch a JSON array; a non-array answer counts as empty
    async fn fetch_list(&self, call: &Call) -> Result<Vec<Value>, ApiError> {
        match self.fetch_json::<Value>(call).await? {
            Value::Array(values) => Ok(values),
            other => {
                tracing::warn!(path = %call.path, kind = json_kind(&other), "expected a JSON array");
                Ok(Vec::new())
            }
        }
    }

    /// Send with retry; returns the response body of the first success
    async fn execute(&self, call: &Call) -> Result<String, ApiError> {
        let attempts = if call.is_idempotent() { self.config.max_retries.max(1) } else { 1 };
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.send_once(call).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = backoff_delay(self.config.backoff_base, attempt);
                    tracing::warn!(
                        method = %call.method,
                        path = %call.path,
                        attempt,
                        max = attempts,
                        ?delay,
                        error = %e,
                        "request failed, retrying"
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, call: &Call) -> Result<String, ApiError> {
        let url = self.config.url(&call.path);
        let mut request = self
            .http
            .request(call.method.clone(), &url)
            .header(ACCEPT, "application/json");

        if call.auth {
            let token = self.session.bearer().ok_or(ApiError::Unauthorized)?;
            request = request.bearer_auth(token);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        tracing::debug!(method = %call.method, %url, "sending request");
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_transport(e, self.config.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(e, self.config.timeout))?;

        if status.is_success() {
            return Ok(body);
        }

        let error = classify(status, &body, call.request_kind());
        if matches!(error, ApiError::Unauthorized) {
            self.session.expire();
        }
        Err(error)
    }
}

/// Wait before retrying after `attempt` failures: `base * 2^(attempt-1)`, capped
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(Duration::from_secs(constants::MAX_BACKOFF_SECS))
}

fn collection_path(kind: RecordKind) -> String {
    format!("{}/{}", constants::RECORDS_PREFIX, kind.collection())
}

fn record_path(kind: RecordKind, id: &str) -> String {
    format!("{}/{}", collection_path(kind), id)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
