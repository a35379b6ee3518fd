//! Income and expense records
//!
//! The records service is loose about shapes: amounts arrive as numbers or
//! numeric strings, dates as plain `YYYY-MM-DD` or full timestamps, and
//! optional fields are simply absent. Everything is normalized here, at the
//! ingestion boundary, so the rest of the crate works on one strict shape.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Secondary classification, orthogonal to category
pub const DIVISIONS: &[&str] = &["Office", "Personal"];

/// Canonical spelling of a known division, matched case-insensitively
pub fn canonical_division(raw: &str) -> Option<&'static str> {
    let raw = raw.trim();
    DIVISIONS.iter().copied().find(|d| d.eq_ignore_ascii_case(raw))
}

/// Largest amount accepted for a single record (one quadrillion).
/// Keeps every realistic sum far below `Decimal::MAX`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Placeholder value the forms use for "nothing chosen yet"
const PLACEHOLDER: &str = "select";

/// Whether a record is money in or money out
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Income,
    Expense,
}

impl RecordKind {
    /// Collection path segment on the records service
    pub fn collection(&self) -> &'static str {
        match self {
            RecordKind::Income => "income",
            RecordKind::Expense => "expenses",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Income => "Income",
            RecordKind::Expense => "Expense",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A normalized income or expense entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Server-assigned identifier
    pub id: String,
    pub kind: RecordKind,
    /// Never negative
    pub amount: Decimal,
    pub category: String,
    pub division: Option<String>,
    pub description: String,
    /// Transaction date; `None` when the service sent nothing parseable
    pub date: Option<NaiveDate>,
    /// Server-assigned creation time, drives the edit window
    pub created_at: Option<DateTime<Utc>>,
}

/// Record exactly as the service sends it, before normalization
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(alias = "_id")]
    pub id: Option<String>,
    pub amount: Option<Value>,
    pub category: Option<String>,
    pub division: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub created_at: Option<String>,
}

/// Why a raw record could not be used
#[derive(Debug, thiserror::Error)]
pub enum MalformedRecord {
    #[error("record is not an object: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("record has no id")]
    MissingId,

    #[error("record {0} has no amount")]
    MissingAmount(String),

    #[error("record {id} has non-numeric amount {raw}")]
    InvalidAmount { id: String, raw: String },

    #[error("record {id} has negative amount {amount}")]
    NegativeAmount { id: String, amount: Decimal },

    #[error("record {id} has amount {amount} above the {max} limit", max = MAX_AMOUNT)]
    AmountTooLarge { id: String, amount: Decimal },
}

impl Record {
    /// Normalize a raw record, rejecting ones that cannot be summed
    pub fn normalize(kind: RecordKind, raw: RawRecord) -> Result<Self, MalformedRecord> {
        let id = raw
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or(MalformedRecord::MissingId)?;

        let amount = match raw.amount {
            None | Some(Value::Null) => return Err(MalformedRecord::MissingAmount(id)),
            Some(value) => match parse_amount_value(&value) {
                Some(amount) => amount,
                None => {
                    return Err(MalformedRecord::InvalidAmount {
                        id,
                        raw: value.to_string(),
                    });
                }
            },
        };
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MalformedRecord::NegativeAmount { id, amount });
        }
        if amount > MAX_AMOUNT {
            return Err(MalformedRecord::AmountTooLarge { id, amount });
        }

        Ok(Self {
            id,
            kind,
            amount,
            category: raw.category.unwrap_or_default(),
            division: raw.division.filter(|d| !d.trim().is_empty()),
            description: raw.description.unwrap_or_default(),
            date: raw.date.as_deref().and_then(parse_record_date),
            created_at: raw.created_at.as_deref().and_then(parse_timestamp),
        })
    }
}

/// Normalize a JSON array from the service, dropping malformed entries
pub fn ingest(kind: RecordKind, values: Vec<Value>) -> Vec<Record> {
    let total = values.len();
    let records: Vec<Record> = values
        .into_iter()
        .filter_map(|value| {
            let result = serde_json::from_value::<RawRecord>(value)
                .map_err(MalformedRecord::from)
                .and_then(|raw| Record::normalize(kind, raw));
            match result {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(%kind, error = %e, "skipping malformed record");
                    None
                }
            }
        })
        .collect();

    if records.len() < total {
        tracing::debug!(%kind, kept = records.len(), total, "ingested records");
    }
    records
}

/// Parse an amount from a JSON number or numeric string
pub fn parse_amount_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(Decimal::from(u))
            } else {
                n.as_f64().and_then(Decimal::from_f64)
            }
        }
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// Parse a user- or service-supplied amount string
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Parse a transaction date: `YYYY-MM-DD` or a timestamp (date part kept)
pub fn parse_record_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

/// Parse a creation timestamp (RFC 3339)
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// =============================================================================
// Creation and update payloads
// =============================================================================

/// Body of a create request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRecord {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    pub description: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: RecordKind,
}

/// Partial update; only `Some` fields are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordPatch {
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Entry form contents, as typed by the user
#[derive(Debug, Clone, Default)]
pub struct RecordDraft {
    pub amount: String,
    pub category: String,
    pub division: String,
    pub description: String,
    pub date: String,
}

/// Form validation failure, raised before anything is sent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("amount '{0}' is not a number")]
    InvalidAmount(String),

    #[error("amount must not be negative")]
    NegativeAmount,

    #[error("amount must be a positive number")]
    NotPositive,

    #[error("amount must not exceed {max}", max = MAX_AMOUNT)]
    TooLarge,

    #[error("division '{0}' must be one of {known}", known = DIVISIONS.join(", "))]
    UnknownDivision(String),

    #[error("date '{0}' is not a valid YYYY-MM-DD date")]
    InvalidDate(String),

    #[error("nothing to update")]
    EmptyPatch,
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(PLACEHOLDER) {
        Err(ValidationError::Missing(field))
    } else {
        Ok(value)
    }
}

fn non_negative(raw: &str) -> Result<Decimal, ValidationError> {
    let amount = parse_amount(raw).ok_or_else(|| ValidationError::InvalidAmount(raw.trim().to_string()))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ValidationError::NegativeAmount);
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationError::TooLarge);
    }
    Ok(amount)
}

impl RecordDraft {
    /// Check required fields and build the create body.
    /// Income additionally requires a division.
    pub fn validate(&self, kind: RecordKind) -> Result<NewRecord, ValidationError> {
        let amount = non_negative(required(&self.amount, "amount")?)?;
        let category = required(&self.category, "category")?.to_string();
        let division = match self.division.trim() {
            d if d.is_empty() || d.eq_ignore_ascii_case(PLACEHOLDER) => match kind {
                RecordKind::Income => return Err(ValidationError::Missing("division")),
                RecordKind::Expense => None,
            },
            d => Some(
                canonical_division(d)
                    .ok_or_else(|| ValidationError::UnknownDivision(d.to_string()))?
                    .to_string(),
            ),
        };
        let description = required(&self.description, "description")?.to_string();
        let raw_date = required(&self.date, "date")?;
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(raw_date.to_string()))?;

        Ok(NewRecord {
            amount,
            category,
            division,
            description,
            date,
            kind,
        })
    }
}

impl RecordPatch {
    /// Reject empty patches and negative amounts
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        if self.amount.is_some_and(|a| a.is_sign_negative() && !a.is_zero()) {
            return Err(ValidationError::NegativeAmount);
        }
        if self.amount.is_some_and(|a| a > MAX_AMOUNT) {
            return Err(ValidationError::TooLarge);
        }
        // An empty division clears it
        if let Some(division) = self.division.as_deref().map(str::trim)
            && !division.is_empty()
            && canonical_division(division).is_none()
        {
            return Err(ValidationError::UnknownDivision(division.to_string()));
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.category.is_none() && self.division.is_none() && self.description.is_none()
    }

    /// Apply the patch to a local copy of a record
    pub fn apply_to(&self, record: &mut Record) {
        if let Some(amount) = self.amount {
            record.amount = amount;
        }
        if let Some(category) = &self.category {
            record.category = category.clone();
        }
        if let Some(division) = &self.division {
            record.division = (!division.is_empty()).then(|| division.clone());
        }
        if let Some(description) = &self.description {
            record.description = description.clone();
        }
    }
}
