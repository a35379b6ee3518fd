//! Recurring expenses (rent, subscriptions) with a next due date

use chrono::NaiveDate;
use finance_core::ValidationError;
use finance_core::records::{MAX_AMOUNT, parse_amount, parse_amount_value, parse_record_date};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringExpense {
    pub id: String,
    pub name: String,
    pub amount: Decimal,
    pub category: String,
    pub next_due: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecurring {
    #[serde(alias = "_id")]
    id: Option<String>,
    expense_name: Option<String>,
    amount: Option<Value>,
    category: Option<String>,
    next_due: Option<String>,
}

/// Normalize the recurring list, skipping entries without id or amount
pub fn ingest_recurring(values: Vec<Value>) -> Vec<RecurringExpense> {
    values
        .into_iter()
        .filter_map(|value| {
            let raw: RawRecurring = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed recurring expense");
                    return None;
                }
            };
            let id = raw.id?;
            let Some(amount) = raw
                .amount
                .as_ref()
                .and_then(parse_amount_value)
                .filter(|amount| *amount <= MAX_AMOUNT)
            else {
                tracing::warn!(%id, "skipping recurring expense without a usable amount");
                return None;
            };
            Some(RecurringExpense {
                id,
                name: raw.expense_name.unwrap_or_default(),
                amount,
                category: raw.category.unwrap_or_default(),
                next_due: raw.next_due.as_deref().and_then(parse_record_date),
            })
        })
        .collect()
}

/// Body of a create request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecurring {
    pub expense_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub category: String,
    /// Midnight UTC of the due date, RFC 3339
    pub next_due: String,
}

/// Recurring expense form as typed
#[derive(Debug, Clone, Default)]
pub struct RecurringDraft {
    pub name: String,
    pub amount: String,
    pub category: String,
    pub next_due: String,
}

impl RecurringDraft {
    pub fn validate(&self) -> Result<NewRecurring, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::Missing("expense name"));
        }

        let raw_amount = self.amount.trim();
        if raw_amount.is_empty() {
            return Err(ValidationError::Missing("amount"));
        }
        let amount = parse_amount(raw_amount).ok_or_else(|| ValidationError::InvalidAmount(raw_amount.to_string()))?;
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NotPositive);
        }
        if amount > MAX_AMOUNT {
            return Err(ValidationError::TooLarge);
        }

        let category = self.category.trim();
        if category.is_empty() || category.eq_ignore_ascii_case("select") {
            return Err(ValidationError::Missing("category"));
        }

        let raw_due = self.next_due.trim();
        if raw_due.is_empty() {
            return Err(ValidationError::Missing("next due date"));
        }
        let due = NaiveDate::parse_from_str(raw_due, "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidDate(raw_due.to_string()))?;

        Ok(NewRecurring {
            expense_name: name.to_string(),
            amount,
            category: category.to_string(),
            next_due: format!("{}T00:00:00.000Z", due.format("%Y-%m-%d")),
        })
    }
}
