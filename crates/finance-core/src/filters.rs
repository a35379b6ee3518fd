//! Record filtering
//!
//! A `FilterConfig` holds the filter form exactly as the user left it, with
//! "All"/"all"/"" meaning "no constraint". It compiles into a `RecordFilter`,
//! whose predicate is the AND of every active constraint. Date bounds always
//! apply to the transaction `date`; `createdAt` only matters for the edit
//! window.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::period::{Period, PeriodWindow};
use crate::records::{Record, parse_amount};

/// Something that accepts or rejects a record
pub trait RecordPredicate {
    fn matches(&self, record: &Record) -> bool;
}

impl<F> RecordPredicate for F
where
    F: Fn(&Record) -> bool,
{
    fn matches(&self, record: &Record) -> bool {
        self(record)
    }
}

/// Keep the records accepted by `predicate`, preserving order
pub fn filter_records<P: RecordPredicate + ?Sized>(records: &[Record], predicate: &P) -> Vec<Record> {
    records.iter().filter(|r| predicate.matches(r)).cloned().collect()
}

/// Filter form values as typed
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    pub category: String,
    pub division: String,
    pub from_date: String,
    pub to_date: String,
    pub min_amount: String,
    pub max_amount: String,
    pub description: String,
}

/// Filter form value that could not be understood
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("{field}: '{value}' is not a valid YYYY-MM-DD date")]
    InvalidDate { field: &'static str, value: String },

    #[error("{field}: '{value}' is not a number")]
    InvalidAmount { field: &'static str, value: String },
}

/// Compiled advanced filter; `None` fields impose no constraint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub category: Option<String>,
    pub division: Option<String>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    /// Stored lowercased
    pub description: Option<String>,
}

fn selector(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(value.to_string())
    }
}

fn date_bound(value: &str, field: &'static str) -> Result<Option<NaiveDate>, FilterError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| FilterError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

fn amount_bound(value: &str, field: &'static str) -> Result<Option<Decimal>, FilterError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    parse_amount(value)
        .map(Some)
        .ok_or_else(|| FilterError::InvalidAmount {
            field,
            value: value.to_string(),
        })
}

impl RecordFilter {
    /// Compile form values; blank and "all" selections become no-ops
    pub fn from_config(config: &FilterConfig) -> Result<Self, FilterError> {
        let from_date = date_bound(&config.from_date, "fromDate")?;
        let to_date = date_bound(&config.to_date, "toDate")?;
        let min_amount = amount_bound(&config.min_amount, "minAmount")?;
        let max_amount = amount_bound(&config.max_amount, "maxAmount")?;

        // An inverted range is a valid filter that matches nothing
        if from_date.zip(to_date).is_some_and(|(from, to)| from > to)
            || min_amount.zip(max_amount).is_some_and(|(min, max)| min > max)
        {
            tracing::debug!(?from_date, ?to_date, ?min_amount, ?max_amount, "filter range is empty");
        }

        let description = config.description.trim();

        Ok(Self {
            category: selector(&config.category),
            division: selector(&config.division),
            from_date,
            to_date,
            min_amount,
            max_amount,
            description: (!description.is_empty()).then(|| description.to_lowercase()),
        })
    }

    /// True when no constraint is active
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }

    /// Whether any constraint needs the record's date
    fn needs_date(&self) -> bool {
        self.from_date.is_some() || self.to_date.is_some()
    }
}

impl RecordPredicate for RecordFilter {
    fn matches(&self, record: &Record) -> bool {
        if let Some(category) = &self.category {
            if record.category != *category {
                return false;
            }
        }

        if let Some(division) = &self.division {
            if record.division.as_deref() != Some(division.as_str()) {
                return false;
            }
        }

        if self.needs_date() {
            let Some(date) = record.date else {
                return false;
            };
            if self.from_date.is_some_and(|from| date < from) {
                return false;
            }
            if self.to_date.is_some_and(|to| date > to) {
                return false;
            }
        }

        if self.min_amount.is_some_and(|min| record.amount < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| record.amount > max) {
            return false;
        }

        if let Some(needle) = &self.description {
            if !record.description.to_lowercase().contains(needle.as_str()) {
                return false;
            }
        }

        true
    }
}

/// Dashboard view: period window AND advanced filter, always both
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardFilter {
    pub window: PeriodWindow,
    pub advanced: RecordFilter,
}

impl DashboardFilter {
    pub fn new(period: Period, now: NaiveDateTime, advanced: RecordFilter) -> Self {
        Self {
            window: period.window(now),
            advanced,
        }
    }
}

impl RecordPredicate for DashboardFilter {
    fn matches(&self, record: &Record) -> bool {
        self.window.matches(record) && self.advanced.matches(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordKind;
    use rust_decimal_macros::dec;

    fn record(id: &str, amount: Decimal, category: &str, division: Option<&str>, date: &str, desc: &str) -> Record {
        Record {
            id: id.to_string(),
            kind: RecordKind::Income,
            amount,
            category: category.to_string(),
            division: division.map(|d| d.to_string()),
            description: desc.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            created_at: None,
        }
    }

    fn sample() -> Vec<Record> {
        vec![
            record("1", dec!(1000), "Salary", Some("Office"), "2024-01-05", "January salary"),
            record("2", dec!(250), "Freelance", Some("Personal"), "2024-01-12", "Logo design"),
            record("3", dec!(40), "Interest", None, "2024-02-01", "Savings interest"),
            record("4", dec!(75), "Other", Some("Personal"), "not-a-date", "Gift"),
        ]
    }

    fn config() -> FilterConfig {
        FilterConfig {
            category: "All".to_string(),
            division: "all".to_string(),
            ..Default::default()
        }
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_noop_config_returns_set_unchanged() {
        let filter = RecordFilter::from_config(&config()).unwrap();
        assert!(filter.is_noop());

        let records = sample();
        assert_eq!(filter_records(&records, &filter), records);
    }

    #[test]
    fn test_category_is_exact_and_case_sensitive() {
        let mut cfg = config();
        cfg.category = "Salary".to_string();
        let filter = RecordFilter::from_config(&cfg).unwrap();
        assert_eq!(ids(&filter_records(&sample(), &filter)), vec!["1"]);

        cfg.category = "salary".to_string();
        let filter = RecordFilter::from_config(&cfg).unwrap();
        assert!(filter_records(&sample(), &filter).is_empty());
    }

    #[test]
    fn test_division_requires_a_matching_value() {
        let mut cfg = config();
        cfg.division = "Personal".to_string();
        let filter = RecordFilter::from_config(&cfg).unwrap();
        assert_eq!(ids(&filter_records(&sample(), &filter)), vec!["2", "4"]);
    }

    #[test]
    fn test_date_bounds_are_inclusive_and_fail_closed() {
        let mut cfg = config();
        cfg.from_date = "2024-01-05".to_string();
        cfg.to_date = "2024-01-12".to_string();
        let filter = RecordFilter::from_config(&cfg).unwrap();
        assert_eq!(ids(&filter_records(&sample(), &filter)), vec!["1", "2"]);
    }

    #[test]
    fn test_amount_bounds_are_inclusive() {
        let mut cfg = config();
        cfg.min_amount = "75".to_string();
        cfg.max_amount = "250".to_string();
        let filter = RecordFilter::from_config(&cfg).unwrap();
        assert_eq!(ids(&filter_records(&sample(), &filter)), vec!["2", "4"]);
    }

    #[test]
    fn test_description_is_case_insensitive_substring() {
        let mut cfg = config();
        cfg.description = "SALARY".to_string();
        let filter = RecordFilter::from_config(&cfg).unwrap();
        assert_eq!(ids(&filter_records(&sample(), &filter)), vec!["1"]);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let mut cfg = config();
        cfg.min_amount = "ten".to_string();
        assert!(matches!(
            RecordFilter::from_config(&cfg),
            Err(FilterError::InvalidAmount { field: "minAmount", .. })
        ));

        let mut cfg = config();
        cfg.to_date = "01/02/2024".to_string();
        assert!(matches!(
            RecordFilter::from_config(&cfg),
            Err(FilterError::InvalidDate { field: "toDate", .. })
        ));
    }

    #[test]
    fn test_inverted_ranges_match_nothing() {
        let mut cfg = config();
        cfg.from_date = "2024-02-01".to_string();
        cfg.to_date = "2024-01-01".to_string();
        let filter = RecordFilter::from_config(&cfg).unwrap();
        assert!(filter_records(&sample(), &filter).is_empty());

        let mut cfg = config();
        cfg.min_amount = "500".to_string();
        cfg.max_amount = "100".to_string();
        let filter = RecordFilter::from_config(&cfg).unwrap();
        assert!(filter_records(&sample(), &filter).is_empty());
    }

    #[test]
    fn test_filtering_is_an_idempotent_subset() {
        let configs = [
            FilterConfig {
                category: "Freelance".to_string(),
                ..config()
            },
            FilterConfig {
                min_amount: "50".to_string(),
                description: "a".to_string(),
                ..config()
            },
            FilterConfig {
                division: "Office".to_string(),
                from_date: "2024-01-01".to_string(),
                ..config()
            },
        ];
        let records = sample();
        for cfg in &configs {
            let filter = RecordFilter::from_config(cfg).unwrap();
            let once = filter_records(&records, &filter);
            assert!(once.iter().all(|r| records.contains(r)));
            assert_eq!(filter_records(&once, &filter), once);
        }
    }

    #[test]
    fn test_dashboard_applies_period_and_advanced_filters() {
        let now = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap().and_hms_opt(10, 0, 0).unwrap();
        let mut cfg = config();
        cfg.division = "Office".to_string();
        let advanced = RecordFilter::from_config(&cfg).unwrap();

        let monthly = DashboardFilter::new(Period::Monthly, now, advanced.clone());
        assert!(filter_records(&sample(), &monthly).is_empty());

        let yearly = DashboardFilter::new(Period::Yearly, now, advanced);
        assert_eq!(ids(&filter_records(&sample(), &yearly)), vec!["1"]);
    }

    #[test]
    fn test_closures_are_predicates() {
        let big = |r: &Record| r.amount >= dec!(250);
        assert_eq!(ids(&filter_records(&sample(), &big)), vec!["1", "2"]);
    }
}
