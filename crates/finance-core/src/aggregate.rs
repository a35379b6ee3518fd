//! Totals and groupings over filtered records

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::records::Record;

/// Dashboard totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub income_total: Decimal,
    pub expense_total: Decimal,
    /// income_total - expense_total
    pub balance: Decimal,
    pub income_count: usize,
    pub expense_count: usize,
}

/// Spend in one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// The server-side summary sends the category as `_id`
    #[serde(alias = "_id")]
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

/// Sum of amounts, saturating at `Decimal::MAX`
pub fn total(records: &[Record]) -> Decimal {
    records.iter().fold(Decimal::ZERO, |acc, r| acc.saturating_add(r.amount))
}

/// Reduce filtered income and expenses into totals
pub fn summarize(income: &[Record], expenses: &[Record]) -> Totals {
    let income_total = total(income);
    let expense_total = total(expenses);

    Totals {
        income_total,
        expense_total,
        balance: income_total.saturating_sub(expense_total),
        income_count: income.len(),
        expense_count: expenses.len(),
    }
}

/// One entry per distinct category, largest first
pub fn totals_by_category(records: &[Record]) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, Decimal> = HashMap::new();

    for record in records {
        let sum = totals.entry(record.category.as_str()).or_insert(Decimal::ZERO);
        *sum = sum.saturating_add(record.amount);
    }

    let mut result: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_string(),
            total,
        })
        .collect();
    result.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    result
}

/// Totals per `YYYY-MM`, oldest first. Undated records are skipped.
pub fn totals_by_month(records: &[Record]) -> Vec<(String, Decimal)> {
    let mut totals: HashMap<String, Decimal> = HashMap::new();

    for record in records {
        if let Some(date) = record.date {
            let month = date.format("%Y-%m").to_string();
            let sum = totals.entry(month).or_insert(Decimal::ZERO);
            *sum = sum.saturating_add(record.amount);
        }
    }

    let mut result: Vec<_> = totals.into_iter().collect();
    result.sort_by(|a, b| a.0.cmp(&b.0));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordKind;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn entry(kind: RecordKind, amount: Decimal, category: &str, date: Option<&str>) -> Record {
        Record {
            id: format!("{}-{}", category, amount),
            kind,
            amount,
            category: category.to_string(),
            division: None,
            description: String::new(),
            date: date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            created_at: None,
        }
    }

    #[test]
    fn test_summarize_income_and_expenses() {
        let income = vec![entry(RecordKind::Income, dec!(1000), "Salary", None)];
        let expenses = vec![
            entry(RecordKind::Expense, dec!(300), "Rent", None),
            entry(RecordKind::Expense, dec!(200), "Food", None),
        ];

        let totals = summarize(&income, &expenses);
        assert_eq!(totals.income_total, dec!(1000));
        assert_eq!(totals.expense_total, dec!(500));
        assert_eq!(totals.balance, dec!(500));
        assert_eq!(totals.income_count, 1);
        assert_eq!(totals.expense_count, 2);
    }

    #[test]
    fn test_empty_input_is_zero() {
        let totals = summarize(&[], &[]);
        assert_eq!(totals, Totals::default());
        assert!(totals.balance.is_zero());
    }

    #[test]
    fn test_decimal_sums_do_not_drift() {
        let expenses: Vec<Record> = (0..10)
            .map(|_| entry(RecordKind::Expense, dec!(0.1), "Food", None))
            .collect();
        let income = vec![entry(RecordKind::Income, dec!(1), "Salary", None)];

        let totals = summarize(&income, &expenses);
        assert_eq!(totals.expense_total, dec!(1.0));
        assert!(totals.balance.is_zero());
        assert_eq!(totals.balance, totals.income_total - totals.expense_total);
    }

    #[test]
    fn test_huge_amounts_never_overflow() {
        use crate::records::ingest;
        use serde_json::json;

        let huge = "50000000000000000000000000000";
        let ingested = ingest(
            RecordKind::Expense,
            vec![json!({"_id": "a", "amount": huge}), json!({"_id": "b", "amount": huge})],
        );
        assert!(ingested.is_empty());
        assert_eq!(summarize(&[], &ingested), Totals::default());

        // Records built in code skip the ingestion limit; sums saturate
        let big = Decimal::MAX - dec!(1);
        let expenses = vec![
            entry(RecordKind::Expense, big, "Rent", Some("2024-01-01")),
            entry(RecordKind::Expense, big, "Rent", Some("2024-01-02")),
        ];
        let totals = summarize(&[], &expenses);
        assert_eq!(totals.expense_total, Decimal::MAX);
        assert_eq!(totals_by_category(&expenses)[0].total, Decimal::MAX);
        assert_eq!(totals_by_month(&expenses)[0].1, Decimal::MAX);
    }

    #[test]
    fn test_group_by_category() {
        let expenses = vec![
            entry(RecordKind::Expense, dec!(100), "Food", None),
            entry(RecordKind::Expense, dec!(50), "Food", None),
            entry(RecordKind::Expense, dec!(30), "Fuel", None),
        ];

        let mut grouped = totals_by_category(&expenses);
        grouped.sort_by(|a, b| a.category.cmp(&b.category));
        assert_eq!(
            grouped,
            vec![
                CategoryTotal {
                    category: "Food".to_string(),
                    total: dec!(150)
                },
                CategoryTotal {
                    category: "Fuel".to_string(),
                    total: dec!(30)
                },
            ]
        );
    }

    #[test]
    fn test_server_summary_shape() {
        let parsed: Vec<CategoryTotal> =
            serde_json::from_str(r#"[{"_id": "Rent", "total": 1200}, {"_id": "Food", "total": 99.5}]"#).unwrap();
        assert_eq!(parsed[0].category, "Rent");
        assert_eq!(parsed[1].total, dec!(99.5));
    }

    #[test]
    fn test_group_by_month_skips_undated() {
        let records = vec![
            entry(RecordKind::Expense, dec!(10), "Food", Some("2024-02-03")),
            entry(RecordKind::Expense, dec!(5), "Food", Some("2024-01-31")),
            entry(RecordKind::Expense, dec!(7), "Fuel", Some("2024-02-28")),
            entry(RecordKind::Expense, dec!(99), "Fuel", None),
        ];

        assert_eq!(
            totals_by_month(&records),
            vec![("2024-01".to_string(), dec!(5)), ("2024-02".to_string(), dec!(17))]
        );
    }
}
