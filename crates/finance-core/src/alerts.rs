//! Notifications derived from dashboard totals

use crate::aggregate::Totals;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    /// Expenses exceed income for the selected view
    Overspending,
}

impl std::fmt::Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alert::Overspending => write!(f, "Warning: your expenses are higher than your income!"),
        }
    }
}

pub fn alerts(totals: &Totals) -> Vec<Alert> {
    let mut alerts = Vec::new();
    if totals.expense_total > totals.income_total {
        alerts.push(Alert::Overspending);
    }
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::summarize;
    use crate::records::{Record, RecordKind};
    use rust_decimal::Decimal;

    fn amount(kind: RecordKind, amount: i64) -> Record {
        Record {
            id: amount.to_string(),
            kind,
            amount: Decimal::from(amount),
            category: "Other".to_string(),
            division: None,
            description: String::new(),
            date: None,
            created_at: None,
        }
    }

    #[test]
    fn test_overspending() {
        let totals = summarize(&[amount(RecordKind::Income, 100)], &[amount(RecordKind::Expense, 150)]);
        assert_eq!(alerts(&totals), vec![Alert::Overspending]);
    }

    #[test]
    fn test_no_alert_when_balanced_or_empty() {
        let totals = summarize(&[amount(RecordKind::Income, 100)], &[amount(RecordKind::Expense, 100)]);
        assert!(alerts(&totals).is_empty());
        assert!(alerts(&Totals::default()).is_empty());
    }
}
