//! Coarse reporting periods (weekly / monthly / yearly)

use chrono::{Days, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::filters::RecordPredicate;
use crate::records::Record;

/// Relative window ending now
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl Period {
    /// Parse a period token, falling back to monthly for anything unknown
    pub fn parse_or_default(token: &str) -> Self {
        token.parse().unwrap_or_else(|_| {
            tracing::debug!(token, "unknown period, using monthly");
            Period::default()
        })
    }

    /// First day inside the window: midnight of `now`, minus the period
    pub fn cutoff(self, now: NaiveDateTime) -> NaiveDate {
        let today = now.date();
        let start = match self {
            Period::Weekly => today.checked_sub_days(Days::new(7)),
            Period::Monthly => today.checked_sub_months(Months::new(1)),
            Period::Yearly => today.checked_sub_months(Months::new(12)),
        };
        start.unwrap_or(NaiveDate::MIN)
    }

    pub fn window(self, now: NaiveDateTime) -> PeriodWindow {
        PeriodWindow {
            period: self,
            cutoff: self.cutoff(now),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            "yearly" => Ok(Period::Yearly),
            other => Err(format!("unknown period: {}", other)),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Weekly => write!(f, "weekly"),
            Period::Monthly => write!(f, "monthly"),
            Period::Yearly => write!(f, "yearly"),
        }
    }
}

/// A resolved period: every record dated on or after `cutoff`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub period: Period,
    pub cutoff: NaiveDate,
}

impl RecordPredicate for PeriodWindow {
    /// Undated records never fall inside a window
    fn matches(&self, record: &Record) -> bool {
        record.date.is_some_and(|d| d >= self.cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::RecordKind;
    use rust_decimal::Decimal;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 30, 0).unwrap()
    }

    fn dated(date: Option<NaiveDate>) -> Record {
        Record {
            id: "r".to_string(),
            kind: RecordKind::Expense,
            amount: Decimal::ONE,
            category: "Food".to_string(),
            division: None,
            description: String::new(),
            date,
            created_at: None,
        }
    }

    #[test]
    fn test_cutoffs_truncate_to_midnight() {
        let now = at(2024, 5, 20, 15);
        assert_eq!(Period::Weekly.cutoff(now), NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());
        assert_eq!(Period::Monthly.cutoff(now), NaiveDate::from_ymd_opt(2024, 4, 20).unwrap());
        assert_eq!(Period::Yearly.cutoff(now), NaiveDate::from_ymd_opt(2023, 5, 20).unwrap());
    }

    #[test]
    fn test_cutoff_never_after_now() {
        for day in 1..=28 {
            for period in [Period::Weekly, Period::Monthly, Period::Yearly] {
                let now = at(2024, 3, day, 0);
                let cutoff = period.cutoff(now);
                assert!(cutoff <= now.date());

                let days = (now.date() - cutoff).num_days();
                match period {
                    Period::Weekly => assert_eq!(days, 7),
                    Period::Monthly => assert!((28..=31).contains(&days)),
                    Period::Yearly => assert!((365..=366).contains(&days)),
                }
            }
        }
    }

    #[test]
    fn test_monthly_clamps_to_month_end() {
        let now = at(2024, 3, 31, 9);
        assert_eq!(Period::Monthly.cutoff(now), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_unknown_token_falls_back_to_monthly() {
        assert_eq!(Period::parse_or_default("quarterly"), Period::Monthly);
        assert_eq!(Period::parse_or_default(""), Period::Monthly);
        assert_eq!(Period::parse_or_default("Weekly"), Period::Weekly);
    }

    #[test]
    fn test_window_includes_cutoff_day_and_excludes_undated() {
        let window = Period::Weekly.window(at(2024, 5, 20, 23));

        assert!(window.matches(&dated(NaiveDate::from_ymd_opt(2024, 5, 13))));
        assert!(window.matches(&dated(NaiveDate::from_ymd_opt(2024, 5, 20))));
        assert!(!window.matches(&dated(NaiveDate::from_ymd_opt(2024, 5, 12))));
        assert!(!window.matches(&dated(None)));
    }
}
