//! Edit/delete eligibility
//!
//! A record can be changed for 12 hours after the service created it. After
//! that it is locked for good. The service enforces the same rule and has
//! the final word; this check only decides what to offer.

use chrono::{DateTime, TimeDelta, Utc};

use crate::records::Record;

/// Hours after creation during which a record may be edited or deleted
pub const MUTATION_WINDOW_HOURS: i64 = 12;

pub fn mutation_window() -> TimeDelta {
    TimeDelta::hours(MUTATION_WINDOW_HOURS)
}

/// Whether a record created at `created_at` may still be changed at `now`
pub fn is_mutable(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - created_at <= mutation_window()
}

/// Last instant at which the record is still mutable
pub fn locks_at(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + mutation_window()
}

/// Editability of one record; only ever moves Mutable -> Locked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Editability {
    Mutable,
    Locked,
}

impl Editability {
    pub fn at(created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match created_at {
            Some(created) if is_mutable(created, now) => Editability::Mutable,
            // No creation time means we cannot prove it is still open
            _ => Editability::Locked,
        }
    }

    pub fn is_mutable(self) -> bool {
        self == Editability::Mutable
    }
}

impl std::fmt::Display for Editability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Editability::Mutable => write!(f, "editable"),
            Editability::Locked => write!(f, "locked"),
        }
    }
}

impl Record {
    pub fn editability(&self, now: DateTime<Utc>) -> Editability {
        Editability::at(self.created_at, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_seven_hours_is_mutable_thirteen_is_locked() {
        let created = ts("2024-01-10T08:00:00Z");
        assert!(is_mutable(created, ts("2024-01-10T15:00:00Z")));
        assert!(!is_mutable(created, ts("2024-01-10T21:00:00Z")));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let created = ts("2024-01-10T08:00:00Z");
        assert_eq!(locks_at(created), ts("2024-01-10T20:00:00Z"));
        assert!(is_mutable(created, ts("2024-01-10T20:00:00Z")));
        assert!(!is_mutable(created, ts("2024-01-10T20:00:01Z")));
    }

    #[test]
    fn test_monotonic_in_time() {
        let created = ts("2024-01-10T08:00:00Z");
        let mut was_locked = false;
        for minutes in (0..=24 * 60).step_by(17) {
            let now = created + TimeDelta::minutes(minutes);
            let mutable = is_mutable(created, now);
            if was_locked {
                assert!(!mutable, "locked record reopened at +{}m", minutes);
            }
            was_locked |= !mutable;
        }
        assert!(was_locked);
    }

    #[test]
    fn test_missing_created_at_is_locked() {
        let now = ts("2024-01-10T08:00:00Z");
        assert_eq!(Editability::at(None, now), Editability::Locked);
        assert_eq!(Editability::at(Some(now), now), Editability::Mutable);
    }
}
