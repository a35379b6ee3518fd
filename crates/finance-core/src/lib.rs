//! Money Manager record logic
//!
//! Pure functions over income and expense records: normalization at the
//! ingestion boundary, period windows, filters, totals, and the 12-hour edit
//! window. Nothing here touches the network or fails on bad input.

pub mod aggregate;
pub mod alerts;
pub mod filters;
pub mod mutation;
pub mod period;
pub mod records;

pub use aggregate::{CategoryTotal, Totals, summarize, totals_by_category, totals_by_month};
pub use alerts::{Alert, alerts};
pub use filters::{DashboardFilter, FilterConfig, FilterError, RecordFilter, RecordPredicate, filter_records};
pub use mutation::{Editability, is_mutable};
pub use period::{Period, PeriodWindow};
pub use records::{NewRecord, Record, RecordDraft, RecordKind, RecordPatch, ValidationError};
