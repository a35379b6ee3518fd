//! Report generation (CSV exports and console tables)

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::Writer;
use finance_core::{Alert, CategoryTotal, Record, Totals, totals_by_month};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::constants;
use crate::profile::Profile;
use crate::recurring::RecurringExpense;

/// Amount with currency symbol and two decimals
pub fn format_amount(symbol: &str, amount: Decimal) -> String {
    format!("{}{:.2}", symbol, amount)
}

fn format_date(record: &Record) -> String {
    record
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Shorten long descriptions for table cells
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

// =============================================================================
// CSV exports
// =============================================================================

/// Write ledger.csv and summary.csv into `output_dir`
pub fn export_all(output_dir: &Path, income: &[Record], expenses: &[Record]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let ledger = export_ledger(&output_dir.join(constants::LEDGER_FILENAME), income, expenses)?;
    let summary = export_summary(&output_dir.join(constants::SUMMARY_FILENAME), income, expenses)?;
    Ok(vec![ledger, summary])
}

/// One row per record, income then expenses, each by date
pub fn export_ledger(path: &Path, income: &[Record], expenses: &[Record]) -> Result<PathBuf> {
    let mut wtr = Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;

    wtr.write_record(["Type", "Date", "Category", "Division", "Description", "Amount"])?;

    for records in [income, expenses] {
        let mut sorted: Vec<&Record> = records.iter().collect();
        sorted.sort_by_key(|r| r.date);

        for record in sorted {
            wtr.write_record([
                record.kind.label(),
                &format_date(record),
                &record.category,
                record.division.as_deref().unwrap_or(""),
                &record.description,
                &format!("{:.2}", record.amount),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(path.to_path_buf())
}

#[derive(Debug, Default, Clone, Copy)]
struct MonthlyData {
    income: Decimal,
    expenses: Decimal,
}

impl MonthlyData {
    fn net(&self) -> Decimal {
        self.income.saturating_sub(self.expenses)
    }

    fn add(&mut self, other: &MonthlyData) {
        self.income = self.income.saturating_add(other.income);
        self.expenses = self.expenses.saturating_add(other.expenses);
    }
}

/// Monthly income, expenses, net and year-to-date net, with a TOTAL row per year
pub fn export_summary(path: &Path, income: &[Record], expenses: &[Record]) -> Result<PathBuf> {
    let mut wtr = Writer::from_path(path).with_context(|| format!("Failed to create {}", path.display()))?;

    let mut monthly: BTreeMap<String, MonthlyData> = BTreeMap::new();
    for (month, total) in totals_by_month(income) {
        monthly.entry(month).or_default().income = total;
    }
    for (month, total) in totals_by_month(expenses) {
        monthly.entry(month).or_default().expenses = total;
    }

    wtr.write_record(["Month", "Income", "Expenses", "Net", "YTD_Net"])?;

    let mut annual: BTreeMap<String, MonthlyData> = BTreeMap::new();
    let mut ytd = Decimal::ZERO;
    let mut current_year: Option<&str> = None;

    for (month, data) in &monthly {
        let year = &month[..4];
        if current_year != Some(year) {
            current_year = Some(year);
            ytd = Decimal::ZERO;
        }
        ytd = ytd.saturating_add(data.net());
        annual.entry(year.to_string()).or_default().add(data);

        wtr.write_record([
            month,
            &format!("{:.2}", data.income),
            &format!("{:.2}", data.expenses),
            &format!("{:.2}", data.net()),
            &format!("{:.2}", ytd),
        ])?;
    }

    for (year, data) in &annual {
        wtr.write_record([
            &format!("{} TOTAL", year),
            &format!("{:.2}", data.income),
            &format!("{:.2}", data.expenses),
            &format!("{:.2}", data.net()),
            "",
        ])?;
    }

    wtr.flush()?;
    Ok(path.to_path_buf())
}

// =============================================================================
// Console output
// =============================================================================

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Division")]
    division: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Total")]
    total: String,
}

#[derive(Tabled)]
struct RecurringRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Next due")]
    next_due: String,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Record table; the status column shows whether the edit window is open
pub fn records_table(records: &[Record], now: DateTime<Utc>, symbol: &str) -> String {
    let rows: Vec<RecordRow> = records
        .iter()
        .map(|r| RecordRow {
            id: r.id.clone(),
            date: format_date(r),
            category: r.category.clone(),
            division: r.division.clone().unwrap_or_default(),
            description: truncate(&r.description, 40),
            amount: format_amount(symbol, r.amount),
            status: r.editability(now).to_string(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn category_table(totals: &[CategoryTotal], symbol: &str) -> String {
    let rows: Vec<CategoryRow> = totals
        .iter()
        .map(|t| CategoryRow {
            category: if t.category.is_empty() {
                "(none)".to_string()
            } else {
                t.category.clone()
            },
            total: format_amount(symbol, t.total),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn recurring_table(expenses: &[RecurringExpense], symbol: &str) -> String {
    let rows: Vec<RecurringRow> = expenses
        .iter()
        .map(|e| RecurringRow {
            id: e.id.clone(),
            name: e.name.clone(),
            category: e.category.clone(),
            amount: format_amount(symbol, e.amount),
            next_due: e
                .next_due
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn profile_table(profile: &Profile) -> String {
    let or_dash = |value: &str| if value.is_empty() { "-".to_string() } else { value.to_string() };
    let rows = vec![
        ProfileRow {
            field: "Name",
            value: or_dash(&profile.name),
        },
        ProfileRow {
            field: "Email",
            value: or_dash(&profile.email),
        },
        ProfileRow {
            field: "Phone",
            value: or_dash(&profile.phone),
        },
        ProfileRow {
            field: "Date of birth",
            value: or_dash(&profile.dob_display()),
        },
        ProfileRow {
            field: "Address",
            value: or_dash(&profile.address),
        },
        ProfileRow {
            field: "Office",
            value: or_dash(&profile.office_name),
        },
    ];

    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn print_profile(profile: &Profile) {
    println!("\nAccount summary");
    println!("{}", profile_table(profile));
    if let Some(pic) = &profile.profile_pic {
        println!("Profile picture: {}", pic);
    }
}

pub fn print_records(title: &str, records: &[Record], now: DateTime<Utc>, symbol: &str) {
    println!("\n{} ({})", title, records.len());
    if records.is_empty() {
        println!("  No records match.");
        return;
    }
    println!("{}", records_table(records, now, symbol));
}

pub fn print_category_totals(title: &str, totals: &[CategoryTotal], symbol: &str) {
    println!("\n{}", title);
    if totals.is_empty() {
        println!("  No expenses to summarize.");
        return;
    }
    println!("{}", category_table(totals, symbol));
}

pub fn print_recurring(expenses: &[RecurringExpense], symbol: &str) {
    println!("\nRecurring expenses ({})", expenses.len());
    if expenses.is_empty() {
        println!("  None scheduled.");
        return;
    }
    println!("{}", recurring_table(expenses, symbol));
}

/// Totals block shown at the top of the dashboard
pub fn print_dashboard(heading: &str, totals: &Totals, alerts: &[Alert], symbol: &str) {
    println!("\n============================================================");
    println!("  {}", heading);
    println!("============================================================\n");

    println!(
        "  Income:   {:>14}   ({} records)",
        format_amount(symbol, totals.income_total),
        totals.income_count
    );
    println!(
        "  Expenses: {:>14}   ({} records)",
        format_amount(symbol, totals.expense_total),
        totals.expense_count
    );
    println!("  ----------------------------------------");
    println!("  Balance:  {:>14}", format_amount(symbol, totals.balance));

    for alert in alerts {
        println!("\n  {}", alert);
    }
}
