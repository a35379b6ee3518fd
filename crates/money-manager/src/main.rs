//! Money Manager command-line client
//!
//! Tracks personal income and expenses stored on the money manager service:
//! dashboard totals for a period, filtered listings, edits within the
//! 12-hour window, recurring expenses, account details and CSV exports.

mod api;
mod book;
mod config;
mod constants;
mod error;
mod profile;
mod recurring;
mod reports;
mod session;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use finance_core::records::{canonical_division, parse_amount};
use finance_core::{
    DashboardFilter, FilterConfig, Period, RecordDraft, RecordFilter, RecordKind, RecordPatch, RecordPredicate,
    ValidationError, alerts, filter_records, summarize, totals_by_category,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use api::ApiClient;
use book::RecordBook;
use config::{Config, FileConfig};
use profile::ProfileDraft;
use recurring::RecurringDraft;
use session::{Session, SessionState, mask_token};

#[derive(Parser, Debug)]
#[command(name = "money-manager")]
#[command(about = "Track personal income and expenses")]
struct Args {
    /// Path to config file
    #[arg(short, long, default_value = constants::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Data directory (stored session token)
    #[arg(short, long, default_value = "./data", global = true)]
    data_dir: PathBuf,

    /// Output directory for CSV exports
    #[arg(short, long, default_value = "./output", global = true)]
    output_dir: PathBuf,

    /// Records service URL (overrides config.toml)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password, or store an existing token
    Login {
        #[arg(long, requires = "password", conflicts_with = "token")]
        email: Option<String>,

        #[arg(long, requires = "email")]
        password: Option<String>,

        /// Bearer token issued elsewhere
        #[arg(long)]
        token: Option<String>,
    },

    /// Forget the stored token
    Logout,

    /// Totals, category breakdown and alerts for a period
    Dashboard {
        /// weekly, monthly or yearly
        #[arg(long)]
        period: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Manage income
    Income {
        #[command(subcommand)]
        action: RecordCommand,
    },

    /// Manage expenses
    Expense {
        #[command(subcommand)]
        action: RecordCommand,
    },

    /// Expense totals per category
    Categories {
        /// Use the service's own summary instead of computing locally
        #[arg(long)]
        server: bool,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Write ledger.csv and summary.csv
    Export {
        /// Limit to weekly, monthly or yearly (default: everything)
        #[arg(long)]
        period: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Manage recurring expenses
    Recurring {
        #[command(subcommand)]
        action: RecurringCommand,
    },

    /// Show or change account details
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RecordCommand {
    /// List records
    List {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Add a record
    Add {
        #[arg(long)]
        amount: String,

        #[arg(long)]
        category: String,

        /// Office or Personal (required for income)
        #[arg(long, default_value = "")]
        division: String,

        #[arg(long)]
        description: String,

        /// Date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Edit a record created in the last 12 hours
    Edit {
        id: String,

        #[arg(long)]
        amount: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        division: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a record created in the last 12 hours
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum RecurringCommand {
    /// List recurring expenses
    List,

    /// Schedule a recurring expense
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        amount: String,

        #[arg(long)]
        category: String,

        /// Next due date (YYYY-MM-DD)
        #[arg(long)]
        next_due: String,
    },

    /// Remove a recurring expense
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Show the account summary
    Show,

    /// Print the profile picture URL
    Picture,

    /// Change personal details or the password
    Update {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        /// Date of birth (dd/mm/yyyy, empty to clear)
        #[arg(long)]
        dob: Option<String>,

        #[arg(long)]
        address: Option<String>,

        #[arg(long)]
        office_name: Option<String>,

        #[arg(long)]
        new_password: Option<String>,
    },
}

/// Advanced filter flags shared by listing commands
#[derive(ClapArgs, Debug, Clone)]
struct FilterArgs {
    /// Category, or "All"
    #[arg(long, default_value = "All")]
    category: String,

    /// Division, or "all"
    #[arg(long, default_value = "all")]
    division: String,

    /// Earliest date (YYYY-MM-DD)
    #[arg(long, default_value = "")]
    from: String,

    /// Latest date (YYYY-MM-DD)
    #[arg(long, default_value = "")]
    to: String,

    #[arg(long, default_value = "")]
    min_amount: String,

    #[arg(long, default_value = "")]
    max_amount: String,

    /// Case-insensitive text in the description
    #[arg(long, default_value = "")]
    search: String,
}

impl FilterArgs {
    fn compile(&self) -> Result<RecordFilter> {
        let config = FilterConfig {
            category: self.category.clone(),
            division: self.division.clone(),
            from_date: self.from.clone(),
            to_date: self.to.clone(),
            min_amount: self.min_amount.clone(),
            max_amount: self.max_amount.clone(),
            description: self.search.clone(),
        };
        RecordFilter::from_config(&config).context("Invalid filter")
    }
}

/// Logging goes to stderr so tables on stdout stay clean
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Everything a command needs: resolved config and an open session
struct App {
    config: Config,
    session: Session,
    output_dir: PathBuf,
}

impl App {
    fn client(&self) -> Result<ApiClient> {
        Ok(ApiClient::new(&self.config, self.session.clone())?)
    }

    fn period(&self, requested: Option<&str>) -> Period {
        Period::parse_or_default(requested.unwrap_or(&self.config.default_period))
    }

    fn symbol(&self) -> &str {
        &self.config.currency_symbol
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let file_config = FileConfig::load_or_default(&args.config)?;
    let config = Config::from_file(&file_config, args.base_url)?;
    tracing::debug!(base_url = %config.base_url, timeout = ?config.timeout, "configuration loaded");

    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("Failed to create data directory: {}", args.data_dir.display()))?;
    let session_path = args.data_dir.join(constants::SESSION_FILENAME);
    let session = Session::open(&session_path, config.token.clone())
        .with_context(|| format!("Failed to read session from {}", session_path.display()))?;

    let ctx = App {
        config,
        session,
        output_dir: args.output_dir,
    };

    match args.command {
        Command::Login { email, password, token } => handle_login(&ctx, email, password, token).await,
        Command::Logout => {
            ctx.session.sign_out();
            println!("Signed out.");
            Ok(())
        }
        Command::Dashboard { period, filters } => handle_dashboard(&ctx, period.as_deref(), &filters).await,
        Command::Income { action } => handle_record_command(&ctx, RecordKind::Income, action).await,
        Command::Expense { action } => handle_record_command(&ctx, RecordKind::Expense, action).await,
        Command::Categories { server, filters } => handle_categories(&ctx, server, &filters).await,
        Command::Export { period, filters } => handle_export(&ctx, period.as_deref(), &filters).await,
        Command::Recurring { action } => handle_recurring_command(&ctx, action).await,
        Command::Profile { action } => handle_profile_command(&ctx, action).await,
    }
}

async fn handle_login(
    ctx: &App,
    email: Option<String>,
    password: Option<String>,
    token: Option<String>,
) -> Result<()> {
    match (token, email, password) {
        (Some(token), _, _) => {
            ctx.session.authenticate(token.trim()).context("Failed to store token")?;
            println!("Token stored ({}).", mask_token(token.trim()));
        }
        (None, Some(email), Some(password)) => {
            let client = ctx.client()?;
            client.login(&email, &password).await.context("Login failed")?;
            println!("Signed in as {}.", email);
        }
        _ => anyhow::bail!("Provide --email and --password, or --token"),
    }
    Ok(())
}

fn ensure_signed_in(session: &Session) -> Result<()> {
    match session.state() {
        SessionState::Authenticated { .. } => Ok(()),
        SessionState::Expired => anyhow::bail!("Session expired. Run `money-manager login` again."),
        SessionState::Anonymous => anyhow::bail!("Not signed in. Run `money-manager login` first."),
    }
}

async fn handle_dashboard(ctx: &App, period: Option<&str>, filters: &FilterArgs) -> Result<()> {
    ensure_signed_in(&ctx.session)?;
    let period = ctx.period(period);
    let dashboard = DashboardFilter::new(period, Local::now().naive_local(), filters.compile()?);

    let client = ctx.client()?;
    let mut book = RecordBook::new();
    book.refresh_all(&client).await.context("Failed to load records")?;

    let income = filter_records(book.records(RecordKind::Income), &dashboard);
    let expenses = filter_records(book.records(RecordKind::Expense), &dashboard);
    let totals = summarize(&income, &expenses);

    let heading = format!(
        "{} DASHBOARD (since {})",
        period.to_string().to_uppercase(),
        dashboard.window.cutoff.format("%Y-%m-%d")
    );
    reports::print_dashboard(&heading, &totals, &alerts(&totals), ctx.symbol());
    reports::print_category_totals("Expenses by category", &totals_by_category(&expenses), ctx.symbol());
    Ok(())
}

fn optional_amount(raw: Option<&str>) -> Result<Option<rust_decimal::Decimal>, ValidationError> {
    raw.map(|s| parse_amount(s).ok_or_else(|| ValidationError::InvalidAmount(s.trim().to_string())))
        .transpose()
}

async fn handle_record_command(ctx: &App, kind: RecordKind, action: RecordCommand) -> Result<()> {
    ensure_signed_in(&ctx.session)?;
    let client = ctx.client()?;
    let mut book = RecordBook::new();

    match action {
        RecordCommand::List { filters } => {
            let filter = filters.compile()?;
            book.refresh(&client, kind)
                .await
                .with_context(|| format!("Failed to load {}", kind.collection()))?;

            let records = filter_records(book.records(kind), &filter);
            reports::print_records(kind.label(), &records, Utc::now(), ctx.symbol());
            println!(
                "\nTotal: {}",
                reports::format_amount(ctx.symbol(), finance_core::aggregate::total(&records))
            );
            Ok(())
        }

        RecordCommand::Add {
            amount,
            category,
            division,
            description,
            date,
        } => {
            let draft = RecordDraft {
                amount,
                category,
                division,
                description,
                date: date.unwrap_or_else(|| Local::now().date_naive().format("%Y-%m-%d").to_string()),
            };
            let new = draft.validate(kind)?;

            let created = book.create(&client, &new).await.context("Failed to add record")?;
            println!(
                "Added {} {}: {} {}",
                kind.label().to_lowercase(),
                created.id,
                created.category,
                reports::format_amount(ctx.symbol(), created.amount)
            );
            Ok(())
        }

        RecordCommand::Edit {
            id,
            amount,
            category,
            division,
            description,
        } => {
            let patch = RecordPatch {
                amount: optional_amount(amount.as_deref())?,
                category,
                division: division.map(|d| canonical_division(&d).map_or(d, str::to_string)),
                description,
            };
            patch.validate()?;

            book.refresh(&client, kind).await.context("Failed to load records")?;
            let updated = book
                .update(&client, kind, &id, &patch, Utc::now())
                .await
                .with_context(|| format!("Failed to edit {}", id))?;
            println!(
                "Updated {}: {} {}",
                updated.id,
                updated.category,
                reports::format_amount(ctx.symbol(), updated.amount)
            );
            Ok(())
        }

        RecordCommand::Delete { id } => {
            book.refresh(&client, kind).await.context("Failed to load records")?;
            let removed = book
                .delete(&client, kind, &id, Utc::now())
                .await
                .with_context(|| format!("Failed to delete {}", id))?;
            println!(
                "Deleted {}: {} {}",
                removed.id,
                removed.category,
                reports::format_amount(ctx.symbol(), removed.amount)
            );
            Ok(())
        }
    }
}

async fn handle_categories(ctx: &App, server: bool, filters: &FilterArgs) -> Result<()> {
    ensure_signed_in(&ctx.session)?;
    let client = ctx.client()?;

    if server {
        let totals = client.expense_summary().await.context("Failed to load category summary")?;
        reports::print_category_totals("Expenses by category (service)", &totals, ctx.symbol());
        return Ok(());
    }

    let filter = filters.compile()?;
    let mut book = RecordBook::new();
    book.refresh(&client, RecordKind::Expense)
        .await
        .context("Failed to load expenses")?;
    let expenses = filter_records(book.records(RecordKind::Expense), &filter);
    reports::print_category_totals("Expenses by category", &totals_by_category(&expenses), ctx.symbol());
    Ok(())
}

async fn handle_export(ctx: &App, period: Option<&str>, filters: &FilterArgs) -> Result<()> {
    ensure_signed_in(&ctx.session)?;
    let advanced = filters.compile()?;
    let predicate: Box<dyn RecordPredicate> = match period {
        Some(p) => Box::new(DashboardFilter::new(
            Period::parse_or_default(p),
            Local::now().naive_local(),
            advanced,
        )),
        None => Box::new(advanced),
    };

    let client = ctx.client()?;
    let mut book = RecordBook::new();
    book.refresh_all(&client).await.context("Failed to load records")?;

    let income = filter_records(book.records(RecordKind::Income), predicate.as_ref());
    let expenses = filter_records(book.records(RecordKind::Expense), predicate.as_ref());

    for path in reports::export_all(&ctx.output_dir, &income, &expenses)? {
        println!("  Generated: {}", path.display());
    }
    println!("\nExported {} income and {} expense records.", income.len(), expenses.len());
    Ok(())
}

async fn handle_recurring_command(ctx: &App, action: RecurringCommand) -> Result<()> {
    ensure_signed_in(&ctx.session)?;
    let client = ctx.client()?;

    match action {
        RecurringCommand::List => {
            let expenses = client.list_recurring().await.context("Failed to load recurring expenses")?;
            reports::print_recurring(&expenses, ctx.symbol());
        }
        RecurringCommand::Add {
            name,
            amount,
            category,
            next_due,
        } => {
            let draft = RecurringDraft {
                name,
                amount,
                category,
                next_due,
            };
            let new = draft.validate()?;
            client
                .create_recurring(&new)
                .await
                .context("Failed to add recurring expense")?;
            println!(
                "Scheduled {} ({}), next due {}",
                new.expense_name,
                reports::format_amount(ctx.symbol(), new.amount),
                &new.next_due[..10]
            );
        }
        RecurringCommand::Delete { id } => {
            client
                .delete_recurring(&id)
                .await
                .with_context(|| format!("Failed to delete recurring expense {}", id))?;
            println!("Deleted recurring expense {}", id);
        }
    }
    Ok(())
}

async fn handle_profile_command(ctx: &App, action: ProfileCommand) -> Result<()> {
    ensure_signed_in(&ctx.session)?;
    let client = ctx.client()?;

    match action {
        ProfileCommand::Show => {
            let profile = client.account_summary().await.context("Failed to load account summary")?;
            reports::print_profile(&profile);
        }
        ProfileCommand::Picture => match client.profile_picture().await.context("Failed to load profile")? {
            Some(url) => println!("{}", url),
            None => println!("No profile picture set."),
        },
        ProfileCommand::Update {
            name,
            phone,
            dob,
            address,
            office_name,
            new_password,
        } => {
            let draft = ProfileDraft {
                name,
                phone,
                dob,
                address,
                office_name,
                new_password,
            };
            if draft.is_empty() {
                anyhow::bail!("Nothing to update. Pass at least one field, e.g. --phone");
            }

            let current = client.account_summary().await.context("Failed to load account summary")?;
            let update = draft.apply(&current)?;
            client.update_profile(&update).await.context("Failed to update profile")?;
            println!("Profile updated.");
            if update.new_password.is_some() {
                println!("Password changed.");
            }
        }
    }
    Ok(())
}
