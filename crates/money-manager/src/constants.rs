//! Centralized constants for the money manager client
//!
//! User-specific settings (server, timeouts, display) are loaded from
//! config.toml; these are the defaults and the fixed API surface.

// =============================================================================
// API Endpoints
// =============================================================================

/// Records service used when config.toml does not name one
pub const DEFAULT_BASE_URL: &str = "https://money-managers-bd.onrender.com";

/// Login endpoint (returns a bearer token)
pub const LOGIN_PATH: &str = "/api/auth/login";

/// Prefix for the income and expense collections
pub const RECORDS_PREFIX: &str = "/api";

/// Server-side per-category expense totals
pub const CATEGORY_SUMMARY_PATH: &str = "/api/category/expense-summary";

/// Recurring expense collection
pub const RECURRING_PATH: &str = "/api/expenses/recurring";

/// Full account details for the signed-in user
pub const ACCOUNT_SUMMARY_PATH: &str = "/api/auth/account-summary";

/// Profile update (PUT); GET answers with the profile picture only
pub const PROFILE_PATH: &str = "/api/auth/profile";

// =============================================================================
// Network Policy
// =============================================================================

/// Per-request timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Attempts for idempotent requests, including the first
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// First backoff delay (ms); doubles per attempt
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Longest single wait between attempts (seconds)
pub const MAX_BACKOFF_SECS: u64 = 60;

// =============================================================================
// File Names
// =============================================================================

/// Default config file path
pub const CONFIG_FILENAME: &str = "config.toml";

/// Stored bearer token (in the data directory)
pub const SESSION_FILENAME: &str = "session.token";

/// Combined income/expense ledger CSV filename
pub const LEDGER_FILENAME: &str = "ledger.csv";

/// Monthly summary CSV filename
pub const SUMMARY_FILENAME: &str = "summary.csv";

// =============================================================================
// Display
// =============================================================================

/// Currency symbol prefixed to amounts
pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";
