//! Shared constants for end-to-end tests
//!
//! The fleet is evaluated against a frozen clock so every age below is
//! relative to `NOW`. With notify ages 5d/20d/25d, decommission at 30d and
//! destroy at 44d, each resource below lands in a different spot.

/// The instant every test runs at.
pub const NOW: &str = "2024/03/31 12:00:00";

/// Secret renewal tokens are derived from.
pub const SECRET: &str = "54321";

// ============================================================================
// Fleet resources
// ============================================================================

/// Renewed 2 days ago, too young for any phase.
pub const FRESH_ID: &str = "i-fresh";
pub const FRESH_RENEWED_AT: &str = "2024/03/29 12:00:00";

/// Renewed 11 days ago and never notified.
pub const REMINDED_ID: &str = "i-reminded";
pub const REMINDED_RENEWED_AT: &str = "2024/03/20 12:00:00";

/// Renewed 11 days ago, already notified after crossing 5d.
pub const QUIET_ID: &str = "i-quiet";
pub const QUIET_RENEWED_AT: &str = "2024/03/20 12:00:00";
pub const QUIET_NOTIFIED_AT: &str = "2024/03/26 08:00:00";

/// Renewed 35 days ago, still created.
pub const EXPIRED_ID: &str = "i-expired";
pub const EXPIRED_RENEWED_AT: &str = "2024/02/25 12:00:00";
pub const EXPIRED_NOTIFIED_AT: &str = "2024/03/22 12:00:00";

/// Decommissioned and renewed 50 days ago.
pub const DOOMED_ID: &str = "i-doomed";
pub const DOOMED_RENEWED_AT: &str = "2024/02/10 12:00:00";

/// Decommissioned but renewed only 35 days ago.
pub const LINGERING_ID: &str = "i-lingering";
pub const LINGERING_RENEWED_AT: &str = "2024/02/25 12:00:00";

/// Owner of every fleet resource.
pub const OWNER: &str = "al1";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for the server to become ready
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between server readiness checks
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Default timeout for HTTP requests in tests
pub const REQUEST_TIMEOUT_SECS: u64 = 5;
