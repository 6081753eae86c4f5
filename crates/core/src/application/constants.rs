// Scheduler constants (no magic values)

/// Delay between scans for due jobs (500ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// How long EXECUTED / CANCELED records stay queryable (1 hour)
pub const DEFAULT_TERMINAL_RETENTION_MS: i64 = 60 * 60 * 1000;

/// Total callback attempts before a job goes to ERROR
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Default retry base delay (1000ms = 1s)
pub const DEFAULT_RETRY_BASE_DELAY_MS: i64 = 1000;

/// Multiplier applied per attempt
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

/// Outbound callback timeout (10s)
pub const DEFAULT_CALLBACK_TIMEOUT_MS: u64 = 10_000;

/// Callbacks in flight at once
pub const DEFAULT_MAX_CONCURRENT_CALLBACKS: usize = 16;
