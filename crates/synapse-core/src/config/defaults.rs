// Single source of truth for all default values.

// --- Storage ---
pub const DEFAULT_DB_FILENAME: &str = "synapse.db";
pub const DEFAULT_READ_POOL_SIZE: usize = 4;

// --- Sync ---
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_PUSH_BATCH_SIZE: usize = 100;

// --- Hub ---
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_PULL_BATCH: usize = 500;
pub const DEFAULT_TOKEN_ISSUER: &str = "synapse-hub";
pub const DEFAULT_CLOCK_SKEW_LEEWAY_MS: i64 = 0;

// --- Causal ---
pub const DEFAULT_CONFIDENCE_SATURATION: f64 = 30.0;
pub const DEFAULT_MIN_RELIABLE_SAMPLES: u64 = 5;
pub const DEFAULT_EXPERIMENT_IDLE_WINDOW_SECS: u64 = 86_400; // 1 day
pub const DEFAULT_PRUNE_MIN_CONFIDENCE: f64 = 0.1;
pub const DEFAULT_PRUNE_MIN_SAMPLE_SIZE: u64 = 3;
pub const DEFAULT_PRUNE_RETENTION_SECS: u64 = 30 * 86_400; // 30 days
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 5;

// --- Recall ---
pub const DEFAULT_RECALL_ALPHA: f64 = 0.7;
pub const DEFAULT_RECALL_BETA: f64 = 0.2;
pub const DEFAULT_RECALL_GAMMA: f64 = 0.1;
pub const DEFAULT_RECALL_K: usize = 10;
