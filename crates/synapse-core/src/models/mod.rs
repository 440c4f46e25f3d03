//! Shared identity and time helpers.

mod identity;

pub use identity::AgentIdentity;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
