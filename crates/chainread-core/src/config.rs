//! Pool configuration.

use std::time::Duration;

/// What the pool does when an endpoint answers "not found" or with no
/// result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Release the endpoint and return the error to the caller.
    #[default]
    Return,
    /// Release the endpoint and ask the next one. No cooldown is applied.
    Failover,
}

/// Configuration for the connection pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Bound on a single dial + handshake, at construction and on reconnect.
    pub dial_timeout: Duration,
    /// Maximum simultaneous dials during construction.
    pub dial_concurrency: usize,
    /// Delay between a fault and each reconnect attempt.
    pub cooldown: Duration,
    /// Timeout per routed call. Expiry counts as an endpoint fault.
    pub request_timeout: Duration,
    pub missing_policy: MissingPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(5),
            dial_concurrency: 5,
            cooldown: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
            missing_policy: MissingPolicy::Return,
        }
    }
}
