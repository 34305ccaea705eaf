use failsafe::backoff::{self, Exponential};
use failsafe::failure_policy::{self, ConsecutiveFailures};
use failsafe::{Config, StateMachine};
use std::time::Duration;

/// Circuit breaker guarding one CEP provider.
pub type ProviderCircuitBreaker = StateMachine<ConsecutiveFailures<Exponential>, ()>;

/// Creates a circuit breaker for a CEP provider so an unavailable free API is skipped
/// instead of costing every request a full timeout.
///
/// # Configuration
///
/// - **Failure threshold**: `failure_threshold` consecutive outages trigger OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// # States
///
/// - **CLOSED**: Normal operation, lookups pass through.
/// - **OPEN**: Provider considered down, lookups skip straight to the next provider.
/// - **HALF_OPEN**: Testing if the provider recovered.
pub fn create_provider_circuit_breaker(failure_threshold: u32) -> ProviderCircuitBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(failure_threshold, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}
