//! Circuit breaker guarding the Remote sample provider adapter. Ported
//! from the health-check breaker used elsewhere in this codebase's
//! ancestry, keyed here by provider name instead of instance id since
//! there is exactly one upstream to protect per adapter instance.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// State of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
 Closed,
 Open,
 HalfOpen,
}

impl std::fmt::Display for CircuitState {
 fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
 match self {
 CircuitState::Closed => write!(f, "closed"),
 CircuitState::Open => write!(f, "open"),
 CircuitState::HalfOpen => write!(f, "half-open"),
 }
 }
}

/// Breaker tuning. `failure_threshold` within `reset_timeout`'s rolling
/// window opens the circuit for `reset_timeout`; `success_threshold`
/// consecutive half-open successes closes it again.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
 pub failure_threshold: u32,
 pub success_threshold: u32,
 pub reset_timeout: Duration,
 pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
 fn default() -> Self {
 Self {
 failure_threshold: 5,
 success_threshold: 2,
 reset_timeout: Duration::from_secs(30),
 half_open_max_requests: 1,
 }
 }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
 pub name: String,
 pub state: CircuitState,
 pub failure_count: u32,
 pub success_count: u32,
 pub last_transition: DateTime<Utc>,
}

/// Circuit breaker for a single Remote sample provider.
pub struct CircuitBreaker {
 name: String,
 state: RwLock<CircuitState>,
 config: CircuitBreakerConfig,
 failure_count: AtomicU32,
 success_count: AtomicU32,
 half_open_requests: AtomicU32,
 opened_at_millis: AtomicU64,
 last_transition: RwLock<DateTime<Utc>>,
}

impl CircuitBreaker {
 pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
 Self {
 name: name.into(),
 state: RwLock::new(CircuitState::Closed),
 config,
 failure_count: AtomicU32::new(0),
 success_count: AtomicU32::new(0),
 half_open_requests: AtomicU32::new(0),
 opened_at_millis: AtomicU64::new(0),
 last_transition: RwLock::new(Utc::now()),
 }
 }

 pub fn state(&self) -> CircuitState {
 self.check_timeout();
 *self.state.read().unwrap()
 }

 /// Whether a caller may attempt a request right now. Half-open
 /// requests are rate-limited to `half_open_max_requests`.
 pub fn allow_request(&self) -> bool {
 self.check_timeout();
 let state = self.state.read().unwrap();
 match *state {
 CircuitState::Closed => true,
 CircuitState::Open => false,
 CircuitState::HalfOpen => {
 let current = self.half_open_requests.fetch_add(1, Ordering::SeqCst);
 current < self.config.half_open_max_requests
 }
 }
 }

 pub fn record_success(&self) {
 let mut state = self.state.write().unwrap();
 match *state {
 CircuitState::Closed => {
 self.failure_count.store(0, Ordering::SeqCst);
 }
 CircuitState::HalfOpen => {
 let successes = self.success_count.fetch_add(1, Ordering::SeqCst) + 1;
 if successes >= self.config.success_threshold {
 info!(provider = %self.name, successes, "circuit breaker closing after recovery");
 self.transition_to(&mut state, CircuitState::Closed);
 }
 }
 CircuitState::Open => {
 debug!(provider = %self.name, "success recorded while circuit open");
 }
 }
 }

 pub fn record_failure(&self) {
 let mut state = self.state.write().unwrap();
 match *state {
 CircuitState::Closed => {
 let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
 if failures >= self.config.failure_threshold {
 warn!(provider = %self.name, failures, "circuit breaker opening due to failures");
 self.transition_to(&mut state, CircuitState::Open);
 }
 }
 CircuitState::HalfOpen => {
 warn!(provider = %self.name, "circuit breaker re-opening after half-open failure");
 self.transition_to(&mut state, CircuitState::Open);
 }
 CircuitState::Open => {}
 }
 }

 pub fn force_state(&self, new_state: CircuitState) {
 let mut state = self.state.write().unwrap();
 self.transition_to(&mut state, new_state);
 }

 pub fn stats(&self) -> CircuitBreakerStats {
 CircuitBreakerStats {
 name: self.name.clone(),
 state: self.state(),
 failure_count: self.failure_count.load(Ordering::SeqCst),
 success_count: self.success_count.load(Ordering::SeqCst),
 last_transition: *self.last_transition.read().unwrap(),
 }
 }

 fn check_timeout(&self) {
 let state = *self.state.read().unwrap();
 if state != CircuitState::Open {
 return;
 }
 let opened_at = self.opened_at_millis.load(Ordering::SeqCst);
 if opened_at == 0 {
 return;
 }
 let now_millis = Utc::now().timestamp_millis() as u64;
 let elapsed = Duration::from_millis(now_millis.saturating_sub(opened_at));
 if elapsed >= self.config.reset_timeout {
 let mut state = self.state.write().unwrap();
 if *state == CircuitState::Open {
 info!(provider = %self.name, "circuit breaker transitioning to half-open after timeout");
 self.transition_to(&mut state, CircuitState::HalfOpen);
 }
 }
 }

 fn transition_to(&self, state: &mut CircuitState, new_state: CircuitState) {
 *state = new_state;
 *self.last_transition.write().unwrap() = Utc::now();
 match new_state {
 CircuitState::Closed => {
 self.failure_count.store(0, Ordering::SeqCst);
 self.success_count.store(0, Ordering::SeqCst);
 self.opened_at_millis.store(0, Ordering::SeqCst);
 }
 CircuitState::Open => {
 self.success_count.store(0, Ordering::SeqCst);
 self.half_open_requests.store(0, Ordering::SeqCst);
 self.opened_at_millis
.store(Utc::now().timestamp_millis() as u64, Ordering::SeqCst);
 }
 CircuitState::HalfOpen => {
 self.success_count.store(0, Ordering::SeqCst);
 self.half_open_requests.store(0, Ordering::SeqCst);
 }
 }
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 fn test_config() -> CircuitBreakerConfig {
 CircuitBreakerConfig {
 failure_threshold: 3,
 success_threshold: 2,
 reset_timeout: Duration::from_millis(50),
 half_open_max_requests: 1,
 }
 }

 #[test]
 fn opens_after_threshold_failures() {
 let breaker = CircuitBreaker::new("test", test_config());
 for _ in 0..3 {
 breaker.record_failure();
 }
 assert_eq!(breaker.state(), CircuitState::Open);
 assert!(!breaker.allow_request());
 }

 #[test]
 fn half_open_closes_after_success_threshold() {
 let breaker = CircuitBreaker::new("test", test_config());
 for _ in 0..3 {
 breaker.record_failure();
 }
 std::thread::sleep(Duration::from_millis(60));
 assert_eq!(breaker.state(), CircuitState::HalfOpen);
 breaker.record_success();
 breaker.record_success();
 assert_eq!(breaker.state(), CircuitState::Closed);
 }

 #[test]
 fn half_open_failure_reopens() {
 let breaker = CircuitBreaker::new("test", test_config());
 for _ in 0..3 {
 breaker.record_failure();
 }
 std::thread::sleep(Duration::from_millis(60));
 assert_eq!(breaker.state(), CircuitState::HalfOpen);
 breaker.record_failure();
 assert_eq!(breaker.state(), CircuitState::Open);
 }
}
