//! Per-source-address attempt throttling for mutating requests.
//!
//! The limiter is built once at startup and shared through `AppState`; every
//! read-modify-write of a key happens under a single mutex. Counters use fixed
//! windows and expire once their window has elapsed. Expired entries are
//! pruned every `prune_every` checks.
//!
//! Requests are keyed on the peer address from `ConnectInfo`. Forwarded
//! headers are only honoured when `trust_proxy` is set.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::errors::{AppError, AppResult};
use crate::events::RequestContext;

#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    pub max_attempts: u32,
    pub window: Duration,
    pub prune_every: u64,
    /// Key on `X-Forwarded-For` / `X-Real-IP` instead of the peer address.
    pub trust_proxy: bool,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            window: Duration::from_secs(60),
            prune_every: 100,
            trust_proxy: false,
        }
    }
}

impl ThrottleConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let max_attempts = match std::env::var("THROTTLE_MAX_ATTEMPTS") {
            Ok(val) => val
                .parse::<u32>()
                .map_err(|_| AppError::configuration("THROTTLE_MAX_ATTEMPTS must be a valid integer"))?,
            Err(_) => defaults.max_attempts,
        };

        let window = match std::env::var("THROTTLE_WINDOW_SECS") {
            Ok(val) => val
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| AppError::configuration("THROTTLE_WINDOW_SECS must be a valid integer"))?,
            Err(_) => defaults.window,
        };

        let trust_proxy = match std::env::var("THROTTLE_TRUST_PROXY") {
            Ok(val) => match val.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => return Err(AppError::configuration("THROTTLE_TRUST_PROXY must be true or false")),
            },
            Err(_) => defaults.trust_proxy,
        };

        Ok(Self {
            max_attempts,
            window,
            trust_proxy,
            ..defaults
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    attempts: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    config: ThrottleConfig,
    state: Mutex<HashMap<String, Window>>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            state: Mutex::new(HashMap::new()),
            checks: AtomicU64::new(0),
        }
    }

    pub fn check(&self, key: &str) -> AppResult<()> {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> AppResult<()> {
        let count = self.checks.fetch_add(1, Ordering::Relaxed);
        if self.config.prune_every > 0 && count > 0 && count % self.config.prune_every == 0 {
            self.prune(now);
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let window = state.entry(key.to_string()).or_insert(Window {
            started: now,
            attempts: 0,
        });

        if now.saturating_duration_since(window.started) >= self.config.window {
            window.started = now;
            window.attempts = 0;
        }

        if window.attempts >= self.config.max_attempts {
            tracing::warn!(
                source = %key,
                attempts = window.attempts,
                max = self.config.max_attempts,
                "attempt limit exceeded"
            );
            return Err(AppError::too_many_requests("too many attempts, try again later"));
        }

        window.attempts += 1;
        Ok(())
    }

    /// Drop counters whose window has elapsed.
    pub fn prune(&self, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let before = state.len();
        state.retain(|_, w| now.saturating_duration_since(w.started) < self.config.window);
        tracing::debug!(removed = before - state.len(), "pruned throttle entries");
    }

    pub fn tracked(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Counter key for a request: the peer address, or the forwarded client
    /// address when running behind a trusted proxy.
    pub fn source_key(&self, req: &Request) -> String {
        let forwarded = if self.config.trust_proxy {
            RequestContext::from_headers(req.headers()).ip
        } else {
            None
        };

        forwarded
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Middleware counting non-read requests per source address.
pub async fn throttle_mutations(State(limiter): State<Arc<RateLimiter>>, req: Request, next: Next) -> Response {
    let is_read = matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS);
    if !is_read {
        if let Err(err) = limiter.check(&limiter.source_key(&req)) {
            return err.into_response();
        }
    }
    next.run(req).await
}
