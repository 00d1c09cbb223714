//! # Fail-Soft Calls
//!
//! Every external dependency is reached through a [`FailSoft`] handle.
//! A handle built for an unconfigured dependency never performs I/O; a
//! configured one runs the operation and turns any error or panic into a
//! degraded [`FailSoftResult`] carrying a safe default.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use metrics::counter;
use serde::Serialize;
use tracing::{debug, warn};

/// Outcome of a fail-soft call.
///
/// `enabled` is true only when the real backend answered. Otherwise `value`
/// holds the documented default and `reason` says why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailSoftResult<T> {
    pub enabled: bool,
    pub value: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl<T> FailSoftResult<T> {
    pub fn enabled(value: T) -> Self {
        Self {
            enabled: true,
            value,
            reason: None,
        }
    }

    pub fn degraded<S: Into<String>>(value: T, reason: S) -> Self {
        Self {
            enabled: false,
            value,
            reason: Some(reason.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.enabled
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> FailSoftResult<U> {
        FailSoftResult {
            enabled: self.enabled,
            value: f(self.value),
            reason: self.reason,
        }
    }
}

/// Fail-soft handle for one external dependency.
///
/// Whether the dependency is configured is decided once, at construction.
#[derive(Debug, Clone)]
pub struct FailSoft {
    service: String,
    configured: bool,
}

impl FailSoft {
    pub fn new<S: Into<String>>(service: S, configured: bool) -> Self {
        let service = service.into();
        if !configured {
            debug!(service = %service, "Dependency not configured, calls will use defaults");
        }
        Self { service, configured }
    }

    /// Handle that short-circuits every call.
    pub fn disabled<S: Into<String>>(service: S) -> Self {
        Self::new(service, false)
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Run `operation` against the dependency.
    ///
    /// `default` is only evaluated when the call is skipped or fails.
    pub async fn call<T, E, Fut, Op, D>(&self, name: &str, operation: Op, default: D) -> FailSoftResult<T>
    where
        Op: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        D: FnOnce() -> T,
    {
        if !self.configured {
            return FailSoftResult::degraded(default(), format!("{} is not configured", self.service));
        }

        let outcome = AssertUnwindSafe(async move { operation().await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(value)) => FailSoftResult::enabled(value),
            Ok(Err(err)) => self.degrade(name, err.to_string(), default),
            Err(panic) => self.degrade(name, format!("panicked: {}", panic_message(&panic)), default),
        }
    }

    fn degrade<T, D: FnOnce() -> T>(&self, name: &str, detail: String, default: D) -> FailSoftResult<T> {
        let reason = format!("{} {} failed: {}", self.service, name, detail);
        warn!(service = %self.service, operation = name, reason = %reason, "Dependency call degraded");
        counter!("fail_soft_degraded_total", 1, "service" => self.service.clone());
        FailSoftResult::degraded(default(), reason)
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unconfigured_never_runs_operation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let wrapper = FailSoft::disabled("vector-search");

        let counter = calls.clone();
        let result = wrapper
            .call(
                "search",
                || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(vec!["hit"])
                },
                Vec::new,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!result.enabled);
        assert!(result.value.is_empty());
        assert_eq!(result.reason.as_deref(), Some("vector-search is not configured"));
    }

    #[tokio::test]
    async fn test_success_is_enabled() {
        let wrapper = FailSoft::new("kv", true);
        let result = wrapper.call("get", || async { Ok::<_, String>(7) }, || 0).await;
        assert_eq!(result, FailSoftResult::enabled(7));
    }

    #[tokio::test]
    async fn test_error_falls_back_to_default() {
        let wrapper = FailSoft::new("tokenizer", true);
        let result = wrapper
            .call("tokenize", || async { Err::<String, _>("401 unauthorized") }, || "original".to_string())
            .await;

        assert!(result.is_degraded());
        assert_eq!(result.value, "original");
        assert_eq!(result.reason.as_deref(), Some("tokenizer tokenize failed: 401 unauthorized"));
    }

    #[tokio::test]
    async fn test_panic_is_absorbed() {
        let wrapper = FailSoft::new("llm", true);
        let result = wrapper
            .call(
                "generate",
                || async {
                    if true {
                        panic!("model exploded");
                    }
                    Ok::<u8, String>(1)
                },
                || 0,
            )
            .await;

        assert!(!result.enabled);
        assert_eq!(result.value, 0);
        assert!(result.reason.unwrap().contains("model exploded"));
    }

    #[test]
    fn test_map_keeps_flags() {
        let mapped = FailSoftResult::degraded(2, "down").map(|v| v * 10);
        assert_eq!(mapped.value, 20);
        assert!(!mapped.enabled);
        assert_eq!(mapped.reason.as_deref(), Some("down"));
    }
}
