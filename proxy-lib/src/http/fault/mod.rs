//! Header driven fault injection.
//!
//! A [`FaultInjector`] decides per request if the request is delayed
//! and/or aborted, based on its [`FaultConfig`] and the optional
//! `X-Traefik-Fault-*` request headers. Use [`FaultInjector::into_layer`]
//! to place it in front of any http service.

use std::{sync::Arc, time::Duration};

use rama::{
    http::{HeaderMap, StatusCode},
    telemetry::tracing,
};

use crate::config::{FaultConfig, status_code_from_i64};

pub mod gate;
pub mod headers;

mod layer;
pub use self::layer::{FaultInjectionLayer, FaultInjectionService};

use self::{
    gate::{PercentageSource, ThreadRngSource, fault_should_run},
    headers::{
        HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST,
        HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST_PERCENTAGE,
        HEADER_NAME_X_TRAEFIK_FAULT_DELAY_REQUEST,
        HEADER_NAME_X_TRAEFIK_FAULT_DELAY_REQUEST_PERCENTAGE, is_header_set,
        resolve_header_value,
    },
};


#[derive(Debug, Clone)]
pub struct FaultInjector {
    config: Arc<FaultConfig>,
    source: Arc<dyn PercentageSource>,
}

impl FaultInjector {
    /// Create a [`FaultInjector`] which uses the thread local rng for its gates.
    pub fn new(config: FaultConfig) -> Self {
        Self::new_with_source(config, ThreadRngSource::new())
    }

    /// Create a [`FaultInjector`] using a custom [`PercentageSource`],
    /// e.g. a seeded or fixed one to get reproducible decisions.
    pub fn new_with_source(config: FaultConfig, source: impl PercentageSource) -> Self {
        tracing::debug!(
            fault.name = %config.name,
            "create fault injector with config: {config:?}"
        );
        Self {
            config: Arc::new(config),
            source: Arc::new(source),
        }
    }

    pub fn config(&self) -> &FaultConfig {
        &self.config
    }

    /// Turn this injector into a layer which can wrap
    /// the (downstream) http service to inject faults for.
    pub fn into_layer(self) -> FaultInjectionLayer {
        FaultInjectionLayer(self)
    }

    /// Evaluate the delay fault for a request with the given headers.
    ///
    /// Returns the duration to wait for in case the delay fault fires,
    /// which is zero for a negative effective duration.
    /// Consumes a single draw whenever the delay fault is enabled.
    pub fn delay_for(&self, headers: &HeaderMap) -> Option<Duration> {
        if !self.config.delay {
            return None;
        }

        let duration_ms = resolve_header_value(
            headers,
            &HEADER_NAME_X_TRAEFIK_FAULT_DELAY_REQUEST,
            self.config.delay_duration,
        );
        let percentage = resolve_header_value(
            headers,
            &HEADER_NAME_X_TRAEFIK_FAULT_DELAY_REQUEST_PERCENTAGE,
            self.config.delay_percentage,
        );

        if !fault_should_run(self.source.as_ref(), percentage) {
            tracing::trace!(
                fault.name = %self.config.name,
                percentage,
                "delay fault gate closed"
            );
            return None;
        }

        let delay = Duration::from_millis(u64::try_from(duration_ms).unwrap_or_default());
        tracing::trace!(
            fault.name = %self.config.name,
            percentage,
            duration_ms,
            "delay fault gate open: delay {delay:?}"
        );
        Some(delay)
    }

    /// Evaluate the abort fault for a request with the given headers.
    ///
    /// The abort fault is only evaluated (and a draw consumed) if the
    /// abort header is present with a non-empty value, regardless
    /// of whether or not that value is a valid status code.
    pub fn abort_for(&self, headers: &HeaderMap) -> Option<StatusCode> {
        if !self.config.abort {
            return None;
        }

        if !is_header_set(headers, &HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST) {
            tracing::trace!(
                fault.name = %self.config.name,
                "abort fault header missing: skip abort fault"
            );
            return None;
        }

        let percentage = resolve_header_value(
            headers,
            &HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST_PERCENTAGE,
            self.config.abort_percentage,
        );

        if !fault_should_run(self.source.as_ref(), percentage) {
            tracing::trace!(
                fault.name = %self.config.name,
                percentage,
                "abort fault gate closed"
            );
            return None;
        }

        let code = resolve_header_value(
            headers,
            &HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST,
            self.config.abort_code,
        );
        let status = self.status_code_or_default(code);
        tracing::trace!(
            fault.name = %self.config.name,
            percentage,
            code,
            "abort fault gate open: abort with status {status}"
        );
        Some(status)
    }

    fn status_code_or_default(&self, code: i64) -> StatusCode {
        if let Some(status) = status_code_from_i64(code) {
            return status;
        }

        match self.config.abort_status_code() {
            Some(status) => {
                tracing::debug!(
                    fault.name = %self.config.name,
                    "invalid abort status code {code}: use configured code {status}"
                );
                status
            }
            None => {
                tracing::debug!(
                    fault.name = %self.config.name,
                    "invalid abort status code {code} and configured code {}: use {}",
                    self.config.abort_code,
                    StatusCode::BAD_REQUEST,
                );
                StatusCode::BAD_REQUEST
            }
        }
    }
}
