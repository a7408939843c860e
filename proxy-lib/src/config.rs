use std::path::Path;

use rama::{
    error::{BoxError, ErrorContext as _},
    http::StatusCode,
    telemetry::tracing,
};

use serde::{Deserialize, Serialize};

pub const DEFAULT_DELAY_DURATION_MS: i64 = 0;
pub const DEFAULT_DELAY_PERCENTAGE: i64 = 100;
pub const DEFAULT_ABORT_CODE: i64 = 400;
pub const DEFAULT_ABORT_PERCENTAGE: i64 = 100;
pub const DEFAULT_INSTANCE_NAME: &str = "fault";

/// Static configuration of a single fault injection middleware instance.
///
/// Values are trusted as given: percentages outside `0..=100` and
/// status codes which are not valid HTTP status codes are accepted,
/// their effect follows from the gate and abort logic.
///
/// Keys can be given in snake case (`delay_duration`) or using
/// the manifest style of the traefik plugin (`DelayDuration`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultConfig {
    /// Enable the delay fault.
    #[serde(alias = "Delay")]
    pub delay: bool,

    /// Default delay duration in milliseconds.
    #[serde(alias = "DelayDuration")]
    pub delay_duration: i64,

    /// Default probability (in percent) that the delay fires.
    #[serde(alias = "DelayPercentage")]
    pub delay_percentage: i64,

    /// Enable the abort fault.
    #[serde(alias = "Abort")]
    pub abort: bool,

    /// Default status code used for aborted requests.
    #[serde(alias = "AbortCode")]
    pub abort_code: i64,

    /// Default probability (in percent) that the abort fires.
    #[serde(alias = "AbortPercentage")]
    pub abort_percentage: i64,

    /// Name of the middleware instance, used for identification only.
    #[serde(alias = "Name")]
    pub name: String,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            delay: true,
            delay_duration: DEFAULT_DELAY_DURATION_MS,
            delay_percentage: DEFAULT_DELAY_PERCENTAGE,
            abort: true,
            abort_code: DEFAULT_ABORT_CODE,
            abort_percentage: DEFAULT_ABORT_PERCENTAGE,
            name: DEFAULT_INSTANCE_NAME.to_owned(),
        }
    }
}

impl FaultConfig {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    rama::utils::macros::generate_set_and_with! {
        /// Enable or disable the delay fault.
        pub fn delay(mut self, enabled: bool) -> Self {
            self.delay = enabled;
            self
        }
    }

    rama::utils::macros::generate_set_and_with! {
        /// Set the default delay duration (in milliseconds).
        pub fn delay_duration(mut self, millis: i64) -> Self {
            self.delay_duration = millis;
            self
        }
    }

    rama::utils::macros::generate_set_and_with! {
        /// Set the default delay percentage.
        pub fn delay_percentage(mut self, percentage: i64) -> Self {
            self.delay_percentage = percentage;
            self
        }
    }

    rama::utils::macros::generate_set_and_with! {
        /// Enable or disable the abort fault.
        pub fn abort(mut self, enabled: bool) -> Self {
            self.abort = enabled;
            self
        }
    }

    rama::utils::macros::generate_set_and_with! {
        /// Set the default abort status code.
        pub fn abort_code(mut self, code: i64) -> Self {
            self.abort_code = code;
            self
        }
    }

    rama::utils::macros::generate_set_and_with! {
        /// Set the default abort percentage.
        pub fn abort_percentage(mut self, percentage: i64) -> Self {
            self.abort_percentage = percentage;
            self
        }
    }

    rama::utils::macros::generate_set_and_with! {
        /// Set the instance name.
        pub fn name(mut self, name: impl Into<String>) -> Self {
            self.name = name.into();
            self
        }
    }

    /// The configured abort code as [`StatusCode`],
    /// `None` if it is not a valid HTTP status code.
    pub fn abort_status_code(&self) -> Option<StatusCode> {
        status_code_from_i64(self.abort_code)
    }

    pub fn try_from_json_str(s: &str) -> Result<Self, BoxError> {
        let cfg = serde_json::from_str(s).context("parse fault config as json")?;
        Ok(cfg)
    }

    pub async fn try_from_json_file(path: &Path) -> Result<Self, BoxError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .context("read fault config file")
            .with_context_debug_field("path", || path.to_owned())?;

        let cfg: Self = serde_json::from_str(&raw)
            .context("parse fault config file as json")
            .with_context_debug_field("path", || path.to_owned())?;
        tracing::debug!(path = ?path, "fault config loaded from file: {cfg:?}");
        Ok(cfg)
    }
}

pub(crate) fn status_code_from_i64(code: i64) -> Option<StatusCode> {
    u16::try_from(code)
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
}
