use rama::http::{HeaderMap, HeaderName};
use rama::telemetry::tracing;

/// Overwrites the delay duration (in milliseconds).
pub const HEADER_NAME_X_TRAEFIK_FAULT_DELAY_REQUEST: HeaderName =
    HeaderName::from_static("x-traefik-fault-delay-request");

/// Overwrites the delay percentage.
pub const HEADER_NAME_X_TRAEFIK_FAULT_DELAY_REQUEST_PERCENTAGE: HeaderName =
    HeaderName::from_static("x-traefik-fault-delay-request-percentage");

/// Enables the abort fault for the request,
/// its value (if valid) overwrites the abort status code.
pub const HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST: HeaderName =
    HeaderName::from_static("x-traefik-fault-abort-request");

/// Overwrites the abort percentage.
pub const HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST_PERCENTAGE: HeaderName =
    HeaderName::from_static("x-traefik-fault-abort-request-percentage");

/// Parse a raw header value as a (signed) base-10 integer,
/// falling back to `default` if empty or invalid.
pub fn parse_header_value(raw: &str, default: i64) -> i64 {
    if raw.is_empty() {
        return default;
    }
    raw.parse().unwrap_or(default)
}

/// Resolve the effective value for the header with the given name,
/// using `default` if the header is missing, empty or invalid.
///
/// Only the first value is considered in case the header is repeated.
pub fn resolve_header_value(headers: &HeaderMap, name: &HeaderName, default: i64) -> i64 {
    let Some(value) = headers.get(name) else {
        return default;
    };

    match value.to_str() {
        Ok(raw) => {
            let resolved = parse_header_value(raw, default);
            tracing::trace!(header = %name, raw, resolved, "resolved fault header value");
            resolved
        }
        Err(err) => {
            tracing::trace!(header = %name, "non-ascii fault header value ({err}): use default {default}");
            default
        }
    }
}

/// Returns `true` if the header is present with a non-empty value.
pub fn is_header_set(headers: &HeaderMap, name: &HeaderName) -> bool {
    headers.get(name).is_some_and(|value| !value.is_empty())
}
