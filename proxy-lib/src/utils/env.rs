pub const fn project_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}

/// Identifier used as `server` header value of the fault injection proxy.
///
/// The library and proxy binary share the workspace version.
pub const fn server_identifier() -> &'static str {
    concat!("fault-injection-proxy/", env!("CARGO_PKG_VERSION"))
}
