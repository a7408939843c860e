use std::{sync::Arc, time::Duration};

use rama::{
    Layer,
    error::{BoxError, ErrorContext as _},
    graceful::ShutdownGuard,
    http::{
        HeaderValue,
        layer::{required_header::AddRequiredResponseHeadersLayer, trace::TraceLayer},
        server::HttpServer,
    },
    layer::TimeoutLayer,
    rt::Executor,
    tcp::server::TcpListener,
    telemetry::tracing,
};

use fault_injection_proxy_lib::{http::fault::FaultInjector, utils::env::server_identifier};

use crate::Args;

mod client;

/// Runs the fault injection HTTP proxy server,
/// delaying and aborting requests as instructed by the [`FaultInjector`],
/// forwarding all other requests to the upstream (if defined).
pub async fn run_proxy_server(
    args: Args,
    guard: ShutdownGuard,
    injector: FaultInjector,
) -> Result<(), BoxError> {
    let exec = Executor::graceful(guard);

    let tcp_service = TcpListener::build(exec.clone())
        .bind(args.bind)
        .await
        .context("bind TCP network interface for proxy")?;

    let proxy_addr = tcp_service
        .local_addr()
        .context("fetch local addr of bound TCP port for proxy")?;

    let downstream = self::client::new_downstream_service(args.upstream.as_ref())?;

    let http_inner_svc = (
        TraceLayer::new_for_http(),
        AddRequiredResponseHeadersLayer::new()
            .with_server_header_value(HeaderValue::from_static(server_identifier())),
        injector.into_layer(),
    )
        .into_layer(downstream);

    let http_service = HttpServer::auto(exec).service(Arc::new(http_inner_svc));

    // bounds the lifetime of a connection, and therefore also
    // of any (long) delay injected into requests served over it
    let connection_timeout = (args.timeout > 0.).then(|| Duration::from_secs_f64(args.timeout));

    tracing::info!(
        proxy.address = %proxy_addr,
        upstream = ?args.upstream,
        "local HTTP fault injection proxy ready"
    );
    super::publish_proxy_addr(&args.data, proxy_addr.into()).await?;

    tcp_service
        .serve(connection_timeout.map(TimeoutLayer::new).into_layer(http_service))
        .await;

    Ok(())
}
