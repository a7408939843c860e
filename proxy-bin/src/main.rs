#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

use std::{path::PathBuf, sync::Arc, time::Duration};

use rama::{
    error::{BoxError, ErrorContext as _},
    graceful::{self, ShutdownGuard},
    http::Uri,
    net::socket::Interface,
    telemetry::tracing::{self, Instrument as _},
};

use clap::Parser;
use parking_lot::Mutex;

use fault_injection_proxy_lib::{
    config::FaultConfig,
    http::fault::FaultInjector,
    utils::{self, telemetry::TelemetryConfig},
};

pub mod config;
pub mod server;


/// CLI arguments for configuring the fault injection proxy.
#[derive(Debug, Clone, Parser)]
#[command(name = "fault-injection-proxy")]
#[command(bin_name = "fault-injection-proxy")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// network interface to bind the proxy to
    #[arg(
        long,
        short = 'b',
        value_name = "INTERFACE",
        default_value = "127.0.0.1:0"
    )]
    pub bind: Interface,

    /// upstream service to forward (non-aborted) requests to,
    /// if omitted the proxy responds itself with 200 OK
    #[arg(long, value_name = "<scheme>://<host>[:port]")]
    pub upstream: Option<Uri>,

    /// json file with the fault configuration
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[clap(flatten)]
    pub fault: config::FaultArgs,

    /// directory in which the bound proxy address will be stored
    #[arg(long, short = 'D', default_value = ".fault-injection-proxy")]
    pub data: PathBuf,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", default_value_t = 1.)]
    /// the graceful shutdown timeout (<= 0.0 = no timeout)
    pub graceful: f64,

    #[arg(long, value_name = "SECONDS", default_value_t = 300.)]
    /// max lifetime of a single client connection, bounding injected delays (<= 0.0 = no timeout)
    pub timeout: f64,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    utils::telemetry::init_tracing(TelemetryConfig {
        verbose: args.verbose,
        pretty: args.pretty,
        output: args.output.as_deref(),
    })?;

    let base_shutdown_signal = graceful::default_signal();
    if let Err(err) = run_with_args(base_shutdown_signal, args).await {
        eprintln!("🚩 exit with error: {err}");
        std::process::exit(1);
    }

    Ok(())
}

/// Loads and merges the fault config, then serves the fault injection proxy
/// until the server fails or `base_shutdown_signal` resolves.
///
/// Shared by `main` and the e2e tests, the latter passing a signal which never resolves.
async fn run_with_args<F>(base_shutdown_signal: F, args: Args) -> Result<(), BoxError>
where
    F: Future<Output: Send + 'static> + Send + 'static,
{
    tokio::fs::create_dir_all(&args.data)
        .await
        .context("create data directory")
        .with_context_debug_field("path", || args.data.clone())?;

    let file_cfg = match args.config.as_deref() {
        Some(path) => Some(FaultConfig::try_from_json_file(path).await?),
        None => None,
    };
    let fault_cfg = config::merge_fault_config(file_cfg, args.fault.clone());
    let injector = FaultInjector::new(fault_cfg);

    let graceful_timeout = (args.graceful > 0.).then(|| Duration::from_secs_f64(args.graceful));

    let (error_tx, error_rx) = tokio::sync::oneshot::channel::<BoxError>();
    let fatal_error: Arc<Mutex<Option<BoxError>>> = Default::default();
    let graceful = graceful::Shutdown::new(new_shutdown_signal(
        error_rx,
        fatal_error.clone(),
        base_shutdown_signal,
    ));

    graceful.spawn_task_fn(move |guard| run_proxy_server(args, guard, error_tx, injector));

    let delay = match graceful_timeout {
        Some(duration) => graceful.shutdown_with_limit(duration).await?,
        None => graceful.shutdown().await,
    };

    tracing::info!("gracefully shutdown with a delay of: {delay:?}");

    let fatal_error = fatal_error.lock().take();
    match fatal_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn run_proxy_server(
    args: Args,
    guard: ShutdownGuard,
    error_tx: tokio::sync::oneshot::Sender<BoxError>,
    injector: FaultInjector,
) {
    tracing::info!("spawning fault injection proxy server...");
    let fault_name = injector.config().name.clone();
    if let Err(err) = server::proxy::run_proxy_server(args, guard, injector)
        .instrument(tracing::debug_span!(
            "fault proxy server lifetime",
            server.service.name = utils::env::project_name(),
            fault.name = %fault_name,
            otel.kind = "server",
            network.protocol.name = "http",
        ))
        .await
    {
        tracing::error!("fault proxy server exited with an error: {err}");
        let _ = error_tx.send(err);
    }
}

/// Resolves on the base signal or on a fatal server error,
/// the latter being stored in `fatal_error` for `run_with_args` to return.
fn new_shutdown_signal(
    error_rx: tokio::sync::oneshot::Receiver<BoxError>,
    fatal_error: Arc<Mutex<Option<BoxError>>>,
    base_shutdown_signal: impl Future<Output: Send + 'static> + Send + 'static,
) -> impl Future + Send + 'static {
    async move {
        tokio::select! {
            _ = base_shutdown_signal => {
                tracing::debug!("default signal triggered: init graceful shutdown");
            }
            result = error_rx => {
                match result {
                    Ok(err) => {
                        tracing::error!("fatal err received: {err}; abort");
                        *fatal_error.lock() = Some(err);
                    },
                    Err(_) => {
                        tracing::debug!("proxy server finished without error, return control");
                    },
                }
            }
        }
    }
}
