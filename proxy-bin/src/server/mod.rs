use std::path::{Path, PathBuf};

use rama::{
    error::{BoxError, ErrorContext as _},
    net::address::SocketAddress,
    telemetry::tracing,
};

pub mod proxy;

/// Name of the file (within the data dir) which holds
/// the socket address the proxy is bound to.
pub const PROXY_ADDR_FILE_NAME: &str = "proxy.addr.txt";

pub fn proxy_addr_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(PROXY_ADDR_FILE_NAME)
}

/// Publish the bound address, so tooling (and the e2e tests)
/// can find a proxy which was bound to a random port.
async fn publish_proxy_addr(data_dir: &Path, addr: SocketAddress) -> Result<(), BoxError> {
    let path = proxy_addr_file_path(data_dir);
    tokio::fs::write(&path, addr.to_string())
        .await
        .context("publish bound proxy address")
        .context_field("address", addr)
        .with_context_debug_field("path", || path.clone())?;

    tracing::debug!(path = ?path, "bound proxy address {addr} published");
    Ok(())
}
