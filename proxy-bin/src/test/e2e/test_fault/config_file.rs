use rama::http::{StatusCode, service::client::HttpClientExt as _};

use fault_injection_proxy_lib::http::fault::headers::HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST;

use crate::test::e2e;

async fn spawn_with_config_file(cfg: serde_json::Value, extra_args: &[&str]) -> e2e::runtime::Runtime {
    let data_dir = crate::test::tmp_dir::try_new("fault_injection_proxy_e2e_cfg").unwrap();
    let cfg_path = data_dir.join("config.json");
    tokio::fs::write(&cfg_path, serde_json::to_vec(&cfg).unwrap())
        .await
        .unwrap();

    let cfg_path_str = cfg_path.display().to_string();
    let mut args = vec!["--config", cfg_path_str.as_str()];
    args.extend(extra_args);

    let runtime = e2e::runtime::spawn_with_data_dir_and_args(data_dir, &args).await;
    assert!(crate::server::proxy_addr_file_path(runtime.data_dir()).exists());
    runtime
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_config_file_manifest_keys() {
    let runtime = spawn_with_config_file(
        serde_json::json!({
            "Name": "from-file",
            "Delay": false,
            "AbortCode": 503,
            "AbortPercentage": 100,
        }),
        &[],
    )
    .await;
    let client = runtime.client();

    let resp = client
        .get(runtime.uri("/"))
        .header(HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST, "invalid")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::SERVICE_UNAVAILABLE, resp.status());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_config_file_overwritten_by_cli() {
    let runtime = spawn_with_config_file(
        serde_json::json!({
            "abort": true,
            "abort_code": 503,
        }),
        &["--abort-code", "429", "--abort-percentage", "100"],
    )
    .await;
    let client = runtime.client();

    let resp = client
        .get(runtime.uri("/"))
        .header(HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST, "invalid")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::TOO_MANY_REQUESTS, resp.status());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_config_file_abort_disabled() {
    let runtime = spawn_with_config_file(serde_json::json!({ "abort": false }), &[]).await;
    let client = runtime.client();

    let resp = client
        .get(runtime.uri("/"))
        .header(HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST, "500")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, resp.status());
}
