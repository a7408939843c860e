use std::time::{Duration, Instant};

use rama::http::{
    BodyExtractExt as _, StatusCode, header::SERVER, service::client::HttpClientExt as _,
};

use fault_injection_proxy_lib::http::fault::headers::{
    HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST,
    HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST_PERCENTAGE,
    HEADER_NAME_X_TRAEFIK_FAULT_DELAY_REQUEST,
    HEADER_NAME_X_TRAEFIK_FAULT_DELAY_REQUEST_PERCENTAGE,
};

use crate::test::e2e;

#[tokio::test]
#[tracing_test::traced_test]
async fn test_responder_no_fault_headers() {
    let runtime = e2e::runtime::spawn_with_args(&[]).await;
    let client = runtime.client();

    let resp = client.get(runtime.uri("/hello")).send().await.unwrap();
    assert_eq!(StatusCode::OK, resp.status());

    let server = resp
        .headers()
        .get(SERVER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(server.starts_with("fault-injection-proxy/"), "server = {server}");

    let payload = resp.try_into_string().await.unwrap();
    assert!(payload.is_empty(), "payload = {payload}");
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_responder_abort_with_header_status() {
    let runtime = e2e::runtime::spawn_with_args(&[]).await;
    let client = runtime.client();

    for (code, expected_status) in [
        ("503", StatusCode::SERVICE_UNAVAILABLE),
        ("418", StatusCode::IM_A_TEAPOT),
        ("teapot", StatusCode::BAD_REQUEST),
        ("42", StatusCode::BAD_REQUEST),
    ] {
        let resp = client
            .get(runtime.uri("/"))
            .header(HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST, code)
            .send()
            .await
            .unwrap();
        assert_eq!(expected_status, resp.status(), "code = {code}");
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_responder_abort_falls_back_to_configured_code() {
    let runtime = e2e::runtime::spawn_with_args(&["--abort-code", "502"]).await;
    let client = runtime.client();

    let resp = client
        .get(runtime.uri("/"))
        .header(HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST, "not-a-code")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::BAD_GATEWAY, resp.status());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_responder_abort_percentage_header_closes_gate() {
    let runtime = e2e::runtime::spawn_with_args(&[]).await;
    let client = runtime.client();

    for _ in 0..5 {
        let resp = client
            .get(runtime.uri("/"))
            .header(HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST, "503")
            .header(HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST_PERCENTAGE, "-1")
            .send()
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, resp.status());
    }
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_responder_abort_disabled() {
    let runtime = e2e::runtime::spawn_with_args(&["--abort", "false"]).await;
    let client = runtime.client();

    let resp = client
        .get(runtime.uri("/"))
        .header(HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST, "503")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, resp.status());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_responder_delay_configured_duration() {
    let runtime = e2e::runtime::spawn_with_args(&["--delay-duration", "300"]).await;
    let client = runtime.client();

    let start = Instant::now();
    let resp = client.get(runtime.uri("/")).send().await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(StatusCode::OK, resp.status());
    assert!(elapsed >= Duration::from_millis(300), "elapsed = {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "elapsed = {elapsed:?}");
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_responder_delay_header_overrides_config() {
    let runtime = e2e::runtime::spawn_with_args(&[
        "--delay-duration",
        "10000",
        "--delay-percentage",
        "-1",
    ])
    .await;
    let client = runtime.client();

    // gate closed by the configured percentage
    let start = Instant::now();
    let resp = client.get(runtime.uri("/")).send().await.unwrap();
    assert_eq!(StatusCode::OK, resp.status());
    assert!(start.elapsed() < Duration::from_secs(5));

    // gate opened and duration shortened by the headers
    let start = Instant::now();
    let resp = client
        .get(runtime.uri("/"))
        .header(HEADER_NAME_X_TRAEFIK_FAULT_DELAY_REQUEST, "250")
        .header(HEADER_NAME_X_TRAEFIK_FAULT_DELAY_REQUEST_PERCENTAGE, "100")
        .send()
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(StatusCode::OK, resp.status());
    assert!(elapsed >= Duration::from_millis(250), "elapsed = {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "elapsed = {elapsed:?}");
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_responder_delay_then_abort() {
    let runtime = e2e::runtime::spawn_with_args(&[]).await;
    let client = runtime.client();

    let start = Instant::now();
    let resp = client
        .get(runtime.uri("/"))
        .header(HEADER_NAME_X_TRAEFIK_FAULT_DELAY_REQUEST, "200")
        .header(HEADER_NAME_X_TRAEFIK_FAULT_ABORT_REQUEST, "500")
        .send()
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, resp.status());
    assert!(elapsed >= Duration::from_millis(200), "elapsed = {elapsed:?}");
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_responder_connection_timeout_bounds_delay() {
    let runtime = e2e::runtime::spawn_with_args(&["--timeout", "0.5"]).await;
    let client = runtime.client();

    let start = Instant::now();
    let result = client
        .get(runtime.uri("/"))
        .header(HEADER_NAME_X_TRAEFIK_FAULT_DELAY_REQUEST, "20000")
        .send()
        .await;
    let elapsed = start.elapsed();

    assert!(result.is_err(), "expected connection to be dropped");
    assert!(elapsed < Duration::from_secs(10), "elapsed = {elapsed:?}");
}
