use std::convert::Infallible;

use rama::{
    Layer as _, Service,
    error::{BoxError, ErrorContext as _},
    http::{
        HeaderValue, Request, Response, StatusCode, Uri,
        client::EasyHttpWebClient,
        header::HOST,
        layer::{
            map_request_body::MapRequestBodyLayer,
            map_response_body::MapResponseBodyLayer,
            remove_header::{RemoveRequestHeaderLayer, RemoveResponseHeaderLayer},
        },
        service::web::response::IntoResponse,
    },
    telemetry::tracing::{self, Instrument as _},
};

/// The service which serves all requests that were not aborted.
#[derive(Debug, Clone)]
pub(super) enum Downstream<S> {
    /// Forward requests to the upstream service.
    Upstream(UpstreamClient<S>),
    /// Respond with an empty 200 OK.
    Responder,
}

#[derive(Debug, Clone)]
pub(super) struct UpstreamClient<S> {
    inner: S,
    origin: String,
    authority: HeaderValue,
}

pub(super) fn new_downstream_service(
    upstream: Option<&Uri>,
) -> Result<
    Downstream<impl Service<Request, Output = Response, Error: Into<BoxError>>>,
    BoxError,
> {
    let Some(upstream) = upstream else {
        tracing::info!("no upstream defined: respond to non-aborted requests with 200 OK");
        return Ok(Downstream::Responder);
    };

    let scheme = upstream
        .scheme_str()
        .context("upstream uri without scheme")
        .with_context_field("uri", || upstream.clone())?;
    let authority = upstream
        .authority()
        .context("upstream uri without authority")
        .with_context_field("uri", || upstream.clone())?;

    if upstream.path() != "/" && !upstream.path().is_empty() {
        tracing::warn!(
            uri = %upstream,
            "path of upstream uri is ignored: request paths are forwarded as-is"
        );
    }

    let authority_header = HeaderValue::from_str(authority.as_str())
        .context("upstream authority as host header value")
        .with_context_field("uri", || upstream.clone())?;

    let inner = (
        RemoveResponseHeaderLayer::hop_by_hop(),
        RemoveRequestHeaderLayer::hop_by_hop(),
        MapResponseBodyLayer::new_boxed_streaming_body(),
        MapRequestBodyLayer::new_boxed_streaming_body(),
    )
        .into_layer(EasyHttpWebClient::default());

    Ok(Downstream::Upstream(UpstreamClient {
        inner,
        origin: format!("{scheme}://{authority}"),
        authority: authority_header,
    }))
}

impl<S> UpstreamClient<S> {
    fn upstream_uri(&self, uri: &Uri) -> Result<Uri, BoxError> {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        format!("{}{path_and_query}", self.origin)
            .parse::<Uri>()
            .context("parse upstream request uri")
            .with_context_field("origin", || self.origin.clone())
    }
}

impl<S> Service<Request> for Downstream<S>
where
    S: Service<Request, Output = Response, Error: Into<BoxError>>,
{
    type Output = Response;
    type Error = Infallible;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        match self {
            Self::Upstream(client) => client.serve(req).await,
            Self::Responder => {
                tracing::trace!(uri = %req.uri(), "respond to request without upstream");
                Ok(StatusCode::OK.into_response())
            }
        }
    }
}

impl<S> Service<Request> for UpstreamClient<S>
where
    S: Service<Request, Output = Response, Error: Into<BoxError>>,
{
    type Output = Response;
    type Error = Infallible;

    async fn serve(&self, mut req: Request) -> Result<Self::Output, Self::Error> {
        let uri = match self.upstream_uri(req.uri()) {
            Ok(uri) => uri,
            Err(err) => {
                tracing::error!(uri = %req.uri(), "invalid upstream uri: {err:?}");
                return Ok(StatusCode::BAD_GATEWAY.into_response());
            }
        };

        tracing::debug!(uri = %uri, "forward request to upstream");
        *req.uri_mut() = uri.clone();
        req.headers_mut().insert(HOST, self.authority.clone());

        match self
            .inner
            .serve(req)
            .instrument(tracing::debug_span!(
                "upstream web request",
                otel.kind = "client",
                network.protocol.name = "http",
            ))
            .await
        {
            Ok(resp) => Ok(resp),
            Err(err) => {
                let err: BoxError = err.into();
                tracing::error!(uri = %uri, "error forwarding request: {err:?}");
                Ok(StatusCode::BAD_GATEWAY.into_response())
            }
        }
    }
}
