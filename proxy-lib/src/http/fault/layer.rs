use rama::{
    Layer, Service,
    http::{Request, Response, service::web::response::IntoResponse},
    telemetry::tracing,
};

use super::FaultInjector;

#[derive(Debug, Clone)]
pub struct FaultInjectionService<S> {
    inner: S,
    injector: FaultInjector,
}

#[derive(Debug, Clone)]
/// Created using [`FaultInjector::into_layer`].
pub struct FaultInjectionLayer(pub(super) FaultInjector);

impl<S> Service<Request> for FaultInjectionService<S>
where
    S: Service<Request, Output = Response>,
{
    type Output = Response;
    type Error = S::Error;

    async fn serve(&self, req: Request) -> Result<Self::Output, Self::Error> {
        if let Some(delay) = self.injector.delay_for(req.headers())
            && !delay.is_zero()
        {
            tracing::debug!(
                fault.name = %self.injector.config().name,
                uri = %req.uri(),
                "FaultInjectionService: delay request for {delay:?}"
            );
            tokio::time::sleep(delay).await;
        }

        if let Some(status) = self.injector.abort_for(req.headers()) {
            tracing::debug!(
                fault.name = %self.injector.config().name,
                uri = %req.uri(),
                "FaultInjectionService: abort request with status {status}"
            );
            return Ok(status.into_response());
        }

        self.inner.serve(req).await
    }
}

impl<S> Layer<S> for FaultInjectionLayer {
    type Service = FaultInjectionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FaultInjectionService {
            inner,
            injector: self.0.clone(),
        }
    }

    fn into_layer(self, inner: S) -> Self::Service {
        FaultInjectionService {
            inner,
            injector: self.0,
        }
    }
}
