//! Tower middleware enforcing a named quota on HTTP requests.

use std::task::{Context, Poll};

use http::{Request, Response};
use tower::{Layer, Service};
use tracing::debug;

use crate::admission::{Admission, AdmissionController, QuotaName, apply_rate_limit_headers};

/// A `Layer` that checks every request against one quota.
#[derive(Debug, Clone)]
pub struct AdmissionLayer {
    controller: AdmissionController,
    quota: QuotaName,
}

impl AdmissionLayer {
    /// Creates a layer for `quota`.
    pub fn new(controller: AdmissionController, quota: QuotaName) -> Self {
        Self { controller, quota }
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = AdmissionService<S>;

    fn layer(&self, service: S) -> Self::Service {
        AdmissionService { service, controller: self.controller.clone(), quota: self.quota }
    }
}

/// A `Service` that rejects over-quota requests with 429 and tags admitted
/// responses with rate-limit headers.
#[derive(Debug, Clone)]
pub struct AdmissionService<S> {
    service: S,
    controller: AdmissionController,
    quota: QuotaName,
}

impl<S, B, ResBody> Service<Request<B>> for AdmissionService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
    ResBody: From<String> + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        match self.controller.enforce(request.headers(), self.quota) {
            Admission::Rejected(rejection) => {
                debug!(
                    quota = %self.quota,
                    uri = %request.uri().path(),
                    retry_after = rejection.body.retry_after,
                    "Short-circuiting over-quota request"
                );
                Box::pin(async move { Ok(rejection.into_response()) })
            }
            Admission::Admitted(decision) => {
                let future = self.service.call(request);
                Box::pin(async move {
                    let mut response = future.await?;
                    apply_rate_limit_headers(&decision, response.headers_mut());
                    Ok(response)
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::{ManualClock, Quota, QuotaTable};
    use http::StatusCode;
    use std::convert::Infallible;
    use std::sync::Arc;
    use tower::{ServiceBuilder, ServiceExt};

    fn controller() -> AdmissionController {
        AdmissionController::new(QuotaTable::new().with(QuotaName::Export, Quota::new(1, 60_000)))
            .with_clock(Arc::new(ManualClock::new(0)))
    }

    async fn ok_handler(_req: Request<()>) -> Result<Response<String>, Infallible> {
        Ok(Response::new("exported".to_string()))
    }

    fn request() -> Request<()> {
        Request::builder()
            .uri("/export")
            .header("x-forwarded-for", "192.0.2.10")
            .body(())
            .unwrap()
    }

    #[tokio::test]
    async fn test_admitted_response_gets_headers() {
        let service = ServiceBuilder::new()
            .layer(AdmissionLayer::new(controller(), QuotaName::Export))
            .service_fn(ok_handler);

        let response = service.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "exported");
        assert_eq!(response.headers()["x-ratelimit-limit"], "1");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert_eq!(response.headers()["x-ratelimit-reset"], "60");
    }

    #[tokio::test]
    async fn test_over_quota_request_is_short_circuited() {
        let controller = controller();
        let layer = AdmissionLayer::new(controller, QuotaName::Export);

        let first = ServiceBuilder::new().layer(layer.clone()).service_fn(ok_handler);
        first.oneshot(request()).await.unwrap();

        let second = ServiceBuilder::new().layer(layer).service_fn(ok_handler);
        let response = second.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "60");
        let body: serde_json::Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body["error"], "rate_limit_exceeded");
    }
}
