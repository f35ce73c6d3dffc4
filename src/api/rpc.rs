use crate::api::error::{ApiError, context_from_headers};
use crate::observability::metrics;
use crate::services::{PriceRequest, PriceResponse, PriceService, RankRequest, RankResponse, RankService};
use axum::{
    Router,
    extract::{Json, State},
    http::HeaderMap,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn price_router(service: Arc<dyn PriceService>) -> Router {
    Router::new()
        .route("/rpc/prices", post(get_prices))
        .with_state(service)
        .merge(ops_router())
        .layer(TraceLayer::new_for_http())
}

pub fn rank_router(service: Arc<dyn RankService>) -> Router {
    Router::new()
        .route("/rpc/ranks", post(get_ranks))
        .with_state(service)
        .merge(ops_router())
        .layer(TraceLayer::new_for_http())
}

/// Liveness and metrics endpoints shared by every process.
pub fn ops_router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_text))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics_text() -> String {
    metrics::render()
}

async fn get_prices(
    State(service): State<Arc<dyn PriceService>>,
    headers: HeaderMap,
    Json(request): Json<PriceRequest>,
) -> Result<Json<PriceResponse>, ApiError> {
    let ctx = context_from_headers(&headers);
    let response = service.get_prices(request, ctx).await?;
    Ok(Json(response))
}

async fn get_ranks(
    State(service): State<Arc<dyn RankService>>,
    headers: HeaderMap,
    Json(request): Json<RankRequest>,
) -> Result<Json<RankResponse>, ApiError> {
    let ctx = context_from_headers(&headers);
    let response = service.get_ranks(request, ctx).await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::services::{MockPriceService, MockRankService};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn prices_endpoint_serves_the_service_response() {
        let mut service = MockPriceService::new();
        service.expect_get_prices().returning(|request, _| {
            assert_eq!(request.symbols, vec!["BTC".to_string()]);
            Ok(PriceResponse { prices: HashMap::from([("BTC".to_string(), 6634.41)]) })
        });

        let response = price_router(Arc::new(service))
            .oneshot(post_json("/rpc/prices", serde_json::json!({"symbols": ["BTC"]})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: PriceResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.prices["BTC"], 6634.41);
    }

    #[tokio::test]
    async fn deadline_header_reaches_the_service() {
        let mut service = MockRankService::new();
        service.expect_get_ranks().returning(|_, ctx| {
            assert!(ctx.deadline().is_some());
            Ok(RankResponse { symbols: vec![] })
        });

        let mut request = post_json("/rpc/ranks", serde_json::json!({"limit": 5}));
        request
            .headers_mut()
            .insert(crate::api::error::DEADLINE_HEADER, "2000".parse().unwrap());

        let response = rank_router(Arc::new(service)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rate_limited_rank_call_returns_429() {
        let mut service = MockRankService::new();
        service
            .expect_get_ranks()
            .returning(|_, _| Err(Error::RateLimitExceeded { key: "toplist".to_string() }));

        let response = rank_router(Arc::new(service))
            .oneshot(post_json("/rpc/ranks", serde_json::json!({"limit": 5})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn negative_limit_returns_400() {
        let mut service = MockRankService::new();
        service
            .expect_get_ranks()
            .returning(|request, _| Err(Error::InvalidLimit(request.limit.to_string())));

        let response = rank_router(Arc::new(service))
            .oneshot(post_json("/rpc/ranks", serde_json::json!({"limit": -1})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_is_served_next_to_rpc() {
        let service = MockPriceService::new();
        let response = price_router(Arc::new(service))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
