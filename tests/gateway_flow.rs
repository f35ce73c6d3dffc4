use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use topcoins::api::{GatewayState, create_router, price_router, rank_router};
use topcoins::config::AppConfig;
use topcoins::fetch::FetchStack;
use topcoins::gateway::Aggregator;
use topcoins::provider::CryptoCompare;
use topcoins::services::{PriceCollector, RankCollector, RemotePriceService, RemoteRankService};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Collectors {
    prices: Arc<PriceCollector>,
    ranks: Arc<RankCollector>,
    config: AppConfig,
}

fn collectors(upstream: &MockServer) -> Collectors {
    let mut config = AppConfig::default();
    config.provider.api_url = upstream.uri();
    config.provider.api_key = "test-key".to_string();
    config.request.retry_num = 0;

    let provider = Arc::new(CryptoCompare::new(&config.provider));
    let stack = FetchStack::from_config(&config).unwrap();
    let retryer = stack.retryer.clone();
    let prices = Arc::new(PriceCollector::new(provider.clone(), stack));
    let ranks = Arc::new(RankCollector::new(provider, retryer, prices.clone(), config.rank.strategy));
    Collectors { prices, ranks, config }
}

fn in_process_gateway(collectors: &Collectors) -> Router {
    let aggregator = Aggregator::new(collectors.ranks.clone(), collectors.prices.clone(), 0);
    let state = GatewayState::new(
        aggregator,
        &collectors.config.gateway,
        &collectors.config.provider.quote_currency,
    );
    create_router(Arc::new(state))
}

async fn mount_happy_upstream(upstream: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/top/mktcapfull"))
        .and(query_param("tsym", "USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Message": "Success",
            "Type": 100,
            "Data": [
                {"CoinInfo": {"Name": "BTC"}},
                {"CoinInfo": {"Name": "ETH"}},
                {"CoinInfo": {"Name": "XRP"}}
            ]
        })))
        .mount(upstream)
        .await;

    Mock::given(method("GET"))
        .and(path("/pricemulti"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "BTC": {"USD": 6634.41},
            "ETH": {"USD": 370.237},
            "XRP": {"USD": 0.471636}
        })))
        .mount(upstream)
        .await;
}

async fn get(router: Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn top_list_joins_provider_ranks_and_prices() {
    let upstream = MockServer::start().await;
    mount_happy_upstream(&upstream).await;
    let collectors = collectors(&upstream);

    let (status, body) = get(in_process_gateway(&collectors), "/?limit=3").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        json,
        json!([
            {"Rank": 1, "Symbol": "BTC", "Price USD": 6634.41},
            {"Rank": 2, "Symbol": "ETH", "Price USD": 370.237},
            {"Rank": 3, "Symbol": "XRP", "Price USD": 0.471636}
        ])
    );

    let requests = upstream.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.headers.get("authorization").unwrap() == "Apikey test-key"));
}

#[tokio::test]
async fn repeat_request_inside_window_is_rate_limited() {
    let upstream = MockServer::start().await;
    mount_happy_upstream(&upstream).await;
    let collectors = collectors(&upstream);

    let (first, _) = get(in_process_gateway(&collectors), "/?limit=2").await;
    let (second, body) = get(in_process_gateway(&collectors), "/?limit=2").await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert!(body.contains("\"Level\":\"upstream\""));
    // The second top-list call never left the process.
    let toplist_calls = upstream
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/top/mktcapfull")
        .count();
    assert_eq!(toplist_calls, 1);
}

#[tokio::test]
async fn invalid_limit_never_reaches_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;
    let collectors = collectors(&upstream);

    let (status, body) = get(in_process_gateway(&collectors), "/?limit=ten").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&body).unwrap(),
        json!({"Level": "request", "Error": "invalid limit value"})
    );
}

#[tokio::test]
async fn provider_error_envelope_is_a_500() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/top/mktcapfull"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Response": "Error",
            "Message": "You are over your rate limit please upgrade your account!"
        })))
        .mount(&upstream)
        .await;
    let collectors = collectors(&upstream);

    let (status, body) = get(in_process_gateway(&collectors), "/?limit=5").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.contains("upgrade"));
}

#[tokio::test]
async fn csv_is_served_from_the_same_pipeline() {
    let upstream = MockServer::start().await;
    mount_happy_upstream(&upstream).await;
    let collectors = collectors(&upstream);

    let (status, body) = get(in_process_gateway(&collectors), "/?limit=1&format=csv").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Rank,Symbol,Price USD\n1,BTC,6634.41\n");
}

#[tokio::test]
async fn gateway_reaches_collectors_over_rpc() {
    let upstream = MockServer::start().await;
    mount_happy_upstream(&upstream).await;
    let collectors = collectors(&upstream);

    let price_url = serve(price_router(collectors.prices.clone())).await;
    let rank_url = serve(rank_router(collectors.ranks.clone())).await;

    let aggregator = Aggregator::new(
        Arc::new(RemoteRankService::new(&rank_url).unwrap()),
        Arc::new(RemotePriceService::new(&price_url).unwrap()),
        0,
    );
    let state = GatewayState::new(aggregator, &collectors.config.gateway, "USD");
    let gateway = create_router(Arc::new(state));

    let (status, body) = get(gateway.clone(), "/?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json[1]["Symbol"], "ETH");

    // 429 from the rank collector survives the hop back to the gateway.
    let (status, _) = get(gateway, "/?limit=2").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}
