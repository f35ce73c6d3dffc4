use crate::api::error::{DEADLINE_HEADER, ErrorBody};
use crate::error::{Error, Result};
use crate::fetch::FetchContext;
use crate::services::{PriceRequest, PriceResponse, PriceService, RankRequest, RankResponse, RankService};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// JSON-over-HTTP client for a collector running in another process.
struct RpcClient {
    client: reqwest::Client,
    base_url: String,
}

impl RpcClient {
    fn new(base_url: &str) -> Result<Self> {
        Ok(RpcClient {
            client: reqwest::Client::builder().build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call<Req, Resp>(&self, path: &str, request: &Req, ctx: &FetchContext) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        if let Some(err) = ctx.err() {
            return Err(err);
        }

        let mut builder = self.client.post(format!("{}{}", self.base_url, path)).json(request);
        if let Some(remaining) = ctx.remaining() {
            builder = builder
                .timeout(remaining)
                .header(DEADLINE_HEADER, remaining.as_millis().to_string());
        }

        let response = tokio::select! {
            biased;
            err = ctx.done() => return Err(err),
            response = builder.send() => response?,
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<Resp>().await?);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        Err(Error::RpcError {
            status: status.as_u16(),
            message,
        })
    }
}

pub struct RemotePriceService {
    rpc: RpcClient,
}

impl RemotePriceService {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(RemotePriceService { rpc: RpcClient::new(base_url)? })
    }
}

#[async_trait]
impl PriceService for RemotePriceService {
    async fn get_prices(&self, request: PriceRequest, ctx: FetchContext) -> Result<PriceResponse> {
        self.rpc.call("/rpc/prices", &request, &ctx).await
    }
}

pub struct RemoteRankService {
    rpc: RpcClient,
}

impl RemoteRankService {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(RemoteRankService { rpc: RpcClient::new(base_url)? })
    }
}

#[async_trait]
impl RankService for RemoteRankService {
    async fn get_ranks(&self, request: RankRequest, ctx: FetchContext) -> Result<RankResponse> {
        self.rpc.call("/rpc/ranks", &request, &ctx).await
    }
}
