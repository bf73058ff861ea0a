use async_trait::async_trait;
use reqwest::Method;

use crate::{
    client::{RequestBody, RestApp},
    error::MelisaError,
    types::websocket::GatewayBotInfo,
};

#[async_trait]
pub trait GatewayApi {
    /// Gateway url, recommended shard count and session start limits.
    async fn fetch_gateway_bot(&self) -> Result<GatewayBotInfo, MelisaError>;
}

#[async_trait]
impl GatewayApi for RestApp {
    async fn fetch_gateway_bot(&self) -> Result<GatewayBotInfo, MelisaError> {
        self.http
            .request_json(Method::GET, "gateway/bot", RequestBody::Empty, None)
            .await
    }
}
