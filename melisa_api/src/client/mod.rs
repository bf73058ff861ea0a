mod client;
pub mod http;
pub mod ratelimiter;
mod rest;

pub use client::{Client, ClientBuilder};
pub use http::{parse_json, HttpClient, RequestBody};
pub use ratelimiter::{RateLimitBucket, RateLimiter};
pub use rest::RestApp;

pub use crate::{
    api::{
        channels::ChannelsApi, gateway::GatewayApi, guilds::GuildsApi, messages::MessagesApi,
        users::UsersApi, webhooks::WebhooksApi,
    },
    error::{handle_api_error, MelisaError},
};
