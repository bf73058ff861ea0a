//! # Melisa API
//!
//! An asynchronous, object-oriented microframework for the Discord API. It
//! uses `tokio` for the async runtime, `reqwest` for the REST API and
//! `tokio-tungstenite` for the sharded gateway.
//!
//! ```no_run
//! use melisa_api::{Client, EventHandler, Intents, ListenerError, Message};
//!
//! struct Bot;
//!
//! #[async_trait::async_trait]
//! impl EventHandler for Bot {
//!     async fn on_message_create(&self, _: &Client, message: &Message) -> Result<(), ListenerError> {
//!         if message.content == "ping" {
//!             message.reply("pong").await?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> Result<(), melisa_api::MelisaError> {
//! let client = Client::new("token", Intents::all() - Intents::GUILD_PRESENCES)?;
//! client.listen(Bot).await;
//! client.run_autosharded().await
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod client;
pub mod error;
pub mod json;
pub mod logging;
pub mod types;
pub mod util;
pub mod websocket;

pub use cache::{CacheManager, ChannelsCachingPolicy};
pub use client::*;
pub use error::{ListenerError, MelisaError};
pub use logging::{init_logging, LogLevel};
pub use types::*;
pub use websocket::*;
