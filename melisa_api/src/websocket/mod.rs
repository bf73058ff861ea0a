pub mod compression;
pub mod event_handler;
pub mod gateway;
pub(crate) mod listeners;
pub mod shard;
pub mod waiters;

pub use event_handler::{report_listener_error, Event, EventHandler};
pub use gateway::{ConnectionState, Gateway, GatewayConfig, GatewayMessage, Session};
pub use shard::{Shard, ShardManager};
pub use waiters::Waiters;
