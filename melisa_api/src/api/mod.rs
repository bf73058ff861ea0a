pub mod channels;
pub mod gateway;
pub mod guilds;
pub mod messages;
pub mod users;
pub mod webhooks;
