pub mod cdn;
pub mod channel;
pub mod color;
pub mod embed;
pub mod emoji;
pub mod error_types;
pub mod file;
pub mod guild;
pub mod intents;
pub mod interaction;
pub mod member;
pub mod message;
pub mod presence;
pub mod role;
pub mod snowflake;
pub mod thread;
pub mod timestamp;
pub mod user;
pub mod webhook;
pub mod websocket;

// Re-export the main types commonly used
pub use cdn::CdnBuilder;
pub use channel::{Channel, ChannelType, CreateChannel, PermissionOverwrite, VideoQualityModes};
pub use color::Color;
pub use embed::{Embed, EmbedAuthor, EmbedField, EmbedFooter, EmbedImage, EmbedThumbnail, EmbedType};
pub use emoji::Emoji;
pub use error_types::ApiError;
pub use file::File;
pub use guild::{
    DefaultMessageNotificationLevel, ExplicitContentFilterLevel, Guild, GuildNsfwLevel, MfaLevel,
    PremiumTier, SystemChannelFlags, UnavailableGuild, VerificationLevel,
};
pub use intents::Intents;
pub use interaction::{
    ApplicationCommandType, Interaction, InteractionData, InteractionType, LocalizedField,
    ResolvedData,
};
pub use member::{GuildMember, ModifyGuildMember};
pub use message::{
    AllowedMentions, Attachment, CreateMessage, Message, MessageActivityType, MessageFlags,
    MessageReference, MessageType,
};
pub use presence::{Activity, ActivityFlags, ActivityType, StatusType, UpdatePresence};
pub use role::Role;
pub use snowflake::Snowflake;
pub use thread::{ThreadMember, ThreadMetadata, ThreadsList};
pub use timestamp::Timestamp;
pub use user::{PremiumType, User, UserFlags};
pub use webhook::{Webhook, WebhookType};
pub use websocket::{GatewayBotInfo, GatewayPayload, OpCode, SessionStartLimit};
