use melisa_api::{
    CacheManager, CdnBuilder, ChannelType, ChannelsCachingPolicy, Color, Embed, Guild,
    PremiumTier, Snowflake, VerificationLevel,
};
use serde_json::json;

#[test]
fn snowflake_from_int_and_str() {
    assert_eq!(Snowflake::from(2).get(), 2);
    assert_eq!("2".parse::<Snowflake>().unwrap().get(), 2);
}

#[test]
fn snowflake_timestamps() {
    let id = Snowflake::from(175_928_847_299_117_063);
    assert_eq!(id.timestamp(), 41_944_705_796);
    assert_eq!(id.unix(), 1_462_015_105_796);
}

#[test]
fn color_conversions_agree() {
    let rgb = (3, 217, 147);
    assert_eq!(Color::from_rgb(3, 217, 147).to_rgb(), rgb);
    assert_eq!(Color::from_hex_code("#03d993").unwrap().to_rgb(), rgb);
    assert_eq!(Color(252_307).to_rgb(), rgb);
}

#[test]
fn cdn_urls() {
    let cdn = CdnBuilder::new("png");
    assert_eq!(
        cdn.avatar_url("585766846268047370", "52320b1f9ddb1d7546da7b973bc23d6d"),
        "https://cdn.discordapp.com/avatars/585766846268047370/52320b1f9ddb1d7546da7b973bc23d6d.png?size=1024"
    );
    assert_eq!(
        cdn.default_avatar_url("0575"),
        "https://cdn.discordapp.com/embed/avatars/0.png"
    );
    assert_eq!(
        cdn.guild_icon_url(
            "951867868188934216",
            "5ef33b1f6c4b35f19b605c51c5a64469",
            Some("webp"),
            None
        ),
        "https://cdn.discordapp.com/icons/951867868188934216/5ef33b1f6c4b35f19b605c51c5a64469.webp?size=1024"
    );
}

#[test]
fn embed_total_length() {
    assert_eq!(Embed::new().total_length(), 0);
    assert_eq!(Embed::new().title("my title").unwrap().total_length(), 8);
    assert_eq!(
        Embed::new()
            .add_field("", "best field value", false)
            .unwrap()
            .total_length(),
        16
    );

    let embed = Embed::new()
        .title("my title")
        .unwrap()
        .description("simple description")
        .unwrap()
        .set_author("best author", None, None)
        .unwrap()
        .set_footer("cool footer text", None)
        .unwrap();
    assert_eq!(embed.total_length(), 53);

    let value = embed.to_value();
    assert_eq!(value["title"], "my title");
    assert_eq!(value["footer"]["text"], "cool footer text");
    assert_eq!(value["author"]["name"], "best author");
    assert!(value.get("fields").map_or(true, |f| f.as_array().map_or(true, Vec::is_empty)));
}

#[test]
fn guild_parsing() {
    let guild = Guild::from_value(json!({
        "id": "197038439483310086",
        "name": "Discord Testers",
        "icon": "f64c482b807da4f539cff778d174971c",
        "description": "The official place to report Discord Bugs!",
        "splash": null,
        "features": ["ANIMATED_ICON", "VERIFIED", "NEWS"],
        "emojis": [],
        "banner": "9b6439a7de04f1d26af92f84ac9e1e4a",
        "owner_id": "73193882359173120",
        "application_id": null,
        "region": null,
        "afk_channel_id": null,
        "afk_timeout": 300,
        "verification_level": 3,
        "roles": [],
        "default_message_notifications": 1,
        "mfa_level": 1,
        "explicit_content_filter": 2,
        "max_presences": 40000,
        "max_members": 250000,
        "vanity_url_code": "discord-testers",
        "premium_tier": 3,
        "premium_subscription_count": 33,
        "system_channel_flags": 0,
        "preferred_locale": "en-US",
        "rules_channel_id": "441688182833020939",
        "public_updates_channel_id": "281283303326089216"
    }))
    .unwrap();

    assert_eq!(guild.id.get(), 197_038_439_483_310_086);
    assert_eq!(guild.name, "Discord Testers");
    assert_eq!(guild.features, vec!["ANIMATED_ICON", "VERIFIED", "NEWS"]);
    assert_eq!(guild.owner_id, Some(Snowflake::from(73_193_882_359_173_120)));
    assert_eq!(guild.verification_level, Some(VerificationLevel::High));
    assert_eq!(guild.premium_tier, Some(PremiumTier::Tier3));
    assert_eq!(guild.max_members, Some(250_000));
    assert_eq!(guild.preferred_locale.as_deref(), Some("en-US"));
    assert!(!guild.unavailable);
}

fn guild_with_channels() -> Guild {
    Guild::from_value(json!({
        "id": "1",
        "name": "cache test",
        "channels": [
            {"id": "10", "name": "text", "type": 0},
            {"id": "11", "name": "voice", "type": 2},
            {"id": "12", "name": "news", "type": 5}
        ]
    }))
    .unwrap()
}

#[test]
fn cache_counts_guild_channels() {
    let cache = CacheManager::with_policy(ChannelsCachingPolicy::All);
    cache.set_guild(guild_with_channels());

    assert_eq!(cache.guilds_count(), 1);
    assert_eq!(cache.guild_channels_count(), 3);
    assert_eq!(cache.total_channels_count(), 3);

    let channel = cache.get_guild_channel(Snowflake::from(11)).unwrap();
    assert_eq!(channel.guild_id, Some(Snowflake::from(1)));
}

#[test]
fn cache_policy_filters_types() {
    let cache = CacheManager::with_policy(ChannelsCachingPolicy::types([
        ChannelType::GuildText,
        ChannelType::GuildNews,
    ]));
    cache.set_guild(guild_with_channels());

    assert_eq!(cache.guild_channels_count(), 2);
    assert!(cache.get_guild_channel(Snowflake::from(11)).is_none());
}

#[test]
fn cache_re_set_guild_replaces_symlinks() {
    let cache = CacheManager::with_policy(ChannelsCachingPolicy::All);
    cache.set_guild(guild_with_channels());

    let smaller = Guild::from_value(json!({
        "id": "1",
        "name": "cache test",
        "channels": [{"id": "10", "name": "text", "type": 0}]
    }))
    .unwrap();
    cache.set_guild(smaller);

    assert_eq!(cache.guild_channels_count(), 1);
    assert!(cache.get_guild_channel(Snowflake::from(12)).is_none());
}

#[test]
fn cache_channel_removal() {
    let cache = CacheManager::with_policy(ChannelsCachingPolicy::All);
    cache.set_guild(guild_with_channels());

    let removed = cache.remove_guild_channel(Snowflake::from(10)).unwrap();
    assert_eq!(removed.name.as_deref(), Some("text"));
    assert_eq!(cache.guild_channels_count(), 2);
    let guild = cache.get_guild(Snowflake::from(1)).unwrap();
    assert!(guild.get_channel(Snowflake::from(10)).is_none());
}
