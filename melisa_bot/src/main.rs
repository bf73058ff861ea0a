use std::{env, process, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use melisa_api::{
    Activity, Client, Color, CreateMessage, Embed, EventHandler, Guild, Intents, ListenerError,
    LogLevel, Message, MessagesApi, StatusType,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

const DEFAULT_PREFIX: &str = "!";

/// Counters shared between every listener invocation.
#[derive(Debug, Default)]
struct Stats {
    commands_run: u64,
    guilds_seen: u64,
}

#[derive(Clone)]
struct MyHandler {
    prefix: String,
    started_at: DateTime<Utc>,
    verbose: bool,
    stats: Arc<Mutex<Stats>>,
}

impl MyHandler {
    fn uptime(&self) -> String {
        let elapsed = Utc::now() - self.started_at;
        let secs = elapsed.num_seconds().max(0);
        format!(
            "{}h {}m {}s",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        )
    }

    async fn info_embed(&self, client: &Client) -> Result<Embed, ListenerError> {
        let stats = self.stats.lock().await;
        let me = client
            .user()
            .await
            .map_or_else(|| "unknown".to_string(), |u| u.username);

        let embed = Embed::new()
            .title(format!("{me} status"))?
            .set_color(Color::BLURPLE)
            .add_field("Uptime", self.uptime(), true)?
            .add_field("Cached guilds", client.cache().guilds_count().to_string(), true)?
            .add_field("Guilds seen", stats.guilds_seen.to_string(), true)?
            .add_field("Commands run", stats.commands_run.to_string(), true)?
            .set_footer(format!("Prefix: {}", self.prefix), None)?
            .set_timestamp(None);
        Ok(embed)
    }
}

#[async_trait]
impl EventHandler for MyHandler {
    async fn on_shard_ready(&self, client: &Client, shard_id: u32) -> Result<(), ListenerError> {
        let name = client
            .user()
            .await
            .map_or_else(|| "<unknown>".to_string(), |u| u.username);
        println!("[INFO] Shard {shard_id} ready as {name}");
        Ok(())
    }

    async fn on_guild_create(&self, _client: &Client, guild: &Guild) -> Result<(), ListenerError> {
        let mut stats = self.stats.lock().await;
        stats.guilds_seen += 1;
        if self.verbose {
            println!(
                "[VERBOSE] Guild available: {} ({}), {} channel(s) cached",
                guild.name,
                guild.id,
                guild.channels.len()
            );
        }
        Ok(())
    }

    async fn on_message_create(
        &self,
        client: &Client,
        message: &Message,
    ) -> Result<(), ListenerError> {
        // Ignore bots, including ourselves.
        if message.author.as_ref().map_or(true, |a| a.bot) {
            return Ok(());
        }

        let Some(command) = message.content.strip_prefix(self.prefix.as_str()) else {
            return Ok(());
        };
        let command = command.split_whitespace().next().unwrap_or_default();

        match command {
            "ping" => {
                message.reply("pong").await?;
            }
            "uptime" => {
                message.reply(&format!("Up for {}", self.uptime())).await?;
            }
            "info" => {
                let embed = self.info_embed(client).await?;
                client
                    .rest()
                    .create_message(
                        message.channel_id,
                        CreateMessage::default().embed(embed).reply_to(message.id),
                    )
                    .await?;
            }
            _ => return Ok(()),
        }

        let mut stats = self.stats.lock().await;
        stats.commands_run += 1;
        if self.verbose {
            println!(
                "[VERBOSE] Ran '{}' in channel {} (total: {})",
                command, message.channel_id, stats.commands_run
            );
        }
        Ok(())
    }
}

/// The main entry point of the bot
#[tokio::main]
async fn main() {
    let args = env::args().skip(1).collect::<Vec<String>>();

    // Show help and exit if requested.
    if args.iter().any(|a| a == "--help") {
        print_help();
        process::exit(0);
    }

    // Show version and exit if requested.
    if args.iter().any(|a| a == "--version") {
        println!("MelisaBot {}", env!("CARGO_PKG_VERSION"));
        process::exit(0);
    }

    let mut env_file: Option<String> = None;
    let mut token: Option<String> = None;
    let mut shards: Option<String> = None;
    let mut prefix: Option<String> = None;
    let mut log_level: Option<String> = None;
    let mut verbose = false;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--env-file" | "-e" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("[ERROR] --env-file requires a file name.");
                    process::exit(1);
                }
                env_file = Some(args[i].clone());
            }
            "--token" | "-t" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("[ERROR] --token requires a token string.");
                    process::exit(1);
                }
                token = Some(args[i].clone());
            }
            "--shards" | "-s" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("[ERROR] --shards requires a shard count.");
                    process::exit(1);
                }
                shards = Some(args[i].clone());
            }
            "--prefix" | "-p" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("[ERROR] --prefix requires a command prefix.");
                    process::exit(1);
                }
                prefix = Some(args[i].clone());
            }
            "--log-level" | "-l" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("[ERROR] --log-level requires a level.");
                    process::exit(1);
                }
                log_level = Some(args[i].clone());
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            other => {
                eprintln!("[WARNING] Ignoring unknown argument '{}'.", other);
            }
        }
        i += 1;
    }

    // If we have an env file, load it.
    if let Some(env_path) = env_file {
        if verbose {
            println!("[VERBOSE] Loading environment from file: {}", env_path);
        }
        if let Err(e) = dotenvy::from_filename(&env_path) {
            eprintln!("[ERROR] Failed to load .env file '{}': {:?}", env_path, e);
            process::exit(1);
        }
    }

    let token = match token.or_else(|| env::var("DISCORD_TOKEN").ok()) {
        Some(t) if !t.trim().is_empty() => t,
        _ => {
            eprintln!("[ERROR] No token found. Provide --token or set DISCORD_TOKEN (optionally via .env).");
            process::exit(1);
        }
    };

    let num_shards = match shards.or_else(|| env::var("MELISA_SHARDS").ok()) {
        None => None,
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                eprintln!("[ERROR] Invalid shard count '{}'.", raw);
                process::exit(1);
            }
        },
    };

    let log_level = match log_level {
        None if verbose => LogLevel::Debug,
        None => LogLevel::Info,
        Some(raw) => match raw.parse::<LogLevel>() {
            Ok(level) => level,
            Err(e) => {
                eprintln!("[ERROR] {}", e);
                process::exit(1);
            }
        },
    };

    let prefix = prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_string());

    let client = match Client::builder(&token)
        .intents(Intents::default())
        .activity(Activity::playing(format!("{prefix}ping")))
        .status(StatusType::Online)
        .logs(Some(log_level))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[ERROR] Failed to create client: {}", e);
            process::exit(1);
        }
    };

    let handler = MyHandler {
        prefix,
        started_at: Utc::now(),
        verbose,
        stats: Arc::new(Mutex::new(Stats::default())),
    };
    client.listen(handler).await;

    println!("Bot is running. Press Ctrl+C to stop.");
    let result = match num_shards {
        Some(n) => {
            info!(shards = n, "starting with a fixed shard count");
            client.run_shards(n, None).await
        }
        None => client.run_autosharded().await,
    };

    match result {
        Ok(()) => println!("\nShut down cleanly."),
        Err(e) => {
            warn!(error = %e, "client stopped");
            eprintln!("[ERROR] Client stopped: {}", e);
            process::exit(1);
        }
    }
}

/// Print help text and usage examples
fn print_help() {
    println!(
        r#"Usage: melisa_bot [OPTION]...
Run a small Discord bot that answers `ping`, `uptime` and `info` commands.

The token is read from --token or the DISCORD_TOKEN environment variable.
MELISA_SHARDS may hold a fixed shard count; otherwise the recommended
count is fetched from Discord.

Options:
  -e, --env-file [FILE]        Load environment variables from a .env file.
  -t, --token [TOKEN]          Specify the bot token.
  -s, --shards [COUNT]         Run COUNT shards instead of autosharding.
  -p, --prefix [PREFIX]        Command prefix (default: "!").
  -l, --log-level [LEVEL]      One of critical, error, warning, info, debug.
  -v, --verbose                Increase verbosity of output.
      --help                   Display this help and exit.
      --version                Output version information and exit.

Examples:
  melisa_bot -e .env
  melisa_bot -t MyToken --shards 2
  melisa_bot -e .env -p "?" -v
"#
    );
}
