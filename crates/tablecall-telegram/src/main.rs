//! tablecall Telegram bot binary.
//!
//! Start the bot with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx cargo run -p tablecall-telegram
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tablecall_core::config;
use tablecall_core::feed::sushiro::DEFAULT_API_BASE;
use tablecall_core::AlertThresholds;
use tablecall_telegram::settings::resolve_token;
use tablecall_telegram::{BotSettings, TablecallBot};
use tracing_subscriber::EnvFilter;
use url::Url;

/// tablecall - get told when your queue ticket is about to be called
#[derive(Parser, Debug)]
#[command(name = "tablecall-telegram")]
#[command(about = "Telegram bot that alerts you as your restaurant queue ticket comes up")]
struct Args {
    /// File holding the bot token (used when TELEGRAM_BOT_TOKEN is unset)
    token_file: Option<PathBuf>,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Seconds between queue checks
    #[arg(long, env = "TABLECALL_POLL_INTERVAL", default_value_t = 30)]
    poll_interval: u64,

    /// Alert thresholds in tables remaining, descending
    #[arg(long, env = "TABLECALL_ALERTS", default_value = "10,5,2")]
    alerts: AlertThresholds,

    /// Empty queue reads without a store status treated as closed
    #[arg(long, env = "TABLECALL_CLOSED_AFTER", default_value_t = 3)]
    closed_after: u32,

    /// Seconds a queue read is reused
    #[arg(long, env = "TABLECALL_QUEUE_TTL", default_value_t = 60)]
    queue_ttl: u64,

    /// Queue API base URL
    #[arg(long, env = "TABLECALL_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: Url,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Environment files first, so clap's env fallbacks can see them
    let env_path = config::env_file();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }
    let _ = dotenvy::from_filename(".env.local")
        .or_else(|_| dotenvy::dotenv());

    let args = Args::parse();

    // Initialize logging based on verbosity
    let filter = match args.verbose {
        0 => "tablecall_telegram=info,tablecall_monitor=info,teloxide=warn",
        1 => "tablecall_telegram=debug,tablecall_monitor=debug,tablecall_core=debug,teloxide=info",
        2 => "tablecall_telegram=trace,tablecall_monitor=trace,tablecall_core=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let token = resolve_token(args.token, args.token_file.as_deref())?;
    let settings = BotSettings::new(token)
        .with_api_base(args.api_base.as_str())
        .with_poll_interval(Duration::from_secs(args.poll_interval))
        .with_thresholds(args.alerts)
        .with_closed_after_empty_reads(args.closed_after)
        .with_queue_ttl(Duration::from_secs(args.queue_ttl));

    let bot = TablecallBot::new(settings)?;

    match bot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, "Bot initialized successfully");
            println!("\ntablecall Telegram bot");
            println!("   Bot: @{}", username);
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get bot info");
            return Err(e.into());
        }
    }

    println!("\nOpen Telegram and send /start to begin");
    println!("   Press Ctrl+C to stop\n");

    bot.start_polling().await?;

    Ok(())
}
