mod classifier;
mod clock;
mod config;
mod delivery;
mod llm;
mod normalizer;
mod platform;
mod resolver;
mod router;
mod tables;
#[cfg(test)]
mod testing;
mod weather;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::classifier::TriggerConfig;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::llm::{CompletionParams, LlmClient};
use crate::platform::telegram::{self, TelegramTransport};
use crate::resolver::Resolver;
use crate::router::Router;
use crate::tables::Tables;
use crate::weather::WeatherClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,replybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let tables = Arc::new(Tables::load(config.tables.path.as_deref())?);

    info!("Configuration loaded successfully");
    info!("  Model: {}", config.llm.model);
    info!("  Completion endpoint: {}", config.llm.base_url);
    info!("  Trigger keyword: {:?}", config.trigger.keyword);
    info!("  Weather cities: {}", tables.weather.cities.len());

    let clock = Arc::new(SystemClock);
    let resolver = Resolver::standard(
        tables.clone(),
        clock.clone(),
        Arc::new(WeatherClient::new(config.weather.clone())),
        config.weather.timeout(),
        Arc::new(LlmClient::new(&config.llm)),
        CompletionParams::from(&config.llm),
        config.llm.timeout(),
    );

    info!("  Override rules: {:?}", resolver.rule_names());

    let bot = teloxide::Bot::new(&config.telegram.bot_token);
    let router = Arc::new(Router::new(
        Arc::new(TriggerConfig::new(config.trigger.keyword.clone())),
        tables,
        clock,
        resolver,
        Arc::new(TelegramTransport::new(bot.clone())),
    ));

    // Run the Telegram bot
    info!("Bot is starting...");
    telegram::run(router, bot).await?;

    Ok(())
}
