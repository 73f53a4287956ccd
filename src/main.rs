use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use catalog_bot::bot::{self, AppState, ProviderSessions};
use catalog_bot::config::AppConfig;
use catalog_bot::db;
use catalog_bot::dialogue::CatalogDialogueState;
use catalog_bot::enrich::Enricher;
use catalog_bot::evidence::PageFetcher;
use catalog_bot::imagery::ImageResolver;
use catalog_bot::storage::{Rehoster, SupabaseStorage};

const MAX_DB_CONNECTIONS: u32 = 5;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file before reading RUST_LOG
    dotenv::dotenv().ok();

    init_tracing();

    info!("Starting Catalog Telegram Bot");

    let config = AppConfig::from_env().context("Invalid configuration")?;

    info!("Connecting to database");
    let pool = PgPoolOptions::new()
        .max_connections(MAX_DB_CONNECTIONS)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to DATABASE_URL")?;

    db::init_database_schema(&pool).await?;

    let storage: Arc<dyn Rehoster> = Arc::new(SupabaseStorage::new(config.storage.clone()));
    let enricher = Enricher::from_config(&config);
    info!(providers = ?enricher.provider_names(), order = ?config.text_order, "Text providers ready");

    let state = Arc::new(AppState {
        pool,
        enricher,
        images: ImageResolver::from_config(&config, Arc::clone(&storage)),
        storage,
        fetcher: PageFetcher::new(config.endpoints.readability_proxy.clone(), &config.evidence),
        sessions: ProviderSessions::new(),
    });

    let bot = Bot::new(config.telegram_token.clone());

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<CatalogDialogueState>, CatalogDialogueState>()
                .endpoint(bot::message_handler),
        )
        .branch(
            Update::filter_callback_query()
                .enter_dialogue::<CallbackQuery, InMemStorage<CatalogDialogueState>, CatalogDialogueState>()
                .endpoint(bot::callback_handler),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![InMemStorage::<CatalogDialogueState>::new(), state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
