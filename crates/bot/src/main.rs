use std::{env, sync::Arc, time::Duration};

use dotenvy::dotenv;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use common::actors::ActorType;
use common::logger;
use common::models::SignalEvent;
use market_data::{MarketDataProvider, TwelveDataClient};
use storage::SignalLedger;

use crate::actors::supervisor::Supervisor;
use crate::services::daily_limiter::DailySignalLimiter;
use crate::services::dispatch_guard::DispatchGuard;
use crate::services::generation_service::GenerationService;
use crate::services::outcome_service::OutcomeService;
use crate::services::telegram_service::TelegramService;

mod actors;
mod services;

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: u64) -> Duration {
    let secs = env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::setup_logger();
    dotenv().ok();
    debug!("System starting up...");

    let data_folder = env_or("WORKDIR", "data");
    let pool = storage::db::connect(&data_folder).await?;
    let ledger = SignalLedger::new(pool.clone());

    let symbol = env_or("SIGNAL_SYMBOL", "EUR/USD");
    let timeframe = env_or("SIGNAL_TIMEFRAME", "M15");
    let generation_interval = env_secs("GENERATION_INTERVAL_SECS", 900);
    let outcome_interval = env_secs("OUTCOME_INTERVAL_SECS", 300);
    info!(%symbol, %timeframe, "signal pair configured");

    let provider: Arc<dyn MarketDataProvider> = Arc::new(TwelveDataClient::from_env());

    let (events_tx, _) = broadcast::channel::<SignalEvent>(256);

    let telegram_configured =
        env::var("TELEGRAM_BOT_TOKEN").is_ok() && env::var("TELEGRAM_CHAT_ID").is_ok();
    if telegram_configured {
        let telegram_svc = TelegramService::from_env();
        let telegram_rx = events_tx.subscribe();
        tokio::spawn(telegram_svc.start(telegram_rx));
    } else {
        warn!("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID missing, notifications disabled");
    }

    let mut supervisor = Supervisor::new();

    let gen_pool = pool.clone();
    let gen_ledger = ledger.clone();
    let gen_provider = provider.clone();
    let gen_tx = events_tx.clone();
    let gen_symbol = symbol.clone();
    let gen_timeframe = timeframe.clone();
    supervisor.register_actor(
        ActorType::GenerationActor,
        Box::new(move || {
            Box::new(GenerationService::new(
                gen_symbol.clone(),
                gen_timeframe.clone(),
                gen_provider.clone(),
                DailySignalLimiter::new(gen_pool.clone()),
                DispatchGuard::new(gen_pool.clone()),
                gen_ledger.clone(),
                gen_tx.clone(),
                generation_interval,
            ))
        }),
    );

    let out_ledger = ledger.clone();
    let out_provider = provider.clone();
    let out_tx = events_tx.clone();
    supervisor.register_actor(
        ActorType::OutcomeActor,
        Box::new(move || {
            Box::new(OutcomeService::new(
                out_ledger.clone(),
                out_provider.clone(),
                out_tx.clone(),
                outcome_interval,
            ))
        }),
    );

    supervisor.start().await;
    Ok(())
}
