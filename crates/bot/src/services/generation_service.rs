use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tracing::{info, warn};
use uuid::Uuid;

use common::actors::{Actor, ActorType, ControlMessage};
use common::models::{EventKind, Freshness, Signal, SignalEvent};
use market_data::MarketDataProvider;
use storage::SignalLedger;

use crate::services::daily_limiter::DailySignalLimiter;
use crate::services::dispatch_guard::DispatchGuard;

/// Candle history depth requested per cycle. Enough for the slow EMA
/// plus warmup.
const CANDLE_LIMIT: usize = 60;

/// Maps an internal timeframe label to the provider's interval string.
pub fn interval_for(timeframe: &str) -> &'static str {
    match timeframe {
        "M1" => "1min",
        "M5" => "5min",
        "M15" => "15min",
        "M30" => "30min",
        "H1" => "1h",
        "H4" => "4h",
        "D1" => "1day",
        _ => "15min",
    }
}

/// Periodically produces at most one signal per day for its pair and
/// pushes dispatch-approved ones onto the event bus.
pub struct GenerationService {
    id: Uuid,
    symbol: String,
    timeframe: String,
    provider: Arc<dyn MarketDataProvider>,
    limiter: DailySignalLimiter,
    guard: DispatchGuard,
    ledger: SignalLedger,
    events_tx: broadcast::Sender<SignalEvent>,
    interval: Duration,
}

#[async_trait]
impl Actor for GenerationService {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::GenerationActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        let _heartbeat_handle = self.spawn_heartbeat(supervisor_tx);
        info!(
            symbol = %self.symbol,
            timeframe = %self.timeframe,
            interval_secs = self.interval.as_secs(),
            "Starting Signal Generation Service"
        );

        let mut interval = time::interval(self.interval);
        loop {
            interval.tick().await;
            match self.run_cycle().await {
                Ok((signal, freshness)) => {
                    info!(id = %signal.id, ?freshness, confidence = signal.confidence, "cycle complete");
                }
                Err(e) => {
                    warn!("generation cycle failed: {e:#}");
                }
            }
        }
    }
}

impl GenerationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: String,
        timeframe: String,
        provider: Arc<dyn MarketDataProvider>,
        limiter: DailySignalLimiter,
        guard: DispatchGuard,
        ledger: SignalLedger,
        events_tx: broadcast::Sender<SignalEvent>,
        interval: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol,
            timeframe,
            provider,
            limiter,
            guard,
            ledger,
            events_tx,
            interval,
        }
    }

    /// One generation pass: fetch candles, generate or replay today's
    /// signal, and dispatch fresh ones past the guard.
    pub async fn run_cycle(&self) -> anyhow::Result<(Signal, Freshness)> {
        let symbol = self.symbol.clone();
        let timeframe = self.timeframe.clone();
        let provider = Arc::clone(&self.provider);

        let (signal, freshness) = self
            .limiter
            .get_or_generate(&self.symbol, &self.timeframe, || async move {
                let candles = match provider
                    .fetch_candles(&symbol, interval_for(&timeframe), CANDLE_LIMIT)
                    .await
                {
                    Ok(candles) => candles,
                    Err(e) => {
                        // The stabilizer path handles an empty history.
                        warn!("candle fetch failed, generating without history: {e}");
                        Vec::new()
                    }
                };
                Ok(engine::generate(&candles, &symbol, &timeframe, Utc::now()))
            })
            .await?;

        if freshness == Freshness::Fresh && self.guard.should_dispatch(&signal).await? {
            // Delivery is fire and forget; a missing subscriber is not an error.
            let _ = self
                .events_tx
                .send(SignalEvent::new(EventKind::Created, signal.clone()));
        }

        match self.ledger.stats().await {
            Ok(stats) => info!(stats = %serde_json::to_string(&stats)?, "ledger snapshot"),
            Err(e) => warn!("failed to read ledger stats: {e}"),
        }

        Ok((signal, freshness))
    }
}
