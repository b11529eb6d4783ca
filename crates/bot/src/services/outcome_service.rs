use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::actors::{Actor, ActorType, ControlMessage};
use common::models::{Direction, EventKind, Signal, SignalEvent, SignalStatus};
use market_data::MarketDataProvider;
use storage::{SignalLedger, TransitionOutcome};

/// Watches every OPEN signal and advances its state machine against the
/// live price. A failed price fetch abandons the whole tick; nothing is
/// mutated and the next tick retries.
pub struct OutcomeService {
    id: Uuid,
    ledger: SignalLedger,
    provider: Arc<dyn MarketDataProvider>,
    events_tx: broadcast::Sender<SignalEvent>,
    interval: Duration,
}

#[async_trait]
impl Actor for OutcomeService {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::OutcomeActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        let _heartbeat_handle = self.spawn_heartbeat(supervisor_tx);
        info!(interval_secs = self.interval.as_secs(), "Starting Outcome Monitor");

        let mut interval = time::interval(self.interval);
        loop {
            interval.tick().await;
            if let Err(e) = self.check_outcomes().await {
                warn!("outcome tick aborted: {e:#}");
            }
        }
    }
}

impl OutcomeService {
    pub fn new(
        ledger: SignalLedger,
        provider: Arc<dyn MarketDataProvider>,
        events_tx: broadcast::Sender<SignalEvent>,
        interval: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ledger,
            provider,
            events_tx,
            interval,
        }
    }

    /// One monitoring pass over all OPEN signals.
    pub async fn check_outcomes(&self) -> anyhow::Result<()> {
        let open = self.ledger.list_by_status(SignalStatus::Open).await?;
        if open.is_empty() {
            debug!("no open signals to check");
            return Ok(());
        }

        // Fetch every needed quote up front; any failure aborts the tick
        // before a single record is touched.
        let symbols: BTreeSet<&str> = open.iter().map(|s| s.symbol.as_str()).collect();
        let mut prices: HashMap<String, f64> = HashMap::new();
        for symbol in symbols {
            let price = self.provider.fetch_current_price(symbol).await?;
            debug!(symbol, price, "current quote");
            prices.insert(symbol.to_string(), price);
        }

        let now = Utc::now();
        for signal in &open {
            let Some(&price) = prices.get(&signal.symbol) else {
                continue;
            };
            self.settle(signal, price, now).await?;
        }
        Ok(())
    }

    async fn settle(&self, signal: &Signal, price: f64, now: DateTime<Utc>) -> anyhow::Result<()> {
        // Expiry always wins over a simultaneous price touch.
        if now > signal.expires_at {
            let outcome = TransitionOutcome {
                result: Some("NO_TRADE".to_string()),
                pips: None,
            };
            if self
                .ledger
                .transition(&signal.id, SignalStatus::Expired, outcome)
                .await?
            {
                info!(id = %signal.id, "signal expired without a trade");
                self.emit(signal, SignalStatus::Expired, EventKind::ClosedExpired, "NO_TRADE", None, now);
            }
            return Ok(());
        }

        let (hit_tp, hit_sl) = match signal.direction {
            Direction::Buy => (price >= signal.take_profit, price <= signal.stop_loss),
            Direction::Sell => (price <= signal.take_profit, price >= signal.stop_loss),
        };

        if hit_tp {
            let pips = pips_between(signal.take_profit, signal.entry);
            let outcome = TransitionOutcome {
                result: Some("WIN".to_string()),
                pips: Some(pips),
            };
            if self
                .ledger
                .transition(&signal.id, SignalStatus::TpHit, outcome)
                .await?
            {
                info!(id = %signal.id, pips, "take profit hit");
                self.emit(signal, SignalStatus::TpHit, EventKind::ClosedWin, "WIN", Some(pips), now);
            }
        } else if hit_sl {
            let pips = -pips_between(signal.stop_loss, signal.entry);
            let outcome = TransitionOutcome {
                result: Some("LOSS".to_string()),
                pips: Some(pips),
            };
            if self
                .ledger
                .transition(&signal.id, SignalStatus::SlHit, outcome)
                .await?
            {
                info!(id = %signal.id, pips, "stop loss hit");
                self.emit(signal, SignalStatus::SlHit, EventKind::ClosedLoss, "LOSS", Some(pips), now);
            }
        }
        Ok(())
    }

    fn emit(
        &self,
        signal: &Signal,
        status: SignalStatus,
        kind: EventKind,
        result: &str,
        pips: Option<f64>,
        closed_at: DateTime<Utc>,
    ) {
        let mut snapshot = signal.clone();
        snapshot.status = status;
        snapshot.result = Some(result.to_string());
        snapshot.pips = pips;
        snapshot.closed_at = Some(closed_at);
        // Nobody listening is fine; delivery never feeds back here.
        let _ = self.events_tx.send(SignalEvent::new(kind, snapshot));
    }
}

/// Scaled price difference, one decimal: |target - entry| * 10^4.
fn pips_between(target: f64, entry: f64) -> f64 {
    ((target - entry).abs() * 10_000.0 * 10.0).round() / 10.0
}
