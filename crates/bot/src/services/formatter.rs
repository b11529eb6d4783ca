use common::models::{Direction, EventKind, Signal, SignalEvent};
use engine::classify;

/// Renders a signal event as a Telegram HTML message.
pub fn render_event(event: &SignalEvent) -> String {
    match event.kind {
        EventKind::Created => render_signal_card(&event.signal),
        EventKind::ClosedWin => render_outcome(&event.signal, "✅ <b>CLOSED WIN</b>"),
        EventKind::ClosedLoss => render_outcome(&event.signal, "❌ <b>CLOSED LOSS</b>"),
        EventKind::ClosedExpired => render_outcome(&event.signal, "⌛ <b>CLOSED EXPIRED</b>"),
    }
}

fn render_signal_card(signal: &Signal) -> String {
    let (emoji, verb) = match signal.direction {
        Direction::Buy => ("🟢", "BUY"),
        Direction::Sell => ("🔴", "SELL"),
    };
    format!(
        "{emoji} <b>{verb} SIGNAL</b> {emoji}\n\
         \n\
         🆔 <code>{id}</code>\n\
         📊 {symbol} | {timeframe}\n\
         \n\
         💰 Entry: <code>{entry:.5}</code>\n\
         🎯 Take Profit: <code>{tp:.5}</code>\n\
         🛑 Stop Loss: <code>{sl:.5}</code>\n\
         \n\
         📈 Confidence: <b>{confidence}%</b> ({tier})\n\
         🧠 Strategy: {strategy}\n\
         ⏳ Expires: {expires} UTC\n\
         \n\
         <i>Not financial advice.</i>",
        id = signal.id,
        symbol = signal.symbol,
        timeframe = signal.timeframe,
        entry = signal.entry,
        tp = signal.take_profit,
        sl = signal.stop_loss,
        confidence = signal.confidence,
        tier = classify(signal.confidence).label,
        strategy = signal.strategy,
        expires = signal.expires_at.format("%H:%M"),
    )
}

fn render_outcome(signal: &Signal, headline: &str) -> String {
    let pips_line = match signal.pips {
        Some(pips) => format!("📏 Pips: <b>{pips:+.1}</b>\n"),
        None => String::new(),
    };
    format!(
        "{headline}\n\
         \n\
         🆔 <code>{id}</code>\n\
         📊 {symbol} | {timeframe}\n\
         {pips_line}\
         🏁 Result: {result}",
        id = signal.id,
        symbol = signal.symbol,
        timeframe = signal.timeframe,
        result = signal.result.as_deref().unwrap_or("UNKNOWN"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::models::{SignalStatus, Tier};

    fn sample_signal() -> Signal {
        let created = Utc.with_ymd_and_hms(2026, 8, 30, 14, 15, 2).unwrap();
        Signal {
            id: "SIG-EURUSD-20260830-141502".to_string(),
            symbol: "EUR/USD".to_string(),
            timeframe: "M15".to_string(),
            direction: Direction::Buy,
            entry: 1.0850,
            take_profit: 1.0900,
            stop_loss: 1.0800,
            confidence: 88,
            tier: Tier::High,
            strategy: "EMA Trend + RSI + ATR".to_string(),
            status: SignalStatus::Created,
            created_at: created,
            opened_at: None,
            closed_at: None,
            expires_at: created + chrono::Duration::minutes(45),
            result: None,
            pips: None,
        }
    }

    #[test]
    fn test_signal_card_contains_levels_and_tier() {
        let msg = render_event(&SignalEvent::new(EventKind::Created, sample_signal()));
        assert!(msg.contains("🟢 <b>BUY SIGNAL</b>"));
        assert!(msg.contains("<code>SIG-EURUSD-20260830-141502</code>"));
        assert!(msg.contains("Entry: <code>1.08500</code>"));
        assert!(msg.contains("Take Profit: <code>1.09000</code>"));
        assert!(msg.contains("Stop Loss: <code>1.08000</code>"));
        assert!(msg.contains("Confidence: <b>88%</b> (High Confidence)"));
        assert!(msg.contains("Not financial advice"));
    }

    #[test]
    fn test_sell_card_uses_red_marker() {
        let mut signal = sample_signal();
        signal.direction = Direction::Sell;
        let msg = render_event(&SignalEvent::new(EventKind::Created, signal));
        assert!(msg.contains("🔴 <b>SELL SIGNAL</b>"));
    }

    #[test]
    fn test_win_outcome_shows_signed_pips() {
        let mut signal = sample_signal();
        signal.status = SignalStatus::TpHit;
        signal.result = Some("WIN".to_string());
        signal.pips = Some(50.0);
        let msg = render_event(&SignalEvent::new(EventKind::ClosedWin, signal));
        assert!(msg.contains("✅ <b>CLOSED WIN</b>"));
        assert!(msg.contains("Pips: <b>+50.0</b>"));
        assert!(msg.contains("Result: WIN"));
    }

    #[test]
    fn test_loss_outcome_shows_negative_pips() {
        let mut signal = sample_signal();
        signal.status = SignalStatus::SlHit;
        signal.result = Some("LOSS".to_string());
        signal.pips = Some(-50.0);
        let msg = render_event(&SignalEvent::new(EventKind::ClosedLoss, signal));
        assert!(msg.contains("Pips: <b>-50.0</b>"));
    }

    #[test]
    fn test_expired_outcome_omits_pips_line() {
        let mut signal = sample_signal();
        signal.status = SignalStatus::Expired;
        signal.result = Some("NO_TRADE".to_string());
        let msg = render_event(&SignalEvent::new(EventKind::ClosedExpired, signal));
        assert!(msg.contains("⌛ <b>CLOSED EXPIRED</b>"));
        assert!(!msg.contains("Pips:"));
        assert!(msg.contains("Result: NO_TRADE"));
    }
}
