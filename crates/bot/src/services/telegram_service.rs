use std::env;

use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio::sync::broadcast;
use tracing::{error, info};

use common::models::SignalEvent;

use crate::services::formatter;

pub struct TelegramService {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramService {
    pub fn from_env() -> Self {
        // Only constructed when both variables are known to be set; a broken
        // value at startup should crash loudly.
        let token = env::var("TELEGRAM_BOT_TOKEN").expect("TELEGRAM_BOT_TOKEN not set in .env");
        let chat_id_str = env::var("TELEGRAM_CHAT_ID").expect("TELEGRAM_CHAT_ID not set in .env");
        let chat_id = chat_id_str
            .parse::<i64>()
            .expect("TELEGRAM_CHAT_ID must be a number");

        Self {
            bot: Bot::new(token),
            chat_id: ChatId(chat_id),
        }
    }

    pub async fn start(self, mut rx: broadcast::Receiver<SignalEvent>) {
        info!("Starting Telegram Notification Service");

        loop {
            match rx.recv().await {
                Ok(event) => {
                    let msg = formatter::render_event(&event);
                    if let Err(e) = self
                        .bot
                        .send_message(self.chat_id, msg)
                        .parse_mode(ParseMode::Html)
                        .await
                    {
                        error!("Failed to send Telegram message: {}", e);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    error!("Telegram service lagged behind. Missed {} events.", n);
                }
                Err(_) => {
                    info!("Signal event channel closed. Stopping service.");
                    break;
                }
            }
        }
    }
}
