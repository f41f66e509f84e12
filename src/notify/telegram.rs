//! Thin client for the Telegram Bot API.

use serde::{Deserialize, Serialize};

use super::NotifyError;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramApi {
    client: reqwest::Client,
    token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Envelope every Bot API response is wrapped in.
#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramApi {
    pub fn new(token: String, chat_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            chat_id,
        }
    }

    /// Send one text message to the configured chat.
    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API_BASE, self.token);
        let body = SendMessageBody {
            chat_id: &self.chat_id,
            text,
        };

        let response: ApiResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(NotifyError::Api {
                code: response.error_code.unwrap_or_default(),
                description: response.description.unwrap_or_default(),
            });
        }

        Ok(())
    }
}
