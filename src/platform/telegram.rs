use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use teloxide::payloads::GetUpdatesSetters;
use teloxide::requests::Requester;
use teloxide::types::{MessageId, Recipient};
use teloxide::Bot;
use tracing::{debug, warn};

use crate::platform::{ChatId, Update};

const ALLOWED_UPDATES: [&str; 4] = [
    "message",
    "channel_post",
    "edited_message",
    "edited_channel_post",
];

/// Bot API envelope: `{"ok": true, "result": ...}` or `{"ok": false, "description": ...}`.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Vec<Value>>,
    #[serde(default)]
    description: Option<String>,
}

/// Bot API access for the polling side of the bridge.
///
/// Updates are read as raw JSON into [`Update`] so every message kind keeps
/// its `text`/`caption` exactly as Telegram sent it; deletes and offset
/// commits go through teloxide.
pub struct TelegramClient {
    bot: Bot,
    client: reqwest::Client,
    bot_token: String,
    api_base: String,
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> Self {
        Self {
            bot: Bot::new(bot_token),
            client: reqwest::Client::new(),
            bot_token: bot_token.to_string(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }

    /// Fetch the pending (unacknowledged) updates, oldest first.
    pub async fn fetch_updates(&self, limit: u8) -> Result<Vec<Update>> {
        let url = format!("{}/bot{}/getUpdates", self.api_base, self.bot_token);
        let body = json!({
            "limit": limit,
            "allowed_updates": ALLOWED_UPDATES,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to fetch Telegram updates")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read Telegram getUpdates response")?;
        if !status.is_success() {
            anyhow::bail!("Telegram getUpdates failed with status {}: {}", status, text);
        }

        let updates = parse_updates(&text)?;
        debug!("Fetched {} Telegram update(s)", updates.len());
        Ok(updates)
    }

    pub async fn delete_message(&self, chat_id: &ChatId, message_id: i64) -> Result<()> {
        let message_id = i32::try_from(message_id)
            .with_context(|| format!("Message id {} out of range", message_id))?;

        self.bot
            .delete_message(recipient(chat_id), MessageId(message_id))
            .await
            .with_context(|| format!("Failed to delete message {} in chat {}", message_id, chat_id))?;
        Ok(())
    }

    /// Confirm every update below `next_offset` so Telegram stops returning it.
    pub async fn acknowledge(&self, next_offset: i64) -> Result<()> {
        let offset = i32::try_from(next_offset)
            .with_context(|| format!("Update offset {} out of range", next_offset))?;

        self.bot
            .get_updates()
            .offset(offset)
            .limit(1u8)
            .timeout(0u32)
            .await
            .with_context(|| format!("Failed to acknowledge updates up to offset {}", next_offset))?;
        Ok(())
    }
}

/// Decode a `getUpdates` response body.
///
/// An entry that does not match the [`Update`] shape keeps only its
/// `update_id`, so it is skipped and acknowledged like an update without a
/// message instead of failing the whole batch.
fn parse_updates(body: &str) -> Result<Vec<Update>> {
    let response: ApiResponse =
        serde_json::from_str(body).context("Failed to parse Telegram getUpdates response")?;

    if !response.ok {
        anyhow::bail!(
            "Telegram getUpdates failed: {}",
            response.description.unwrap_or_default()
        );
    }

    let mut updates = Vec::new();
    for raw in response.result.unwrap_or_default() {
        let update_id = raw
            .get("update_id")
            .and_then(Value::as_i64)
            .context("Telegram update without update_id")?;

        match serde_json::from_value::<Update>(raw) {
            Ok(update) => updates.push(update),
            Err(e) => {
                warn!(update_id, "Unreadable Telegram update: {}", e);
                updates.push(Update {
                    update_id,
                    ..Default::default()
                });
            }
        }
    }
    Ok(updates)
}

fn recipient(chat_id: &ChatId) -> Recipient {
    match chat_id {
        ChatId::Int(id) => Recipient::Id(teloxide::types::ChatId(*id)),
        ChatId::Str(username) => Recipient::ChannelUsername(username.clone()),
    }
}
