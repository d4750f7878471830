pub mod telegram;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat identifier as delivered by the Bot API: numeric for groups and
/// channels, `@username` strings when addressing public channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Int(i64),
    Str(String),
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatId::Int(id) => write!(f, "{}", id),
            ChatId::Str(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A chat message, reduced to the fields the bridge reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    /// Unix seconds. Telegram reports `0` for messages that are no longer
    /// accessible to the bot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Message {
    pub fn is_inaccessible(&self) -> bool {
        self.date == Some(0)
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.date
            .filter(|secs| *secs != 0)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// One entry of a `getUpdates` batch or one webhook delivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_post: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_channel_post: Option<Message>,
}

type SlotExtractor = fn(&Update) -> Option<&Message>;

fn new_message(update: &Update) -> Option<&Message> {
    update.message.as_ref()
}

fn channel_post(update: &Update) -> Option<&Message> {
    update.channel_post.as_ref()
}

fn edited_message(update: &Update) -> Option<&Message> {
    update.edited_message.as_ref()
}

fn edited_channel_post(update: &Update) -> Option<&Message> {
    update.edited_channel_post.as_ref()
}

/// Slots in priority order; the first present one represents the update.
const MESSAGE_SLOTS: [SlotExtractor; 4] = [
    new_message,
    channel_post,
    edited_message,
    edited_channel_post,
];

/// Pick the representative message of an update, if it carries any.
pub fn pick_message(update: &Update) -> Option<&Message> {
    MESSAGE_SLOTS.iter().find_map(|slot| slot(update))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Trimmed text of the representative message, falling back to its caption.
/// Blank text is treated as missing.
pub fn extract_text(update: &Update) -> Option<String> {
    let message = pick_message(update)?;
    non_blank(message.text.as_deref())
        .or_else(|| non_blank(message.caption.as_deref()))
        .map(str::to_string)
}
