pub mod title;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::platform::{extract_text, pick_message, ChatId, Message, Update};
use crate::wordpress::{NewPost, PublishedPost};

pub use title::build_title;

/// Downstream operations the batch processor drives, one update at a time.
#[async_trait]
pub trait Collaborators: Send + Sync {
    /// Turn the message text into article content.
    async fn generate(&self, prompt: &str) -> Result<String>;
    async fn publish(&self, post: &NewPost) -> Result<PublishedPost>;
    async fn delete_message(&self, chat_id: &ChatId, message_id: i64) -> Result<()>;
    /// Commit the cursor: every update below `next_offset` is done.
    async fn acknowledge(&self, next_offset: i64) -> Result<()>;
}

/// Where batches come from.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn fetch_updates(&self, limit: u8) -> Result<Vec<Update>>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingResult {
    pub processed: usize,
    pub skipped: usize,
    pub acknowledged_offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoMessage,
    Inaccessible,
    UnexpectedChat,
    NoText,
}

impl SkipReason {
    pub fn log_message(self) -> &'static str {
        match self {
            SkipReason::NoMessage => "Skipping update without message payload.",
            SkipReason::Inaccessible => "Skipping inaccessible message.",
            SkipReason::UnexpectedChat => "Skipping update from unexpected chat.",
            SkipReason::NoText => "Skipping message without text content.",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoMessage => write!(f, "no message payload"),
            SkipReason::Inaccessible => write!(f, "inaccessible message"),
            SkipReason::UnexpectedChat => write!(f, "unexpected chat"),
            SkipReason::NoText => write!(f, "no text content"),
        }
    }
}

/// Outcome of checking one update against the skip rules.
#[derive(Debug)]
pub enum Decision<'a> {
    Skip(SkipReason),
    Process { message: &'a Message, text: String },
}

/// Apply the skip rules in order; the first one that matches wins.
pub fn classify<'a>(update: &'a Update, target_chat_id: &str) -> Decision<'a> {
    let Some(message) = pick_message(update) else {
        return Decision::Skip(SkipReason::NoMessage);
    };
    if message.is_inaccessible() {
        return Decision::Skip(SkipReason::Inaccessible);
    }
    if message.chat.id.to_string() != target_chat_id {
        return Decision::Skip(SkipReason::UnexpectedChat);
    }
    match extract_text(update) {
        Some(text) => Decision::Process { message, text },
        None => Decision::Skip(SkipReason::NoText),
    }
}

/// Generate, title and publish a post for `text`.
pub async fn create_post<C>(ops: &C, text: &str, post_status: &str) -> Result<PublishedPost>
where
    C: Collaborators + ?Sized,
{
    let content = ops.generate(text).await?;
    let post = NewPost {
        title: build_title(text),
        content,
        status: post_status.to_string(),
    };
    ops.publish(&post).await
}

async fn process_message<C>(
    ops: &C,
    message: &Message,
    text: &str,
    post_status: &str,
) -> Result<PublishedPost>
where
    C: Collaborators + ?Sized,
{
    let post = create_post(ops, text, post_status).await?;
    ops.delete_message(&message.chat.id, message.message_id)
        .await?;
    Ok(post)
}

/// Process a batch in arrival order and acknowledge what was handled.
///
/// Skipped and processed updates both advance the cursor to `update_id + 1`.
/// The first failing generate/publish/delete stops the batch without
/// advancing past the failing update, so it is fetched again on the next run.
/// The cursor is then acknowledged once; an acknowledgment failure is only
/// logged and never changes the returned counts.
pub async fn process_updates<C>(
    updates: &[Update],
    target_chat_id: &str,
    post_status: &str,
    ops: &C,
) -> ProcessingResult
where
    C: Collaborators + ?Sized,
{
    let mut result = ProcessingResult::default();
    let mut cursor: Option<i64> = None;

    for update in updates {
        let update_id = update.update_id;

        match classify(update, target_chat_id) {
            Decision::Skip(reason) => {
                info!(update_id, reason = %reason, "{}", reason.log_message());
                result.skipped += 1;
                cursor = Some(update_id + 1);
            }
            Decision::Process { message, text } => {
                debug!(
                    update_id,
                    chat_id = %message.chat.id,
                    message_id = message.message_id,
                    sent_at = ?message.sent_at(),
                    "Processing message"
                );

                match process_message(ops, message, &text, post_status).await {
                    Ok(post) => {
                        result.processed += 1;
                        cursor = Some(update_id + 1);
                        info!(
                            update_id,
                            post_id = post.id,
                            post_url = post.link.as_deref().unwrap_or(""),
                            "Published post and removed source message."
                        );
                    }
                    Err(e) => {
                        error!(
                            update_id,
                            chat_id = %message.chat.id,
                            message_id = message.message_id,
                            "Failed to process update, stopping batch: {:#}",
                            e
                        );
                        break;
                    }
                }
            }
        }
    }

    if let Some(offset) = cursor {
        match ops.acknowledge(offset).await {
            Ok(()) => debug!(offset, "Acknowledged updates"),
            Err(e) => error!(offset, "Failed to acknowledge updates: {:#}", e),
        }
    }

    result.acknowledged_offset = cursor;
    result
}

/// Batch-level settings taken from the configuration.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub fetch_limit: u8,
    pub target_chat_id: String,
    pub post_status: String,
}

/// One polling pass: fetch a batch and hand it to [`process_updates`].
pub async fn run_once<S, C>(source: &S, ops: &C, settings: &BatchSettings) -> Result<ProcessingResult>
where
    S: UpdateSource + ?Sized,
    C: Collaborators + ?Sized,
{
    let updates = source.fetch_updates(settings.fetch_limit).await?;

    if updates.is_empty() {
        info!("No Telegram updates to process.");
        return Ok(ProcessingResult::default());
    }

    let result = process_updates(
        &updates,
        &settings.target_chat_id,
        &settings.post_status,
        ops,
    )
    .await;

    info!(
        processed = result.processed,
        skipped = result.skipped,
        acknowledged_offset = ?result.acknowledged_offset,
        "Finished processing {} update(s)",
        updates.len()
    );

    Ok(result)
}
