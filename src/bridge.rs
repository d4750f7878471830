use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::llm::LlmClient;
use crate::pipeline::{self, BatchSettings, Collaborators, ProcessingResult, UpdateSource};
use crate::platform::telegram::TelegramClient;
use crate::platform::{ChatId, Update};
use crate::wordpress::{NewPost, PublishedPost, WordPressClient};

/// The live collaborators: Telegram in, LLM in the middle, WordPress out.
pub struct Bridge {
    telegram: TelegramClient,
    llm: LlmClient,
    wordpress: WordPressClient,
    settings: BatchSettings,
}

impl Bridge {
    pub fn new(config: &Config) -> Self {
        Self {
            telegram: TelegramClient::new(&config.telegram.bot_token),
            llm: LlmClient::new(config.llm.clone()),
            wordpress: WordPressClient::new(config.wordpress.clone()),
            settings: BatchSettings {
                fetch_limit: config.telegram.fetch_limit,
                target_chat_id: config.telegram.chat_id.clone(),
                post_status: config.wordpress.post_status.clone(),
            },
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Fetch pending updates and turn them into posts.
    pub async fn run_once(&self) -> Result<ProcessingResult> {
        pipeline::run_once(self, self, &self.settings).await
    }
}

#[async_trait]
impl UpdateSource for Bridge {
    async fn fetch_updates(&self, limit: u8) -> Result<Vec<Update>> {
        self.telegram.fetch_updates(limit).await
    }
}

#[async_trait]
impl Collaborators for Bridge {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.llm.generate_post(prompt).await
    }

    async fn publish(&self, post: &NewPost) -> Result<PublishedPost> {
        self.wordpress.create_post(post).await
    }

    async fn delete_message(&self, chat_id: &ChatId, message_id: i64) -> Result<()> {
        self.telegram.delete_message(chat_id, message_id).await
    }

    async fn acknowledge(&self, next_offset: i64) -> Result<()> {
        self.telegram.acknowledge(next_offset).await
    }
}
