use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::WordPressConfig;

/// Body of a `POST /wp-json/wp/v2/posts` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub status: String,
}

/// The part of the created post the bridge reports back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublishedPost {
    pub id: u64,
    #[serde(default)]
    pub link: Option<String>,
}

pub struct WordPressClient {
    client: reqwest::Client,
    config: WordPressConfig,
}

impl WordPressClient {
    pub fn new(config: WordPressConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn posts_endpoint(&self) -> String {
        format!("{}/wp-json/wp/v2/posts", self.config.base_url)
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<PublishedPost> {
        let url = self.posts_endpoint();
        debug!("Creating WordPress post '{}' at {}", post.title, url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.application_password))
            .header("Accept", "application/json")
            .json(post)
            .send()
            .await
            .context("Failed to send request to WordPress")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "WordPress post creation failed with status {}: {}",
                status,
                error_body
            );
        }

        response
            .json()
            .await
            .context("Failed to parse WordPress response")
    }
}
