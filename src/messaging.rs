//! Client for the team broadcast stream.
//!
//! Worklog and review-request messages go to a message stream over its
//! REST API. Credentials live outside the repo in the user's config
//! directory; nothing here is loaded until a message is actually posted,
//! so purely local commands never require them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::error::GitxError;

/// `~/.config/gitx/credentials.yml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Host of the message stream, e.g. `stream.example.com`.
    pub domain: String,
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub async fn load() -> Result<Self> {
        let path = Self::credentials_path()?;
        let contents = fs::read_to_string(&path).await.with_context(|| {
            format!(
                "Failed to read credentials from {} (create it with domain, user and password keys)",
                path.display()
            )
        })?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials file {}", path.display()))
    }

    fn credentials_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("gitx");
        Ok(config_dir.join("credentials.yml"))
    }
}

/// Optional structured fields attached to a broadcast message.
#[derive(Debug, Clone, Default)]
pub struct MessageParams {
    pub url: Option<String>,
    pub message_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostedMessageEnvelope {
    message: PostedMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostedMessage {
    pub permalink_url: String,
}

#[derive(Debug)]
pub struct MessageClient {
    client: reqwest::Client,
    credentials: Credentials,
}

impl MessageClient {
    pub async fn load() -> Result<Self> {
        let credentials = Credentials::load().await?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("gitx/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            credentials,
        })
    }

    /// Post one message to the stream and return its permalink.
    pub async fn post(&self, body: &str, params: &MessageParams) -> Result<PostedMessage> {
        let url = format!("https://{}/api/messages.json", self.credentials.domain);
        let payload = serde_json::json!({
            "message": {
                "body": body,
                "url": params.url,
                "message_type": params.message_type,
            }
        });

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.credentials.user, Some(&self.credentials.password))
            .json(&payload)
            .send()
            .await
            .context("Failed to reach the message stream")?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(GitxError::MessagePostFailed {
                message: format!("status {status}: {detail}"),
            }
            .into());
        }

        let envelope: PostedMessageEnvelope = response
            .json()
            .await
            .context("Failed to parse message response")?;
        Ok(envelope.message)
    }
}
