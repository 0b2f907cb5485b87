use crate::config::{DiscordConfig, DEFAULT_API_BASE};
use crate::error::{Error, Result};
use crate::types::{ApiErrorBody, Channel, CreateMessage, Message, RateLimited};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Discord requires bots to identify themselves with this format
const USER_AGENT: &str = concat!(
    "DiscordBot (",
    env!("CARGO_PKG_REPOSITORY"),
    ", ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Longest rate-limit wait honoured before giving up
const MAX_RETRY_AFTER_SECS: f64 = 60.0;

/// Minimal async client for the Discord REST API, authenticated as a bot
pub struct DiscordClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    max_retries: u32,
}

impl DiscordClient {
    /// Client against the public Discord API
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_API_BASE)
    }

    /// Client against a custom base URL (proxies, tests)
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    pub fn from_config(config: &DiscordConfig) -> Result<Self> {
        Self::with_base_url(config.token.clone(), config.api_base.clone())
    }

    /// How many times a rate-limited request is retried
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// `GET /channels/{channel_id}`
    pub async fn get_channel(&self, channel_id: &str) -> Result<Channel> {
        let path = format!("/channels/{}", channel_id);
        match self.request(Method::GET, &path, None).await {
            Err(Error::Api { status: 404, .. }) => {
                Err(Error::ChannelNotFound(channel_id.to_string()))
            }
            other => other,
        }
    }

    /// Post a plain text message
    pub async fn send_message(&self, channel_id: &str, content: &str) -> Result<Message> {
        self.create_message(channel_id, &CreateMessage::text(content))
            .await
    }

    /// Post a message that carries a poll
    pub async fn create_poll(&self, channel_id: &str, body: &CreateMessage) -> Result<Message> {
        let message = self.create_message(channel_id, body).await?;
        if message.poll.is_none() {
            debug!(message_id = %message.id, "poll creation response did not echo the poll");
        }
        Ok(message)
    }

    /// `POST /channels/{channel_id}/messages`
    pub async fn create_message(&self, channel_id: &str, body: &CreateMessage) -> Result<Message> {
        let path = format!("/channels/{}/messages", channel_id);
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, &path, Some(&body)).await
    }

    /// End a poll immediately
    pub async fn expire_poll(&self, channel_id: &str, message_id: &str) -> Result<Message> {
        let path = format!("/channels/{}/polls/{}/expire", channel_id, message_id);
        self.request(Method::POST, &path, None).await
    }

    /// `GET /channels/{channel_id}/messages/{message_id}`
    pub async fn get_message(&self, channel_id: &str, message_id: &str) -> Result<Message> {
        let path = format!("/channels/{}/messages/{}", channel_id, message_id);
        self.request(Method::GET, &path, None).await
    }

    /// Send a request, retrying on 429 and decoding the JSON response
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;

        loop {
            let mut builder = self
                .http
                .request(method.clone(), &url)
                .header(AUTHORIZATION, format!("Bot {}", self.token));

            builder = match body {
                Some(json) => builder.json(json),
                // Discord rejects body-less POSTs without a content length
                None if method != Method::GET => builder.body(""),
                None => builder,
            };

            debug!(%method, path, attempt, "discord request");
            let response = builder.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS && attempt < self.max_retries {
                let text = response.text().await.unwrap_or_default();
                let Some(wait) = retry_after(&text) else {
                    warn!(path, "rate limit wait exceeds the retry cap, giving up");
                    return Err(Error::Api {
                        status: status.as_u16(),
                        message: error_message(status, &text),
                    });
                };
                warn!(
                    path,
                    retry_after_secs = wait.as_secs_f64(),
                    attempt = attempt + 1,
                    "rate limited by Discord, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            let text = response.text().await?;

            if !status.is_success() {
                return Err(Error::Api {
                    status: status.as_u16(),
                    message: error_message(status, &text),
                });
            }

            return Ok(serde_json::from_str(&text)?);
        }
    }
}

/// Wait time from a 429 body, defaulting to one second.
/// `None` when Discord asks for longer than [`MAX_RETRY_AFTER_SECS`].
fn retry_after(body: &str) -> Option<Duration> {
    let secs = serde_json::from_str::<RateLimited>(body)
        .map(|r| r.retry_after)
        .unwrap_or(1.0);

    if !secs.is_finite() || secs > MAX_RETRY_AFTER_SECS {
        return None;
    }
    Some(Duration::from_secs_f64(secs.max(0.0)))
}

/// Discord's error message when the body has one, the raw body or reason phrase otherwise
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        if !parsed.message.is_empty() {
            return parsed.message;
        }
    }
    if !body.trim().is_empty() {
        return body.trim().to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}
