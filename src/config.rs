use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;

/// Default config written when none exists yet
pub const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../assets/config.yml");

/// Default Discord REST base URL
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// Environment variable overriding `discord.token`
pub const TOKEN_ENV: &str = "DISCORDPOLL_TOKEN";

/// Environment variable overriding `discord.channelId`
pub const CHANNEL_ID_ENV: &str = "DISCORDPOLL_CHANNEL_ID";

/// Discord limits on poll text and answers
pub const MAX_OPTIONS: usize = 10;
pub const MAX_OPTION_CHARS: usize = 55;
pub const MAX_QUESTION_CHARS: usize = 300;

/// Root of `config.yml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

/// `discord:` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default, deserialize_with = "snowflake")]
    pub channel_id: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel_id: String::new(),
            api_base: default_api_base(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

/// `poll:` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollConfig {
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub pre_message: Option<String>,
    #[serde(default)]
    pub allow_multiselect: bool,
    #[serde(default)]
    pub no_result_message: Option<String>,
    #[serde(default)]
    pub options: Vec<PollOption>,
}

/// A single answer of the poll and the message announced when it wins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub emoji_name: Option<String>,
    #[serde(default, deserialize_with = "optional_snowflake")]
    pub emoji_id: Option<String>,
    #[serde(default)]
    pub end_message: Option<String>,
}

/// Snowflakes are accepted both quoted and as bare YAML integers
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSnowflake {
    Text(String),
    Number(u64),
}

impl From<RawSnowflake> for String {
    fn from(raw: RawSnowflake) -> Self {
        match raw {
            RawSnowflake::Text(s) => s.trim().to_string(),
            RawSnowflake::Number(n) => n.to_string(),
        }
    }
}

fn snowflake<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawSnowflake>::deserialize(deserializer)?
        .map(String::from)
        .unwrap_or_default())
}

fn optional_snowflake<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawSnowflake>::deserialize(deserializer)?.map(String::from))
}

fn is_snowflake(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Outcome of [`ensure_config`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStatus {
    /// The file already existed and was left untouched
    Existing,
    /// The default template was written
    Created,
}

/// Write the default template to `path` unless a file is already there
pub fn ensure_config(path: &Path) -> Result<ConfigStatus> {
    if path.exists() {
        return Ok(ConfigStatus::Existing);
    }
    write_default_config(path)?;
    Ok(ConfigStatus::Created)
}

/// Write the default template to `path`, replacing any existing file
pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CONFIG_TEMPLATE)?;
    Ok(())
}

/// Load `config.yml`, apply environment overrides and validate
pub fn load_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let mut config = Config::from_yaml(&contents)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Parse YAML without applying overrides or validating
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Override token and channel from a key lookup (normally the process environment)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.discord.token = token.trim().to_string();
        }
        if let Some(channel) = lookup(CHANNEL_ID_ENV).filter(|v| !v.trim().is_empty()) {
            self.discord.channel_id = channel.trim().to_string();
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.discord.token.trim().is_empty() {
            return Err(Error::Config(format!(
                "discord.token is not set (or set {})",
                TOKEN_ENV
            )));
        }

        if !is_snowflake(&self.discord.channel_id) {
            return Err(Error::Config(format!(
                "discord.channelId must be a numeric id, got '{}'",
                self.discord.channel_id
            )));
        }

        if !self.discord.api_base.starts_with("http://")
            && !self.discord.api_base.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "discord.apiBase must be an http(s) URL, got '{}'",
                self.discord.api_base
            )));
        }

        self.poll.validate()
    }
}

impl PollConfig {
    /// Validate poll limits imposed by Discord
    pub fn validate(&self) -> Result<()> {
        if let Some(question) = &self.question {
            let len = question.chars().count();
            if len > MAX_QUESTION_CHARS {
                return Err(Error::Config(format!(
                    "poll.question is {} characters, the limit is {}",
                    len, MAX_QUESTION_CHARS
                )));
            }
        }

        if self.options.len() > MAX_OPTIONS {
            return Err(Error::Config(format!(
                "poll.options has {} entries, the limit is {}",
                self.options.len(),
                MAX_OPTIONS
            )));
        }

        for (idx, option) in self.options.iter().enumerate() {
            if let Some(content) = &option.content {
                let len = content.chars().count();
                if len > MAX_OPTION_CHARS {
                    return Err(Error::Config(format!(
                        "poll.options[{}].content is {} characters, the limit is {}",
                        idx, len, MAX_OPTION_CHARS
                    )));
                }
            }
            if let Some(id) = option.emoji_id.as_deref().filter(|id| !id.is_empty()) {
                if !is_snowflake(id) {
                    return Err(Error::Config(format!(
                        "poll.options[{}].emojiId must be a numeric id, got '{}'",
                        idx, id
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Builder for creating configurations in code
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder for the given bot token and channel
    pub fn new(token: impl Into<String>, channel_id: impl Into<String>) -> Self {
        let mut config = Config::default();
        config.discord.token = token.into();
        config.discord.channel_id = channel_id.into();
        Self { config }
    }

    /// Set the REST base URL
    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.discord.api_base = base.into();
        self
    }

    /// Set the poll duration string
    pub fn duration(mut self, duration: impl Into<String>) -> Self {
        self.config.poll.duration = Some(duration.into());
        self
    }

    /// Set the question
    pub fn question(mut self, question: impl Into<String>) -> Self {
        self.config.poll.question = Some(question.into());
        self
    }

    /// Set the message posted before the poll
    pub fn pre_message(mut self, message: impl Into<String>) -> Self {
        self.config.poll.pre_message = Some(message.into());
        self
    }

    /// Set the fallback message
    pub fn no_result_message(mut self, message: impl Into<String>) -> Self {
        self.config.poll.no_result_message = Some(message.into());
        self
    }

    /// Allow selecting more than one answer
    pub fn allow_multiselect(mut self, allow: bool) -> Self {
        self.config.poll.allow_multiselect = allow;
        self
    }

    /// Add an option
    pub fn add_option(mut self, option: PollOption) -> Self {
        self.config.poll.options.push(option);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl PollOption {
    /// Option with answer text and the message announced when it wins
    pub fn new(content: impl Into<String>, end_message: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            end_message: Some(end_message.into()),
            ..Self::default()
        }
    }

    /// Attach a unicode emoji
    pub fn with_emoji_name(mut self, name: impl Into<String>) -> Self {
        self.emoji_name = Some(name.into());
        self
    }

    /// Attach a custom emoji by id
    pub fn with_emoji_id(mut self, id: impl Into<String>) -> Self {
        self.emoji_id = Some(id.into());
        self
    }
}
