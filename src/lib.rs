//! Run a native Discord poll described by a YAML config file.
//!
//! The library covers the whole lifecycle: loading `config.yml`, building the
//! poll payload, talking to the Discord REST API, waiting out the poll and
//! announcing the winning option.

pub mod client;
pub mod config;
pub mod duration;
pub mod error;
pub mod placeholder;
pub mod poll;
pub mod runner;
pub mod tally;
pub mod types;

pub use client::DiscordClient;
pub use config::{load_config, Config, ConfigBuilder, ConfigStatus, PollConfig, PollOption};
pub use error::{Error, Result};
pub use placeholder::Placeholders;
pub use runner::{PollRunner, RunOptions, RunReport};
pub use tally::{tally, PollOutcome};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::client::DiscordClient;
    pub use crate::config::{Config, ConfigBuilder, PollOption};
    pub use crate::error::{Error, Result};
    pub use crate::placeholder::Placeholders;
    pub use crate::runner::{PollRunner, RunOptions, RunReport};
}
