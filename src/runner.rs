use crate::client::DiscordClient;
use crate::config::Config;
use crate::duration::parse_duration_or_default;
use crate::error::{Error, Result};
use crate::placeholder::Placeholders;
use crate::poll::{build_poll_request_for, no_result_message, pre_message};
use crate::tally::{tally, PollOutcome};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Knobs for a single run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Replaces the configured wait; the Discord poll duration is unchanged
    pub wait: Option<Duration>,
    /// How many times results are fetched while waiting for Discord to finalize them
    pub finalize_attempts: u32,
    pub finalize_interval: Duration,
    /// End the wait early on Ctrl-C
    pub interruptible: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            wait: None,
            finalize_attempts: 5,
            finalize_interval: Duration::from_secs(1),
            interruptible: true,
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub channel_id: String,
    pub poll_message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_message_id: Option<String>,
    pub poll_hours: u32,
    pub waited_secs: u64,
    pub interrupted: bool,
    pub expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<PollOutcome>,
    pub announcement: String,
    pub announcement_message_id: String,
}

/// What happened after the wait
struct Finished {
    expired: bool,
    outcome: Option<PollOutcome>,
    announcement: String,
    announcement_message_id: String,
}

/// Resolves on the next Ctrl-C; never resolves if the signal cannot be watched
async fn next_interrupt() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Drives one poll from creation to the winner announcement
pub struct PollRunner {
    client: DiscordClient,
    config: Config,
    placeholders: Placeholders,
    options: RunOptions,
}

impl PollRunner {
    /// Runner talking to the API configured in `config`
    pub fn new(config: Config) -> Result<Self> {
        let client = DiscordClient::from_config(&config.discord)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: DiscordClient, config: Config) -> Self {
        Self {
            client,
            config,
            placeholders: Placeholders::today(),
            options: RunOptions::default(),
        }
    }

    /// Fix the date used for placeholders
    pub fn placeholders(mut self, placeholders: Placeholders) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the whole lifecycle: channel check, pre-message, poll, wait,
    /// expire, tally and announcement.
    pub async fn run(&self) -> Result<RunReport> {
        let channel_id = self.config.discord.channel_id.as_str();
        let poll_config = &self.config.poll;

        let duration = parse_duration_or_default(poll_config.duration.as_deref());
        let request = build_poll_request_for(poll_config, &self.placeholders, duration)?;
        let poll_hours = request.poll.as_ref().map(|p| p.duration).unwrap_or(1);

        let channel = self.client.get_channel(channel_id).await?;
        info!(
            channel_id,
            channel_name = channel.name.as_deref().unwrap_or("-"),
            "resolved channel"
        );

        let pre_message_id = match pre_message(poll_config, &self.placeholders) {
            Some(text) => {
                let message = self.client.send_message(channel_id, &text).await?;
                info!(message_id = %message.id, "sent pre-message");
                Some(message.id)
            }
            None => None,
        };

        let created = self.client.create_poll(channel_id, &request).await?;
        info!(message_id = %created.id, hours = poll_hours, "poll created");

        let wait = self.options.wait.unwrap_or(duration);
        let started = Instant::now();
        let interrupted = self.wait(wait).await;
        let waited = started.elapsed();

        // The wait installed a SIGINT listener, so a further Ctrl-C has to be handled here
        let finished = if self.options.interruptible {
            tokio::select! {
                result = self.finish(&created.id) => result?,
                _ = next_interrupt() => {
                    error!(message_id = %created.id, "interrupted again, aborting");
                    return Err(Error::Interrupted);
                }
            }
        } else {
            self.finish(&created.id).await?
        };

        Ok(RunReport {
            channel_id: channel_id.to_string(),
            poll_message_id: created.id,
            pre_message_id,
            poll_hours,
            waited_secs: waited.as_secs(),
            interrupted,
            expired: finished.expired,
            outcome: finished.outcome,
            announcement: finished.announcement,
            announcement_message_id: finished.announcement_message_id,
        })
    }

    /// Expire the poll, tally it and post the announcement
    async fn finish(&self, message_id: &str) -> Result<Finished> {
        let channel_id = self.config.discord.channel_id.as_str();

        let expired = match self.client.expire_poll(channel_id, message_id).await {
            Ok(_) => {
                info!(message_id, "poll ended");
                true
            }
            Err(e) => {
                warn!(message_id, error = %e, "failed to end poll");
                false
            }
        };

        let outcome = match self.fetch_outcome(message_id).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(message_id, error = %e, "failed to fetch poll results");
                None
            }
        };

        let announcement = self.announcement(outcome.as_ref());
        let announced = self.client.send_message(channel_id, &announcement).await?;
        info!(message_id = %announced.id, "sent result announcement");

        Ok(Finished {
            expired,
            outcome,
            announcement,
            announcement_message_id: announced.id,
        })
    }

    /// Sleep for `duration`; returns true when cut short by Ctrl-C
    async fn wait(&self, duration: Duration) -> bool {
        info!(wait_secs = duration.as_secs(), "poll running");

        if !self.options.interruptible {
            tokio::time::sleep(duration).await;
            return false;
        }

        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);

        let signal = tokio::select! {
            _ = &mut sleep => None,
            result = tokio::signal::ctrl_c() => Some(result),
        };

        match signal {
            None => false,
            Some(Ok(())) => {
                warn!("interrupted, ending the poll early");
                true
            }
            Some(Err(e)) => {
                warn!(error = %e, "cannot listen for Ctrl-C, waiting out the poll");
                sleep.await;
                false
            }
        }
    }

    /// Fetch the poll message until Discord marks the results final
    async fn fetch_outcome(&self, message_id: &str) -> Result<PollOutcome> {
        let channel_id = self.config.discord.channel_id.as_str();
        let attempts = self.options.finalize_attempts.max(1);
        let mut attempt = 1;

        loop {
            let message = self.client.get_message(channel_id, message_id).await?;
            let poll = message
                .poll
                .ok_or_else(|| Error::MissingPoll(message_id.to_string()))?;
            let outcome = tally(&self.config.poll.options, &poll);

            if outcome.finalized || attempt >= attempts {
                if !outcome.finalized {
                    warn!(attempts, "poll results not finalized, using latest counts");
                }
                info!(
                    total_votes = outcome.total_votes(),
                    winner = ?outcome.winner,
                    "tallied poll"
                );
                return Ok(outcome);
            }

            debug!(attempt, "poll results not final yet");
            tokio::time::sleep(self.options.finalize_interval).await;
            attempt += 1;
        }
    }

    /// Winner's end message, or the fallback when there is none
    fn announcement(&self, outcome: Option<&PollOutcome>) -> String {
        outcome
            .and_then(|o| o.winning_option(&self.config.poll.options))
            .and_then(|option| option.end_message.as_deref())
            .filter(|m| !m.trim().is_empty())
            .map(|m| self.placeholders.apply(m))
            .unwrap_or_else(|| no_result_message(&self.config.poll, &self.placeholders))
    }
}
