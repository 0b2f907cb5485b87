use crate::config::{PollConfig, PollOption};
use crate::duration::{parse_duration_or_default, poll_hours};
use crate::error::{Error, Result};
use crate::placeholder::Placeholders;
use crate::types::{
    CreateMessage, PartialEmoji, PollAnswer, PollCreateRequest, PollMedia, LAYOUT_DEFAULT,
};
use std::time::Duration;

/// Question text used when `poll.question` is not configured
pub const DEFAULT_QUESTION: &str = "Poll question not set";

/// Fallback announcement when no winner can be determined
pub const DEFAULT_NO_RESULT_MESSAGE: &str = "Could not retrieve the poll results.";

/// Build the message body that creates the poll, taking the duration from `poll.duration`
pub fn build_poll_request(poll: &PollConfig, placeholders: &Placeholders) -> Result<CreateMessage> {
    let duration = parse_duration_or_default(poll.duration.as_deref());
    build_poll_request_for(poll, placeholders, duration)
}

/// Build the message body for an already parsed duration
pub fn build_poll_request_for(
    poll: &PollConfig,
    placeholders: &Placeholders,
    duration: Duration,
) -> Result<CreateMessage> {
    if poll.options.is_empty() {
        return Err(Error::Config(
            "poll.options must contain at least one option".to_string(),
        ));
    }

    let question = placeholders
        .apply_opt(poll.question.as_deref())
        .unwrap_or_else(|| DEFAULT_QUESTION.to_string());

    Ok(CreateMessage::poll(PollCreateRequest {
        question: PollMedia {
            text: Some(question),
            emoji: None,
        },
        answers: poll.options.iter().map(answer_for).collect(),
        duration: poll_hours(duration),
        allow_multiselect: poll.allow_multiselect,
        layout_type: LAYOUT_DEFAULT,
    }))
}

/// A custom emoji id takes precedence over a unicode emoji name
fn answer_for(option: &PollOption) -> PollAnswer {
    let emoji_id = option.emoji_id.as_deref().filter(|s| !s.is_empty());
    let emoji_name = option.emoji_name.as_deref().filter(|s| !s.is_empty());

    let emoji = match (emoji_id, emoji_name) {
        (Some(id), _) => Some(PartialEmoji {
            id: Some(id.to_string()),
            name: None,
        }),
        (None, Some(name)) => Some(PartialEmoji {
            id: None,
            name: Some(name.to_string()),
        }),
        (None, None) => None,
    };

    PollAnswer {
        answer_id: None,
        poll_media: PollMedia {
            text: Some(option.content.clone().unwrap_or_default()),
            emoji,
        },
    }
}

/// Pre-message with placeholders applied, or `None` when it should be skipped
pub fn pre_message(poll: &PollConfig, placeholders: &Placeholders) -> Option<String> {
    poll.pre_message
        .as_deref()
        .filter(|m| !m.is_empty())
        .map(|m| placeholders.apply(m))
}

/// Fallback message with placeholders applied
pub fn no_result_message(poll: &PollConfig, placeholders: &Placeholders) -> String {
    let raw = poll
        .no_result_message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(DEFAULT_NO_RESULT_MESSAGE);
    placeholders.apply(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn placeholders() -> Placeholders {
        Placeholders::from_date(NaiveDate::from_ymd_opt(2025, 3, 5).unwrap())
    }

    fn sample_poll() -> PollConfig {
        PollConfig {
            duration: Some("30s".to_string()),
            question: Some("Lunch on %month%/%date%?".to_string()),
            options: vec![
                PollOption::new("Ramen", "Ramen wins").with_emoji_name("🍜"),
                PollOption::new("Curry", "Curry wins")
                    .with_emoji_id("998877")
                    .with_emoji_name("🍛"),
                PollOption {
                    content: None,
                    emoji_name: Some(String::new()),
                    ..PollOption::default()
                },
            ],
            ..PollConfig::default()
        }
    }

    #[test]
    fn test_poll_payload() {
        let request = build_poll_request(&sample_poll(), &placeholders()).unwrap();
        insta::assert_json_snapshot!(request, @r###"
        {
          "content": "",
          "poll": {
            "question": {
              "text": "Lunch on 3/5?"
            },
            "answers": [
              {
                "poll_media": {
                  "text": "Ramen",
                  "emoji": {
                    "name": "🍜"
                  }
                }
              },
              {
                "poll_media": {
                  "text": "Curry",
                  "emoji": {
                    "id": "998877"
                  }
                }
              },
              {
                "poll_media": {
                  "text": ""
                }
              }
            ],
            "duration": 1,
            "allow_multiselect": false,
            "layout_type": 1
          }
        }
        "###);
    }

    #[test]
    fn test_default_question_and_duration() {
        let mut poll = sample_poll();
        poll.question = None;
        poll.duration = None;
        poll.allow_multiselect = true;

        let request = build_poll_request(&poll, &placeholders()).unwrap();
        let body = request.poll.unwrap();
        assert_eq!(body.question.text.as_deref(), Some(DEFAULT_QUESTION));
        assert_eq!(body.duration, 1);
        assert!(body.allow_multiselect);
    }

    #[test]
    fn test_duration_in_hours() {
        let mut poll = sample_poll();
        poll.duration = Some("3d".to_string());
        let body = build_poll_request(&poll, &placeholders()).unwrap().poll.unwrap();
        assert_eq!(body.duration, 72);
    }

    #[test]
    fn test_no_options_rejected() {
        let poll = PollConfig::default();
        assert!(matches!(
            build_poll_request(&poll, &placeholders()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_pre_message() {
        let mut poll = sample_poll();
        assert_eq!(pre_message(&poll, &placeholders()), None);

        poll.pre_message = Some(String::new());
        assert_eq!(pre_message(&poll, &placeholders()), None);

        poll.pre_message = Some("Vote for %month%/%date%".to_string());
        assert_eq!(
            pre_message(&poll, &placeholders()).as_deref(),
            Some("Vote for 3/5")
        );
    }

    #[test]
    fn test_no_result_message() {
        let mut poll = sample_poll();
        assert_eq!(no_result_message(&poll, &placeholders()), DEFAULT_NO_RESULT_MESSAGE);

        poll.no_result_message = Some("No winner on %date%".to_string());
        assert_eq!(no_result_message(&poll, &placeholders()), "No winner on 5");
    }
}
