use crate::config::PollOption;
use crate::types::Poll;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// Votes per configured option and the winner, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollOutcome {
    /// Vote count for each configured option, in config order
    pub counts: Vec<u32>,
    /// Index into the configured options
    pub winner: Option<usize>,
    /// Whether Discord reported the counts as final
    pub finalized: bool,
}

impl PollOutcome {
    pub fn total_votes(&self) -> u32 {
        self.counts.iter().fold(0u32, |total, &c| total.saturating_add(c))
    }

    /// The winning option from `options`
    pub fn winning_option<'a>(&self, options: &'a [PollOption]) -> Option<&'a PollOption> {
        self.winner.and_then(|idx| options.get(idx))
    }
}

/// Match Discord's answer counts back to the configured options and pick the winner.
///
/// Counts are keyed by `answer_id`. The position of that id in the poll's
/// `answers` list gives the option index; when the list is missing the id is
/// treated as 1-based position. The highest count wins, ties go to the option
/// configured first, and a poll without votes has no winner.
pub fn tally(options: &[PollOption], poll: &Poll) -> PollOutcome {
    let mut counts = vec![0u32; options.len()];

    let positions: HashMap<u32, usize> = poll
        .answers
        .iter()
        .enumerate()
        .filter_map(|(idx, answer)| answer.answer_id.map(|id| (id, idx)))
        .collect();

    let results = poll.results.clone().unwrap_or_default();

    for answer_count in &results.answer_counts {
        let index = if positions.is_empty() {
            (answer_count.id as usize).checked_sub(1)
        } else {
            positions.get(&answer_count.id).copied()
        };

        match index.and_then(|idx| counts.get_mut(idx)) {
            Some(slot) => *slot = slot.saturating_add(answer_count.count),
            None => warn!(
                answer_id = answer_count.id,
                count = answer_count.count,
                "answer count does not match any configured option"
            ),
        }
    }

    let winner = counts
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .fold(None, |best: Option<(usize, u32)>, (idx, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((idx, count)),
        })
        .map(|(idx, _)| idx);

    PollOutcome {
        counts,
        winner,
        finalized: results.is_finalized,
    }
}
