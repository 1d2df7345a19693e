//! Episode reminder lookup.
//!
//! Reminders written today carry a `SxxExx|` prefix and are matched exactly.
//! Older reminders only mention the episode somewhere in free text, sometimes
//! without zero padding, so the lookup falls back through progressively looser
//! rules. Each rule is a pure function over the candidate reminders and the
//! first rule with a hit wins; the canonical rule always runs first.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::Reminder;

/// Canonical token for an episode, e.g. season 1 episode 5 -> "S01E05".
pub fn format_episode_token(season: i32, episode: i32) -> String {
    format!("S{:02}E{:02}", season, episode)
}

/// A parsed `S<digits>E<digits>` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeToken {
    pub canonical: String,
    pub season: u32,
    pub episode: u32,
}

impl EpisodeToken {
    pub fn parse(input: &str) -> Option<Self> {
        let caps = token_pattern().captures(input.trim())?;
        let season: u32 = caps[1].parse().ok()?;
        let episode: u32 = caps[2].parse().ok()?;
        Some(Self {
            canonical: format!("S{:02}E{:02}", season, episode),
            season,
            episode,
        })
    }

    /// Forms used by reminders written before tokens were zero padded:
    /// "S1E5" and the half-padded "S01E5".
    fn legacy_forms(&self) -> Vec<String> {
        let mut forms = vec![format!("S{}E{}", self.season, self.episode)];
        let half_padded = format!("S{:02}E{}", self.season, self.episode);
        if !forms.contains(&half_padded) && half_padded != self.canonical {
            forms.push(half_padded);
        }
        forms
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^S(\d+)E(\d+)$").expect("episode token pattern is valid"))
}

pub type MatchRule = for<'a> fn(&EpisodeToken, &'a [Reminder]) -> Option<&'a Reminder>;

/// Lookup rules in priority order.
pub const MATCH_RULES: [(&str, MatchRule); 3] = [
    ("canonical-prefix", canonical_prefix),
    ("legacy-substring", legacy_substring),
    ("legacy-unpadded", legacy_unpadded),
];

/// Description starts with `"<canonical>|"`.
pub fn canonical_prefix<'a>(token: &EpisodeToken, candidates: &'a [Reminder]) -> Option<&'a Reminder> {
    let prefix = format!("{}|", token.canonical);
    candidates
        .iter()
        .find(|reminder| reminder.description.starts_with(&prefix))
}

/// Canonical token anywhere in the description.
pub fn legacy_substring<'a>(token: &EpisodeToken, candidates: &'a [Reminder]) -> Option<&'a Reminder> {
    candidates
        .iter()
        .find(|reminder| reminder.description.contains(&token.canonical))
}

/// Unpadded token with no digit directly before or after it, so "S1E1"
/// never hits "S1E10".
pub fn legacy_unpadded<'a>(token: &EpisodeToken, candidates: &'a [Reminder]) -> Option<&'a Reminder> {
    let forms = token.legacy_forms();
    candidates.iter().find(|reminder| {
        forms
            .iter()
            .any(|form| contains_digit_bounded(&reminder.description, form))
    })
}

fn contains_digit_bounded(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_digit()) && !after.is_some_and(|c| c.is_ascii_digit())
    })
}

/// Finds the reminder for `input` among `candidates`.
///
/// Input that is not an episode token is matched as a raw substring.
pub fn find_episode_reminder<'a>(input: &str, candidates: &'a [Reminder]) -> Option<&'a Reminder> {
    let Some(token) = EpisodeToken::parse(input) else {
        let raw = input.trim();
        if raw.is_empty() {
            return None;
        }
        return candidates
            .iter()
            .find(|reminder| reminder.description.contains(raw));
    };

    MATCH_RULES.iter().find_map(|(name, rule)| {
        let hit = rule(&token, candidates)?;
        tracing::trace!("Episode {} matched reminder {} via {}", token.canonical, hit.id, name);
        Some(hit)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReminderKind;
    use chrono::DateTime;

    fn reminders(descriptions: &[&str]) -> Vec<Reminder> {
        descriptions
            .iter()
            .enumerate()
            .map(|(idx, description)| Reminder {
                id: idx as i64 + 1,
                item_id: 7,
                item_name: "The Bear".to_string(),
                availability_label: "18:00".to_string(),
                kind: ReminderKind::NewEpisode,
                description: description.to_string(),
                is_completed: false,
                created_at: DateTime::parse_from_rfc3339("2026-03-10T09:00:00+08:00").unwrap(),
            })
            .collect()
    }

    #[test]
    fn canonical_tokens_are_six_characters() {
        for season in 0..100 {
            for episode in [0, 1, 9, 10, 42, 99] {
                let token = format_episode_token(season, episode);
                assert_eq!(token.len(), 6, "{}", token);
                assert!(token.starts_with('S'));
                assert_eq!(&token[3..4], "E");
                assert!(token[1..3].chars().all(|c| c.is_ascii_digit()));
                assert!(token[4..6].chars().all(|c| c.is_ascii_digit()));
            }
        }
        assert_eq!(format_episode_token(1, 5), "S01E05");
        assert_eq!(format_episode_token(12, 3), "S12E03");
    }

    #[test]
    fn parse_normalizes_padding() {
        let token = EpisodeToken::parse(" S1E5 ").unwrap();
        assert_eq!(token.canonical, "S01E05");
        assert_eq!((token.season, token.episode), (1, 5));
        assert!(EpisodeToken::parse("episode five").is_none());
        assert!(EpisodeToken::parse("S01").is_none());
    }

    #[test]
    fn canonical_prefix_is_exact() {
        let candidates = reminders(&["S01E10|New episode: S01E10 - Ten", "S01E01|New episode: S01E01 - One"]);
        let token = EpisodeToken::parse("S01E01").unwrap();
        assert_eq!(canonical_prefix(&token, &candidates).map(|r| r.id), Some(2));

        let token = EpisodeToken::parse("S01E11").unwrap();
        assert!(canonical_prefix(&token, &candidates).is_none());
    }

    #[test]
    fn legacy_substring_finds_padded_token_in_text() {
        let candidates = reminders(&["New episode: S02E03 - Fishes"]);
        let token = EpisodeToken::parse("S02E03").unwrap();
        assert_eq!(legacy_substring(&token, &candidates).map(|r| r.id), Some(1));
        assert!(canonical_prefix(&token, &candidates).is_none());
    }

    #[test]
    fn unpadded_rule_respects_digit_boundaries() {
        let candidates = reminders(&["New episode: S1E10 - Ten"]);
        let one = EpisodeToken::parse("S01E01").unwrap();
        let ten = EpisodeToken::parse("S01E10").unwrap();

        assert!(legacy_unpadded(&one, &candidates).is_none());
        assert_eq!(legacy_unpadded(&ten, &candidates).map(|r| r.id), Some(1));

        let candidates = reminders(&["New episode: S1E1"]);
        assert_eq!(legacy_unpadded(&one, &candidates).map(|r| r.id), Some(1));
        assert!(legacy_unpadded(&ten, &candidates).is_none());
    }

    #[test]
    fn first_and_tenth_episodes_never_collide() {
        let lookups = [("S01E01", "S01E10"), ("S01E10", "S01E01")];
        let stored = [
            "S01E01|New episode: S01E01 - Pilot",
            "New episode: S01E01",
            "New episode: S1E1",
            "New episode: S01E1",
        ];
        for description in stored {
            let candidates = reminders(&[description]);
            assert!(
                find_episode_reminder("S01E01", &candidates).is_some(),
                "{description} should match S01E01"
            );
            assert!(
                find_episode_reminder("S01E10", &candidates).is_none(),
                "{description} must not match S01E10"
            );
        }
        for (stored_token, lookup) in lookups {
            let candidates = reminders(&[format!("{stored_token}|New episode").as_str()]);
            assert!(find_episode_reminder(lookup, &candidates).is_none());
        }
        let candidates = reminders(&["New episode: S1E10", "New episode: S01E10 - Ten"]);
        assert!(find_episode_reminder("S01E01", &candidates).is_none());
    }

    #[test]
    fn canonical_rule_wins_over_legacy_hits() {
        let candidates = reminders(&["old note mentioning S03E02", "S03E02|New episode: S03E02"]);
        assert_eq!(find_episode_reminder("S03E02", &candidates).map(|r| r.id), Some(2));
    }

    #[test]
    fn unparseable_input_falls_back_to_raw_substring() {
        let candidates = reminders(&["Finale special airs tonight"]);
        assert_eq!(find_episode_reminder("Finale", &candidates).map(|r| r.id), Some(1));
        assert!(find_episode_reminder("Premiere", &candidates).is_none());
        assert!(find_episode_reminder("  ", &candidates).is_none());
    }
}
