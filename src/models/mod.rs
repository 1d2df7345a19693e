mod document;
mod episode;
mod reminder;
mod show;

pub use document::{CachedDocument, EpisodeInfo, SearchResult, ShowDocument};
pub use episode::{AiringEpisode, EpisodeRecord, NewEpisode};
pub use reminder::{NewReminder, Reminder, ReminderKind};
pub use show::{NewTrackedItem, ShowStatus, TrackedItem};
