use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Search strategy. `Unset` means "caller didn't specify a mode — use
/// `SearchConfig.default_mode`"; `Unknown` means "caller specified a mode
/// string that isn't one of the four real modes", which must fall back
/// straight to `exact` regardless of `default_mode` (spec §4.7 mode
/// resolution, spec §8 testable property 2: `search(q, M, "unknown")` ≡
/// `search(q, M, "exact")` for *any* configured default). Collapsing
/// these into one variant would make "unknown" silently inherit whatever
/// `default_mode` happens to be configured, rather than always landing
/// on `exact`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Exact,
    Regex,
    Semantic,
    Hybrid,
    Unset,
    Unknown,
}

impl SearchMode {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.to_ascii_lowercase()) {
            None => SearchMode::Unset,
            Some(s) if s == "exact" => SearchMode::Exact,
            Some(s) if s == "regex" => SearchMode::Regex,
            Some(s) if s == "semantic" => SearchMode::Semantic,
            Some(s) if s == "hybrid" => SearchMode::Hybrid,
            Some(_) => SearchMode::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Exact => "exact",
            SearchMode::Regex => "regex",
            SearchMode::Semantic => "semantic",
            SearchMode::Hybrid => "hybrid",
            SearchMode::Unset => "unset",
            SearchMode::Unknown => "unknown",
        }
    }
}

/// An immutable search request. Two ways to bound it by date: the caller
/// may set `start_date`/`end_date` here, or leave both unset and pass a
/// relative `(days_window, offset)` window at the fetch layer instead —
/// this type only carries the absolute form (spec §3 SearchQuery).
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub mode: SearchMode,
    pub spaces: Option<Vec<String>>,
    pub max_results: usize,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub filter_str: Option<String>,
    pub include_sender_info: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: SearchMode::Unset,
            spaces: None,
            max_results: 50,
            start_date: None,
            end_date: None,
            filter_str: None,
            include_sender_info: false,
        }
    }
}

/// A calendar-day window, expressible either relatively or absolutely;
/// exactly one representation is populated (spec §3 DateWindow).
#[derive(Debug, Clone)]
pub enum DateWindow {
    Relative { days_window: u32, offset: u32 },
    Absolute { start_date: String, end_date: Option<String> },
}

/// A `(score, message)` pair. Result lists are sorted by score
/// descending with ties broken by stable insertion order (spec §3).
#[derive(Debug, Clone)]
pub struct ScoredMessage {
    pub score: f64,
    pub message: Message,
}

impl ScoredMessage {
    pub fn new(score: f64, message: Message) -> Self {
        Self { score, message }
    }
}

/// Sorts `scored` by score descending, stably (ties keep insertion
/// order) — the one sort every search mode funnels through (spec §8.1).
pub fn sort_scored_stable(scored: &mut [ScoredMessage]) {
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
}

/// The envelope wrapping a completed (or failed) search, per spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub messages: Vec<Message>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub search_metadata: SearchMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_info: Option<SearchedSpaces>,
    pub search_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    /// The catastrophic-failure shape (spec §7): empty results,
    /// `search_complete: false`, and the error surfaced both at the top
    /// level and inside `search_metadata` for callers that only look at
    /// one of the two.
    pub fn failure(query: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            messages: Vec::new(),
            next_page_token: None,
            source: None,
            search_metadata: SearchMetadata { query: query.into(), mode: "unset".to_string(), found_count: 0, searched_count: 0 },
            space_info: None,
            search_complete: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub query: String,
    pub mode: String,
    pub found_count: usize,
    pub searched_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchedSpaces {
    pub searched_spaces: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_mode_string_is_distinct_from_unset() {
        assert_eq!(SearchMode::parse(Some("bogus")), SearchMode::Unknown);
        assert_eq!(SearchMode::parse(None), SearchMode::Unset);
    }

    #[test]
    fn stable_sort_preserves_insertion_order_on_ties() {
        let mut v = vec![
            ScoredMessage::new(1.0, Message::new("spaces/A/messages/1", "a", "t1")),
            ScoredMessage::new(1.0, Message::new("spaces/A/messages/2", "b", "t2")),
            ScoredMessage::new(2.0, Message::new("spaces/A/messages/3", "c", "t3")),
        ];
        sort_scored_stable(&mut v);
        assert_eq!(v[0].message.name, "spaces/A/messages/3");
        assert_eq!(v[1].message.name, "spaces/A/messages/1");
        assert_eq!(v[2].message.name, "spaces/A/messages/2");
    }
}
