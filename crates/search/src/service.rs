//! Integration layer wiring a `ChatBackend` to a `SearchEngine`: space
//! resolution, multi-space collection with the semantic date-relaxation
//! fallback, and the response envelope (spec §4.7, grounded in
//! `original_source/src/providers/google_chat/api/search.py`).

use std::sync::Arc;

use chatgate_backend::ChatBackend;
use chatgate_domain::search::{DateWindow, SearchMetadata, SearchMode, SearchQuery, SearchResponse, SearchedSpaces};
use chatgate_domain::space::SpaceInfo;
use chatgate_domain::Message;

use chatgate_fetch::FetchOptions;

use crate::engine::SearchEngine;

pub struct SearchService {
    backend: Arc<dyn ChatBackend>,
    engine: SearchEngine,
}

impl SearchService {
    pub fn new(backend: Arc<dyn ChatBackend>, engine: SearchEngine) -> Self {
        Self { backend, engine }
    }

    /// Runs a search end to end. Never returns `Err` — catastrophic
    /// failures (space listing, etc.) are reported inside the envelope
    /// per spec §7 ("search returns `{messages: [], search_complete:
    /// false, error}` on catastrophic failure").
    pub async fn search(&self, query: &SearchQuery) -> SearchResponse {
        let spaces = match &query.spaces {
            Some(explicit) => explicit.clone(),
            None => match self.backend.list_spaces().await {
                Ok(spaces) => spaces.into_iter().map(|s| s.name).collect(),
                Err(e) => {
                    return SearchResponse::failure(&query.text, format!("failed to list spaces: {e}"));
                }
            },
        };

        if spaces.is_empty() {
            return SearchResponse {
                messages: Vec::new(),
                next_page_token: None,
                source: Some("search_messages".to_string()),
                search_metadata: SearchMetadata { query: query.text.clone(), mode: "unset".to_string(), found_count: 0, searched_count: 0 },
                space_info: Some(SearchedSpaces { searched_spaces: Vec::new() }),
                search_complete: true,
                error: None,
            };
        }

        let resolved_mode = self.engine.resolve_mode(query.mode);

        let date_window = query.start_date.as_ref().map(|start| DateWindow::Absolute {
            start_date: start.clone(),
            end_date: query.end_date.clone(),
        });

        let fetch_opts = FetchOptions {
            filter_str: query.filter_str.clone(),
            date_window: date_window.clone(),
            page_size: query.max_results.max(1),
            page_token: None,
            order_by: None,
            include_sender_info: query.include_sender_info,
        };

        let all_messages = self.collect_with_semantic_fallback(&spaces, &fetch_opts, resolved_mode, date_window.is_some(), query.max_results).await;
        let searched_count = all_messages.len();

        let mut ranked = self.engine.search(&query.text, &all_messages, resolved_mode);
        ranked.truncate(query.max_results);
        let messages: Vec<Message> = ranked.into_iter().map(|sm| sm.message).collect();
        let found_count = messages.len();

        SearchResponse {
            messages,
            next_page_token: None,
            source: Some("search_messages".to_string()),
            search_metadata: SearchMetadata {
                query: query.text.clone(),
                mode: resolved_mode.as_str().to_string(),
                found_count,
                searched_count,
            },
            space_info: Some(SearchedSpaces { searched_spaces: spaces }),
            search_complete: true,
            error: None,
        }
    }

    /// Collects messages across `spaces`, bounded by `5 × max_results`.
    /// Per space: if `resolved_mode` is semantic, a date window is
    /// present, and the windowed fetch returns zero messages, retries
    /// that same space without the date window before giving up (spec
    /// §4.7 "semantic date-relaxation fallback" — per-space, not global,
    /// all other fetch parameters held intact).
    async fn collect_with_semantic_fallback(
        &self,
        spaces: &[String],
        opts: &FetchOptions,
        resolved_mode: SearchMode,
        has_date_window: bool,
        max_results: usize,
    ) -> Vec<Message> {
        let cap = max_results.saturating_mul(5).max(1);
        let mut all = Vec::new();

        for space in spaces {
            let fetched = match chatgate_fetch::list_messages(self.backend.as_ref(), space, opts).await {
                Ok((messages, _)) => messages,
                Err(e) => {
                    tracing::warn!(error = %e, space = %space, "error fetching messages from space, skipping");
                    continue;
                }
            };

            let mut messages = if fetched.is_empty() && resolved_mode == SearchMode::Semantic && has_date_window {
                tracing::info!(space = %space, "semantic search found nothing in date window, retrying without date filter");
                match chatgate_fetch::list_messages(self.backend.as_ref(), space, &opts.without_date_window()).await {
                    Ok((messages, _)) => messages,
                    Err(e) => {
                        tracing::warn!(error = %e, space = %space, "relaxed retry also failed, skipping");
                        continue;
                    }
                }
            } else {
                fetched
            };

            for msg in messages.iter_mut() {
                msg.space_info = Some(SpaceInfo { name: space.clone(), display_name: None });
            }
            all.append(&mut messages);

            if all.len() > cap {
                tracing::info!(cap, collected = all.len(), "collection cap reached, stopping fetch across remaining spaces");
                break;
            }
        }

        all
    }
}
