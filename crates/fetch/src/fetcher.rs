//! Parameterized, paginated retrieval of messages from one or many
//! spaces (spec §4.5, C6).

use chatgate_backend::{ChatBackend, ListMessagesOptions};
use chatgate_domain::error::Result;
use chatgate_domain::search::DateWindow;
use chatgate_domain::space::SpaceInfo;
use chatgate_domain::{Message, UserProfile};

use crate::datefilter::build_date_filter;

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub filter_str: Option<String>,
    pub date_window: Option<DateWindow>,
    pub page_size: usize,
    pub page_token: Option<String>,
    pub order_by: Option<String>,
    pub include_sender_info: bool,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self { page_size: 100, ..Default::default() }
    }

    /// A copy of these options with the date window removed — used by
    /// the semantic date-relaxation fallback (spec §4.7), which must
    /// retry "with all other parameters intact".
    pub fn without_date_window(&self) -> Self {
        Self { date_window: None, ..self.clone() }
    }
}

/// AND-combines the date filter (if any) ahead of any caller-supplied
/// filter clause, mirroring `create_date_filter`'s combination order in
/// the original `api/search.py`.
fn effective_filter(opts: &FetchOptions) -> Result<Option<String>> {
    let date_filter = opts.date_window.as_ref().map(build_date_filter).transpose()?;
    Ok(match (date_filter, &opts.filter_str) {
        (Some(d), Some(f)) => Some(format!("{d} AND {f}")),
        (Some(d), None) => Some(d),
        (None, Some(f)) => Some(f.clone()),
        (None, None) => None,
    })
}

/// Fetches one page of messages from `space`, with optional best-effort
/// sender-info enrichment. Backend errors propagate as `BackendError`;
/// this function does not absorb them (multi-space collection does).
pub async fn list_messages(backend: &dyn ChatBackend, space: &str, opts: &FetchOptions) -> Result<(Vec<Message>, Option<String>)> {
    let filter = effective_filter(opts)?;
    let backend_opts = ListMessagesOptions {
        filter,
        page_size: opts.page_size.clamp(1, 1000),
        page_token: opts.page_token.clone(),
        order_by: Some(opts.order_by.clone().unwrap_or_else(|| "createTime desc".to_string())),
    };

    let (mut messages, next_token) = backend.list_messages(space, &backend_opts).await?;

    if opts.include_sender_info {
        for msg in messages.iter_mut() {
            if let Some(sender) = msg.sender.clone() {
                msg.sender_info = Some(match backend.get_user_profile(&sender).await {
                    Ok(profile) => profile,
                    Err(e) => {
                        tracing::warn!(error = %e, sender = %sender, "profile resolution failed, attaching stub");
                        UserProfile::stub(&sender)
                    }
                });
            }
        }
    }

    Ok((messages, next_token))
}

/// Collects messages across many spaces for search, stamping each with
/// its originating `space_info.name`. Bounded by `5 × max_results`;
/// per-space errors are logged and skipped, never abort the collection
/// (spec §4.5 "Multi-space collection").
pub async fn collect_messages(backend: &dyn ChatBackend, spaces: &[String], opts: &FetchOptions, max_results: usize) -> Vec<Message> {
    let cap = max_results.saturating_mul(5).max(1);
    let mut all = Vec::new();

    for space in spaces {
        match list_messages(backend, space, opts).await {
            Ok((mut messages, _next_token)) => {
                for msg in messages.iter_mut() {
                    msg.space_info = Some(SpaceInfo { name: space.clone(), display_name: None });
                }
                all.append(&mut messages);
            }
            Err(e) => {
                tracing::warn!(error = %e, space = %space, "error fetching messages from space, skipping");
                continue;
            }
        }

        if all.len() > cap {
            tracing::info!(cap, collected = all.len(), "collection cap reached, stopping fetch across remaining spaces");
            break;
        }
    }

    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatgate_backend::MockChatBackend;
    use chatgate_domain::space::Space;

    #[tokio::test]
    async fn combines_caller_filter_with_date_filter() {
        let backend = MockChatBackend::new();
        backend.add_messages(
            "spaces/A",
            vec![Message::new("spaces/A/messages/1", "hi", "2024-06-01T00:00:00Z")],
        );
        let opts = FetchOptions {
            filter_str: Some("sender = \"users/42\"".to_string()),
            date_window: Some(DateWindow::Absolute { start_date: "2024-05-01".into(), end_date: None }),
            page_size: 10,
            ..Default::default()
        };
        let (messages, _) = list_messages(&backend, "spaces/A", &opts).await.unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn best_effort_profile_enrichment_never_fails_the_call() {
        let backend = MockChatBackend::new();
        let mut msg = Message::new("spaces/A/messages/1", "hi", "2024-06-01T00:00:00Z");
        msg.sender = Some("users/99".to_string());
        backend.add_messages("spaces/A", vec![msg]);
        let opts = FetchOptions { page_size: 10, include_sender_info: true, ..Default::default() };
        let (messages, _) = list_messages(&backend, "spaces/A", &opts).await.unwrap();
        assert_eq!(messages[0].sender_info.as_ref().unwrap().display_name.as_deref(), Some("User 99"));
    }

    #[tokio::test]
    async fn multi_space_collection_stamps_space_info_and_skips_failures() {
        let backend = MockChatBackend::new();
        backend.add_space(Space { name: "spaces/A".into(), space_type: Default::default(), display_name: "A".into() });
        backend.add_messages("spaces/A", vec![Message::new("spaces/A/messages/1", "a", "2024-06-01T00:00:00Z")]);
        backend.fail_space("spaces/B");

        let spaces = vec!["spaces/A".to_string(), "spaces/B".to_string()];
        let messages = collect_messages(&backend, &spaces, &FetchOptions::new(), 50).await;

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].space_info.as_ref().unwrap().name, "spaces/A");
    }

    #[tokio::test]
    async fn collection_cap_stops_further_spaces() {
        let backend = MockChatBackend::new();
        let many: Vec<Message> = (0..20)
            .map(|i| Message::new(format!("spaces/A/messages/{i}"), "x", "2024-06-01T00:00:00Z"))
            .collect();
        backend.add_messages("spaces/A", many);
        backend.add_messages("spaces/B", vec![Message::new("spaces/B/messages/1", "y", "2024-06-01T00:00:00Z")]);

        let spaces = vec!["spaces/A".to_string(), "spaces/B".to_string()];
        let opts = FetchOptions { page_size: 1000, ..Default::default() };
        // max_results=2 -> cap=10; space A alone returns 20, above cap, so space B never runs.
        let messages = collect_messages(&backend, &spaces, &opts, 2).await;
        assert_eq!(messages.len(), 20);
        assert_eq!(backend.call_count_for("spaces/B"), 0);
    }
}
