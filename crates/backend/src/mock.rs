//! An in-memory `ChatBackend` used by `chatgate-fetch` and
//! `chatgate-search` tests so no network I/O is required (spec SPEC_FULL
//! §4.15 "Test tooling").

use std::collections::HashMap;

use async_trait::async_trait;
use chatgate_domain::error::{Error, Result};
use chatgate_domain::{Message, Space, UserProfile};
use parking_lot::RwLock;

use crate::trait_def::{ChatBackend, ListMessagesOptions};

#[derive(Default)]
pub struct MockChatBackend {
    spaces: RwLock<Vec<Space>>,
    /// Messages per space, pre-sorted newest-first as the backend would
    /// return them for `createTime desc` (the default order, spec §4.5).
    messages: RwLock<HashMap<String, Vec<Message>>>,
    profiles: RwLock<HashMap<String, UserProfile>>,
    pub list_messages_calls: RwLock<Vec<(String, Option<String>)>>,
    fail_spaces: RwLock<Vec<String>>,
}

impl MockChatBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_space(&self, space: Space) {
        self.spaces.write().push(space);
    }

    pub fn add_messages(&self, space: &str, messages: Vec<Message>) {
        self.messages.write().insert(space.to_string(), messages);
    }

    pub fn add_profile(&self, user_ref: &str, profile: UserProfile) {
        self.profiles.write().insert(chatgate_domain::user::normalize_user_ref(user_ref), profile);
    }

    /// Makes `list_messages` return `BackendError` for this space until
    /// cleared, to exercise per-space error absorption.
    pub fn fail_space(&self, space: &str) {
        self.fail_spaces.write().push(space.to_string());
    }

    pub fn call_count_for(&self, space: &str) -> usize {
        self.list_messages_calls.read().iter().filter(|(s, _)| s == space).count()
    }
}

/// Extremely small filter interpreter covering exactly what the
/// fetch/search tests need: `createTime > "X"` and `createTime < "Y"`
/// strict-inequality clauses joined by `AND`.
fn passes_filter(msg: &Message, filter: &str) -> bool {
    for clause in filter.split(" AND ") {
        let clause = clause.trim();
        if let Some(rest) = clause.strip_prefix("createTime > ") {
            let bound = rest.trim_matches('"');
            if msg.create_time.as_str() <= bound {
                return false;
            }
        } else if let Some(rest) = clause.strip_prefix("createTime < ") {
            let bound = rest.trim_matches('"');
            if msg.create_time.as_str() >= bound {
                return false;
            }
        }
    }
    true
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn list_spaces(&self) -> Result<Vec<Space>> {
        Ok(self.spaces.read().clone())
    }

    async fn list_messages(&self, space: &str, opts: &ListMessagesOptions) -> Result<(Vec<Message>, Option<String>)> {
        self.list_messages_calls.write().push((space.to_string(), opts.filter.clone()));

        if self.fail_spaces.read().contains(&space.to_string()) {
            return Err(Error::BackendError(format!("mock failure for {space}")));
        }

        let all = self.messages.read().get(space).cloned().unwrap_or_default();
        let filtered: Vec<Message> = match &opts.filter {
            Some(f) => all.into_iter().filter(|m| passes_filter(m, f)).collect(),
            None => all,
        };
        let page_size = opts.page_size.clamp(1, 1000);
        let page: Vec<Message> = filtered.into_iter().take(page_size).collect();
        Ok((page, None))
    }

    async fn get_message(&self, name: &str) -> Result<Message> {
        let (space, _) = chatgate_domain::Message::parse_resource_name(name)
            .ok_or_else(|| Error::InvalidArgument(format!("not a fully-qualified message name: {name}")))?;
        self.messages
            .read()
            .get(space)
            .and_then(|msgs| msgs.iter().find(|m| m.name == name).cloned())
            .ok_or_else(|| Error::BackendError(format!("no such message: {name}")))
    }

    async fn create_message(&self, space: &str, text: &str) -> Result<Message> {
        let mut messages = self.messages.write();
        let entry = messages.entry(space.to_string()).or_default();
        let name = format!("{space}/messages/mock-{}", entry.len() + 1);
        let msg = Message::new(name, text, chrono::Utc::now().to_rfc3339());
        entry.insert(0, msg.clone());
        Ok(msg)
    }

    async fn update_message(&self, name: &str, text: &str) -> Result<Message> {
        let (space, _) = chatgate_domain::Message::parse_resource_name(name)
            .ok_or_else(|| Error::InvalidArgument(format!("not a fully-qualified message name: {name}")))?;
        let mut messages = self.messages.write();
        let entry = messages.get_mut(space).ok_or_else(|| Error::BackendError(format!("no such message: {name}")))?;
        let msg = entry
            .iter_mut()
            .find(|m| m.name == name)
            .ok_or_else(|| Error::BackendError(format!("no such message: {name}")))?;
        msg.text = text.to_string();
        Ok(msg.clone())
    }

    async fn delete_message(&self, name: &str) -> Result<()> {
        let (space, _) = chatgate_domain::Message::parse_resource_name(name)
            .ok_or_else(|| Error::InvalidArgument(format!("not a fully-qualified message name: {name}")))?;
        let mut messages = self.messages.write();
        if let Some(entry) = messages.get_mut(space) {
            entry.retain(|m| m.name != name);
        }
        Ok(())
    }

    async fn add_reaction(&self, _message: &str, _emoji: &str) -> Result<()> {
        Ok(())
    }

    async fn get_user_profile(&self, user_ref: &str) -> Result<UserProfile> {
        let canonical = chatgate_domain::user::normalize_user_ref(user_ref);
        Ok(self.profiles.read().get(&canonical).cloned().unwrap_or_else(|| UserProfile::stub(&canonical)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn filters_by_date_bounds() {
        let backend = MockChatBackend::new();
        backend.add_messages(
            "spaces/A",
            vec![
                Message::new("spaces/A/messages/1", "old", "2024-01-01T00:00:00Z"),
                Message::new("spaces/A/messages/2", "new", "2024-06-01T00:00:00Z"),
            ],
        );
        let opts = ListMessagesOptions {
            filter: Some(r#"createTime > "2024-05-01T00:00:00Z""#.to_string()),
            page_size: 10,
            ..Default::default()
        };
        let (messages, _) = backend.list_messages("spaces/A", &opts).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].name, "spaces/A/messages/2");
    }

    #[tokio::test]
    async fn failing_space_returns_backend_error() {
        let backend = MockChatBackend::new();
        backend.fail_space("spaces/B");
        let err = backend.list_messages("spaces/B", &ListMessagesOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::BackendError(_)));
    }
}
