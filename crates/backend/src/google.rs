//! Minimal real `ChatBackend` implementation against the Google Chat
//! REST API. Wire-format specifics (exact JSON shapes, pagination
//! quirks) are a declared Non-goal of the spec; this module exists so
//! the gateway is runnable end-to-end, grounded in the teacher's
//! `GoogleProvider` (client construction, URL-builder helpers).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatgate_domain::error::{Error, Result};
use chatgate_domain::{Message, Space, UserProfile};
use serde::Deserialize;
use serde_json::json;

use chatgate_auth::TokenStore;

use crate::trait_def::{ChatBackend, ListMessagesOptions};

const DEFAULT_BASE_URL: &str = "https://chat.googleapis.com/v1";

pub struct GoogleChatBackend {
    http: reqwest::Client,
    token_store: Arc<TokenStore>,
    base_url: String,
}

impl GoogleChatBackend {
    pub fn new(token_store: Arc<TokenStore>) -> Self {
        Self::with_base_url(token_store, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(token_store: Arc<TokenStore>, base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("building reqwest client");
        Self { http, token_store, base_url }
    }

    async fn bearer_token(&self) -> Result<String> {
        self.token_store
            .get_credential()
            .await
            .map(|c| c.access_token)
            .ok_or_else(|| Error::AuthMissing("no valid Google Chat credential — authenticate first".into()))
    }

    fn resource_url(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource)
    }

    fn messages_url(&self, space: &str) -> String {
        format!("{}/{}/messages", self.base_url, space)
    }

    fn message_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    async fn authed_request(&self, method: reqwest::Method, url: &str) -> Result<reqwest::RequestBuilder> {
        let token = self.bearer_token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::BackendError(format!("reading response body: {e}")))?;
        if !status.is_success() {
            return Err(Error::BackendError(format!("HTTP {}: {}", status.as_u16(), body)));
        }
        serde_json::from_str(&body).map_err(|e| Error::BackendError(format!("parsing response: {e} (body: {body})")))
    }
}

#[derive(Debug, Deserialize)]
struct ListSpacesResponse {
    #[serde(default)]
    spaces: Vec<Space>,
}

#[derive(Debug, Deserialize)]
struct ListMessagesResponse {
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[async_trait]
impl ChatBackend for GoogleChatBackend {
    async fn list_spaces(&self) -> Result<Vec<Space>> {
        let url = format!("{}/spaces", self.base_url);
        let resp = self
            .authed_request(reqwest::Method::GET, &url)
            .await?
            .send()
            .await
            .map_err(|e| Error::BackendError(format!("list_spaces request failed: {e}")))?;
        let parsed: ListSpacesResponse = Self::handle_response(resp).await?;
        Ok(parsed.spaces)
    }

    async fn list_messages(&self, space: &str, opts: &ListMessagesOptions) -> Result<(Vec<Message>, Option<String>)> {
        let page_size = opts.page_size.clamp(1, 1000);
        let mut query: Vec<(&str, String)> = vec![("pageSize", page_size.to_string())];
        if let Some(filter) = &opts.filter {
            query.push(("filter", filter.clone()));
        }
        if let Some(token) = &opts.page_token {
            query.push(("pageToken", token.clone()));
        }
        query.push(("orderBy", opts.order_by.clone().unwrap_or_else(|| "createTime desc".to_string())));

        let token = self.bearer_token().await?;
        let resp = self
            .http
            .get(self.messages_url(space))
            .bearer_auth(token)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::BackendError(format!("list_messages request failed: {e}")))?;
        let parsed: ListMessagesResponse = Self::handle_response(resp).await?;
        Ok((parsed.messages, parsed.next_page_token))
    }

    async fn get_message(&self, name: &str) -> Result<Message> {
        let url = self.message_url(name);
        let resp = self
            .authed_request(reqwest::Method::GET, &url)
            .await?
            .send()
            .await
            .map_err(|e| Error::BackendError(format!("get_message request failed: {e}")))?;
        Self::handle_response(resp).await
    }

    async fn create_message(&self, space: &str, text: &str) -> Result<Message> {
        let token = self.bearer_token().await?;
        let resp = self
            .http
            .post(self.messages_url(space))
            .bearer_auth(token)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| Error::BackendError(format!("create_message request failed: {e}")))?;
        Self::handle_response(resp).await
    }

    async fn update_message(&self, name: &str, text: &str) -> Result<Message> {
        let token = self.bearer_token().await?;
        let resp = self
            .http
            .patch(self.message_url(name))
            .bearer_auth(token)
            .query(&[("updateMask", "text")])
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| Error::BackendError(format!("update_message request failed: {e}")))?;
        Self::handle_response(resp).await
    }

    async fn delete_message(&self, name: &str) -> Result<()> {
        let url = self.message_url(name);
        let resp = self
            .authed_request(reqwest::Method::DELETE, &url)
            .await?
            .send()
            .await
            .map_err(|e| Error::BackendError(format!("delete_message request failed: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::BackendError(format!("HTTP {}: {}", status.as_u16(), body)));
        }
        Ok(())
    }

    async fn add_reaction(&self, message: &str, emoji: &str) -> Result<()> {
        let token = self.bearer_token().await?;
        let url = format!("{}/{}/reactions", self.base_url, message);
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&json!({ "emoji": { "unicode": emoji } }))
            .send()
            .await
            .map_err(|e| Error::BackendError(format!("add_reaction request failed: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::BackendError(format!("HTTP {}: {}", status.as_u16(), body)));
        }
        Ok(())
    }

    async fn get_user_profile(&self, user_ref: &str) -> Result<UserProfile> {
        let canonical = chatgate_domain::user::normalize_user_ref(user_ref);
        let url = self.resource_url(&canonical);
        let resp = self
            .authed_request(reqwest::Method::GET, &url)
            .await?
            .send()
            .await
            .map_err(|e| Error::BackendError(format!("get_user_profile request failed: {e}")))?;
        Self::handle_response(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_url_joins_base_and_resource_name() {
        let backend = GoogleChatBackend::with_base_url(
            Arc::new(TokenStore::new(
                std::env::temp_dir().join("chatgate-test-token.json"),
                chatgate_auth::OAuthClient {
                    client_id: "x".into(),
                    client_secret: None,
                    token_endpoint: "https://example.invalid/token".into(),
                },
            )),
            "https://chat.googleapis.com/v1".into(),
        );
        assert_eq!(backend.message_url("spaces/AAA/messages/123"), "https://chat.googleapis.com/v1/spaces/AAA/messages/123");
        assert_eq!(backend.messages_url("spaces/AAA"), "https://chat.googleapis.com/v1/spaces/AAA/messages");
    }
}
