use async_trait::async_trait;
use chatgate_domain::error::Result;
use chatgate_domain::{Message, Space, UserProfile};

/// Options for `ChatBackend::list_messages`, pre-combined by the caller
/// (the filter already ANDs any date-window clause from the Date-Filter
/// Builder — spec §4.5).
#[derive(Debug, Clone, Default)]
pub struct ListMessagesOptions {
    pub filter: Option<String>,
    pub page_size: usize,
    pub page_token: Option<String>,
    pub order_by: Option<String>,
}

/// The external chat-provider capability the core calls against. Kept
/// deliberately thin — wire format, pagination quirks, and exact JSON
/// shapes are out of scope (spec §1 Non-goals); only the operations the
/// Search Core and Message Fetcher actually invoke are declared here
/// (spec §9 "Polymorphism over capability sets").
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn list_spaces(&self) -> Result<Vec<Space>>;

    async fn list_messages(&self, space: &str, opts: &ListMessagesOptions) -> Result<(Vec<Message>, Option<String>)>;

    async fn get_message(&self, name: &str) -> Result<Message>;

    async fn create_message(&self, space: &str, text: &str) -> Result<Message>;

    async fn update_message(&self, name: &str, text: &str) -> Result<Message>;

    async fn delete_message(&self, name: &str) -> Result<()>;

    async fn add_reaction(&self, message: &str, emoji: &str) -> Result<()>;

    async fn get_user_profile(&self, user_ref: &str) -> Result<UserProfile>;
}
