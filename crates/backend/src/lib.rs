pub mod google;
pub mod mock;
pub mod trait_def;

pub use google::GoogleChatBackend;
pub use mock::MockChatBackend;
pub use trait_def::{ChatBackend, ListMessagesOptions};
