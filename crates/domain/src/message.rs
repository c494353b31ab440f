use serde::{Deserialize, Serialize};

use crate::space::SpaceInfo;
use crate::user::UserProfile;

/// A single chat message, identified by the hierarchical resource name
/// `spaces/{S}/messages/{M}`.
///
/// Messages are owned by the backend; this system only ever holds
/// transient snapshots fetched for a single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "createTime")]
    pub create_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_info: Option<UserProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_info: Option<SpaceInfo>,
}

impl Message {
    pub fn new(name: impl Into<String>, text: impl Into<String>, create_time: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            create_time: create_time.into(),
            sender: None,
            thread: None,
            annotations: Vec::new(),
            sender_info: None,
            space_info: None,
        }
    }

    /// Splits `spaces/{S}/messages/{M}` into `(space, message)`, rejecting
    /// bare ids — per spec §6, message-scoped tools require the fully
    /// qualified resource name.
    pub fn parse_resource_name(name: &str) -> Option<(&str, &str)> {
        let mut parts = name.splitn(4, '/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("spaces"), Some(space_id), Some("messages"), Some(message_id)) if !space_id.is_empty() && !message_id.is_empty() => {
                let space_end = "spaces/".len() + space_id.len();
                Some((&name[..space_end], &name[space_end + "/messages/".len()..]))
            }
            _ => None,
        }
    }
}

/// A thread identity, distinct from any single message's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub name: String,
}

/// A structured marker inside a message, e.g. a user mention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    #[serde(rename = "type")]
    pub annotation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_mention: Option<UserMention>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMention {
    pub user: String,
}
