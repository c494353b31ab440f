pub mod config;
pub mod contractions;
pub mod credential;
pub mod error;
pub mod message;
pub mod search;
pub mod space;
pub mod tool;
pub mod user;

pub use credential::Credential;
pub use error::{Error, Result};
pub use message::{Annotation, Message, Thread, UserMention};
pub use search::{DateWindow, ScoredMessage, SearchMetadata, SearchMode, SearchQuery, SearchResponse, SearchedSpaces};
pub use space::{Space, SpaceInfo, SpaceType};
pub use tool::{ParamSpec, ToolDescriptor};
pub use user::UserProfile;
