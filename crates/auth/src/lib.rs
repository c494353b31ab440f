pub mod server;
pub mod token_store;

pub use server::{AuthServer, AuthServerConfig};
pub use token_store::{OAuthClient, TokenStore};
