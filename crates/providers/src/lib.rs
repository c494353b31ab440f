pub mod loader;

pub use loader::{
    google_auth_endpoint, google_token_endpoint, resolve_oauth_client, LoadedProvider,
    ProviderLoader,
};
