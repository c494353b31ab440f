pub mod store;

pub use store::{resolve_config_path, ConfigStore};
