pub mod datefilter;
pub mod fetcher;

pub use datefilter::{build_date_filter, rfc3339_format};
pub use fetcher::{collect_messages, list_messages, FetchOptions};
