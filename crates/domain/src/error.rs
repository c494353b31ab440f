/// Shared error type used across all chatgate crates.
///
/// Variants map onto the error taxonomy of the gateway: configuration
/// failures are fatal at startup, auth failures direct the caller to the
/// authorization flow, and `BackendError`/`InvalidArgument` are the two
/// shapes every tool-call boundary converts into a structured response.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("config not found: {0}")]
    ConfigNotFound(String),

    #[error("config key missing: {0}.{1}")]
    ConfigKeyMissing(String, String),

    #[error("config parse error: {0}")]
    ConfigParseError(String),

    #[error("auth: no credential — {0}")]
    AuthMissing(String),

    #[error("auth: refresh failed — {0}")]
    AuthRefreshFailed(String),

    #[error("auth: invalid state — {0}")]
    AuthStateInvalid(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("backend error: {0}")]
    BackendError(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable machine-readable tag for the structured tool-call failure
    /// envelope `{ error, error_type, detail }` (spec §7 propagation policy).
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::ConfigNotFound(_) => "config_not_found",
            Error::ConfigKeyMissing(..) => "config_key_missing",
            Error::ConfigParseError(_) => "config_parse_error",
            Error::AuthMissing(_) => "auth_missing",
            Error::AuthRefreshFailed(_) => "auth_refresh_failed",
            Error::AuthStateInvalid(_) => "auth_state_invalid",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::InvalidDate(_) => "invalid_date",
            Error::BackendError(_) => "backend_error",
            Error::Other(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_type_is_stable_per_variant() {
        assert_eq!(Error::InvalidDate("x".into()).error_type(), "invalid_date");
        assert_eq!(
            Error::ConfigKeyMissing("p".into(), "k".into()).error_type(),
            "config_key_missing"
        );
        assert_eq!(Error::BackendError("down".into()).error_type(), "backend_error");
    }
}
