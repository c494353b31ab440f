//! Local HTTP service implementing the OAuth 2.0 authorization-code flow
//! (spec §4.3, C3). Grounded in the original `server_auth.py`'s endpoint
//! shapes, re-expressed as an `axum` router the way the teacher's
//! `sa-gateway` builds its HTTP surface.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use chatgate_domain::credential::Credential;
use chatgate_domain::error::Error;

use crate::token_store::TokenStore;

#[derive(Debug, Clone)]
pub struct AuthServerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub auth_endpoint: String,
    pub token_endpoint: String,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
}

/// A pending authorization-code flow, keyed by a single-use `state`
/// token, live from `/auth` until either callback completion or process
/// termination (spec §4.3 "State lifecycle").
struct PendingFlow {
    created_at: chrono::DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuthServer {
    config: Arc<AuthServerConfig>,
    token_store: Arc<TokenStore>,
    pending: Arc<Mutex<HashMap<String, PendingFlow>>>,
    http: reqwest::Client,
}

impl AuthServer {
    pub fn new(config: AuthServerConfig, token_store: Arc<TokenStore>) -> Self {
        Self {
            config: Arc::new(config),
            token_store,
            pending: Arc::new(Mutex::new(HashMap::new())),
            http: reqwest::Client::new(),
        }
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/auth", get(auth_handler))
            .route("/auth/callback", get(callback_handler))
            .route("/status", get(status_handler))
            .route("/auth/refresh", post(refresh_handler))
            .layer(tower_http::trace::TraceLayer::new_for_http())
            .with_state(self)
    }

    /// Binds and serves until an interrupt/terminate signal arrives,
    /// draining in-flight requests before returning (spec §5 "Cancellation
    /// and timeouts").
    pub async fn serve(self) -> std::io::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(address = %addr, "auth server listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
    }

    fn build_authorize_url(&self, state: &str) -> String {
        let scope = self.config.scopes.join(" ");
        url_with_query(
            &self.config.auth_endpoint,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("include_granted_scopes", "true"),
                ("state", state),
            ],
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential, Error> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let resp = self
            .http
            .post(&self.config.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::AuthRefreshFailed(format!("token exchange failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::AuthRefreshFailed(format!("reading token exchange response: {e}")))?;

        if !status.is_success() {
            return Err(Error::AuthRefreshFailed(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            #[serde(default)]
            refresh_token: Option<String>,
            #[serde(default)]
            expires_in: Option<i64>,
            #[serde(default)]
            scope: Option<String>,
        }
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::AuthRefreshFailed(format!("parsing token exchange response: {e}")))?;

        Ok(Credential {
            access_token: parsed.access_token,
            refresh_token: parsed.refresh_token,
            expiry: Utc::now() + chrono::Duration::seconds(parsed.expires_in.unwrap_or(3600)),
            scopes: parsed
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        })
    }
}

fn url_with_query(base: &str, params: &[(&str, &str)]) -> String {
    let mut url = reqwest::Url::parse(base).expect("valid base URL");
    {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in params {
            pairs.append_pair(k, v);
        }
    }
    url.to_string()
}

#[derive(Debug, Deserialize)]
struct AuthQuery {
    #[serde(default)]
    callback_url: Option<String>,
}

async fn auth_handler(State(server): State<AuthServer>, Query(_params): Query<AuthQuery>) -> impl IntoResponse {
    if let Some(cred) = server.token_store.get_credential().await {
        if cred.is_valid() {
            return Json(json!({ "status": "already_authenticated" })).into_response();
        }
    }

    let state_token = Uuid::new_v4().to_string();
    server.pending.lock().insert(state_token.clone(), PendingFlow { created_at: Utc::now() });
    let url = server.build_authorize_url(&state_token);
    Redirect::to(&url).into_response()
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

async fn callback_handler(State(server): State<AuthServer>, Query(params): Query<CallbackQuery>) -> impl IntoResponse {
    if let Some(error) = params.error {
        return (StatusCode::BAD_REQUEST, Json(json!({ "status": "error", "message": error }))).into_response();
    }

    let Some(state_token) = params.state else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "status": "error", "message": "missing state" }))).into_response();
    };
    let Some(code) = params.code else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "status": "error", "message": "missing code" }))).into_response();
    };

    if server.pending.lock().remove(&state_token).is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "message": "unknown or already-used state" })),
        )
            .into_response();
    }

    let credential = match server.exchange_code(&code).await {
        Ok(c) => c,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(json!({ "status": "error", "message": e.to_string() }))).into_response(),
    };

    if !credential.has_refresh_token() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "status": "error", "message": "no refresh token was issued — retry with prompt=consent" })),
        )
            .into_response();
    }

    let expiry = credential.expiry;
    let has_refresh_token = credential.has_refresh_token();
    if let Err(e) = server.token_store.save_credential(credential).await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "error", "message": e.to_string() })),
        )
            .into_response();
    }

    Json(json!({
        "status": "success",
        "expires_at": expiry,
        "has_refresh_token": has_refresh_token,
    }))
    .into_response()
}

async fn status_handler(State(server): State<AuthServer>) -> impl IntoResponse {
    match server.token_store.get_credential().await {
        Some(cred) if cred.is_valid() => Json(json!({
            "status": "authenticated",
            "expires_at": cred.expiry,
            "has_refresh_token": cred.has_refresh_token(),
            "last_refresh": server.token_store.last_refresh().await,
        }))
        .into_response(),
        Some(_) => Json(json!({ "status": "expired" })).into_response(),
        None => Json(json!({ "status": "not_authenticated" })).into_response(),
    }
}

async fn refresh_handler(State(server): State<AuthServer>) -> impl IntoResponse {
    match server.token_store.refresh().await {
        Ok(cred) => Json(json!({
            "status": "success",
            "expires_at": cred.expiry,
        }))
        .into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, Json(json!({ "status": "error", "message": e.to_string() }))).into_response(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sig = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        sig.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining in-flight requests");
    // Give in-flight handlers a moment to finish before axum stops accepting.
    tokio::time::sleep(Duration::from_millis(1)).await;
}
