//! Orchestrator entry point (spec §4.10-§4.11, C11). Wires the provider
//! loader, tool registry, and auth server together the way
//! `src/server.py`'s `main()` sequences `initialize_provider_config` →
//! `load_provider_modules` → token-path gate → either the local auth
//! server or the tool-serving run loop, re-expressed as an `anyhow`
//! boundary around the Result-returning crates beneath it, the way the
//! teacher's `sa-gateway`/`serial_assistant` root binaries do.

mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chatgate_auth::{AuthServer, AuthServerConfig, TokenStore};
use chatgate_config::{resolve_config_path, ConfigStore};
use chatgate_providers::{google_auth_endpoint, google_token_endpoint, resolve_oauth_client, ProviderLoader};
use chatgate_registry::ToolRegistry;

use cli::{Cli, Command, TokenAction};

fn init_tracing(debug: bool) {
    let default_filter = if debug { "info,chatgate=debug" } else { "info,chatgate=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .json()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config_store = Arc::new(ConfigStore::new(resolve_config_path()));
    let registry = Arc::new(ToolRegistry::new());
    let loader = ProviderLoader::new(config_store.clone(), registry.clone());

    if let Some(Command::Token { action }) = &cli.command {
        return run_token_command(&config_store, action).await;
    }

    if cli.list_providers {
        match loader.get_available_providers() {
            Ok(providers) if !providers.is_empty() => {
                println!("Available providers:");
                for (name, description) in providers {
                    println!("  - {name}: {description}");
                }
            }
            Ok(_) => println!("No providers found in configuration."),
            Err(e) => {
                tracing::error!(error = %e, "failed to list providers");
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let Some(provider) = cli.provider.clone() else {
        tracing::error!("no provider specified; use --provider or --list-providers");
        eprintln!("No provider specified. Use --provider to specify a provider or --list-providers to see available providers.");
        std::process::exit(1);
    };

    let record = match loader.initialize_provider_config(&provider) {
        Ok(record) => {
            tracing::info!(provider = %provider, "initialized provider configuration");
            record
        }
        Err(e) => {
            tracing::error!(provider = %provider, error = %e, "error initializing provider configuration");
            std::process::exit(1);
        }
    };

    let loaded = match loader.load_provider(&provider) {
        Ok(loaded) => {
            tracing::info!(provider = %provider, "loaded provider");
            loaded
        }
        Err(e) => {
            tracing::error!(provider = %provider, error = %e, "error loading provider");
            std::process::exit(1);
        }
    };

    let token_exists = loader.token_path_exists(&provider).unwrap_or(false);
    if !token_exists && !cli.local_auth {
        tracing::warn!(token_path = %record.token_path, "token file does not exist");
        eprintln!("\nToken file not found: {}", record.token_path);
        eprintln!("Please run with --local-auth to authenticate first:");
        eprintln!("  chatgate --provider {provider} --local-auth");
        std::process::exit(1);
    }

    if cli.local_auth {
        let port = record.port.unwrap_or(cli.port);
        let callback_url = record
            .callback_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{port}/auth/callback", cli.host));

        println!("\nStarting local authentication server for {provider} at http://{}:{port}", cli.host);
        println!("Available endpoints:");
        println!("  - /auth   : Start OAuth authentication flow");
        println!("  - /status : Check authentication status");
        println!("  - /auth/callback : OAuth callback endpoint");
        println!("\nCallback URL: {callback_url}");
        println!("Token will be stored at: {}", record.token_path);
        println!("\nPress CTRL+C to stop the server");
        println!("{}", "-".repeat(50));

        let oauth_client = resolve_oauth_client(&provider, &record);
        let auth_config = AuthServerConfig {
            host: cli.host.clone(),
            port,
            client_id: oauth_client.client_id.clone(),
            client_secret: oauth_client.client_secret.clone(),
            auth_endpoint: google_auth_endpoint().to_string(),
            token_endpoint: google_token_endpoint().to_string(),
            scopes: record.scopes.clone(),
            redirect_uri: callback_url,
        };
        let server = AuthServer::new(auth_config, loaded.token_store.clone());
        server.serve().await?;
        return Ok(());
    }

    tracing::info!(provider = %provider, "starting tool-serving gateway");
    let provider_tools = registry.get_provider_tools(&provider);
    if provider_tools.is_empty() {
        tracing::warn!(provider = %provider, "no tools were registered for this provider");
    } else {
        tracing::info!(provider = %provider, count = provider_tools.len(), "registered provider tools");
        for tool in &provider_tools {
            tracing::info!(tool = %tool.composite_key(), "tool available");
        }
    }
    let all_tools = registry.get_all_tools();
    tracing::info!(count = all_tools.len(), "registered tools in central registry");

    // Serving the registered tools over a wire protocol (MCP or otherwise)
    // is out of scope; the gateway's observable contract ends at a
    // populated `ToolRegistry` (spec §1 Non-goals).
    tracing::info!(provider = %provider, "gateway ready; tool registry populated, no wire server attached");
    Ok(())
}

async fn run_token_command(config_store: &Arc<ConfigStore>, action: &TokenAction) -> anyhow::Result<()> {
    let (provider, force_refresh) = match action {
        TokenAction::Status { provider } => (provider.clone(), false),
        TokenAction::Refresh { provider } => (provider.clone(), true),
    };

    let record = config_store.get_provider_config(&provider)?;
    let oauth_client = resolve_oauth_client(&provider, &record);
    let token_store = TokenStore::new(record.token_path.clone(), oauth_client);

    if force_refresh {
        let credential = token_store.refresh().await?;
        println!("{}", serde_json::json!({ "status": "success", "expires_at": credential.expiry }));
    } else {
        match token_store.get_credential().await {
            Some(cred) if cred.is_valid() => println!(
                "{}",
                serde_json::json!({
                    "status": "authenticated",
                    "expires_at": cred.expiry,
                    "has_refresh_token": cred.has_refresh_token(),
                })
            ),
            Some(_) => println!("{}", serde_json::json!({ "status": "expired" })),
            None => println!("{}", serde_json::json!({ "status": "not_authenticated" })),
        }
    }
    Ok(())
}
