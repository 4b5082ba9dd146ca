use std::sync::Arc;

use anyhow::Result;
use botline_common::Config;
use botline_dispatch::{Dispatcher, SignatureVerifier, WebhookState};
use botline_server::{app, BotHandler, EchoReplyGenerator};
use botline_state::{MemoryProfileCache, NoProfileCache, ProfileCache, StateServices};
use botline_store::{DocumentStore, MemoryDocumentStore, PgDocumentStore};
use line_client::LineClient;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("botline=info".parse()?))
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let pool = sqlx::PgPool::connect(url).await?;
            let store = PgDocumentStore::new(pool);
            store.migrate().await?;
            info!("Using Postgres document store");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, state is in memory and lost on restart");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    let profile_cache: Arc<dyn ProfileCache> = if config.profile_cache_enabled {
        Arc::new(MemoryProfileCache::new())
    } else {
        Arc::new(NoProfileCache)
    };

    let state = Arc::new(StateServices::new(store, profile_cache));
    let messenger =
        Arc::new(LineClient::new(config.channel_access_token.clone()).with_base_url(&config.line_api_base));
    let handler = Arc::new(BotHandler::new(state, messenger, Arc::new(EchoReplyGenerator)));

    let dispatcher = Dispatcher::new(handler, config.handler_timeout);
    let webhook = Arc::new(WebhookState {
        verifier: SignatureVerifier::new(config.channel_secret.clone()),
        dispatcher: dispatcher.clone(),
    });

    let addr = config.listen_addr();
    info!("Botline starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(webhook))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(
        in_flight = dispatcher.in_flight(),
        "Server stopped, draining event handlers"
    );
    let abandoned = dispatcher.drain(config.drain_timeout).await;
    if abandoned > 0 {
        warn!(abandoned, "Drain timed out, abandoning running handlers");
    } else {
        info!("All event handlers finished");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
