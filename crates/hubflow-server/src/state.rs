//! Wiring of the connection flow from configuration.

use anyhow::Context;
use hubflow_connect::{
    AuthorizationInitiator, ConnectSettings, ConnectState, MercadoLivreClient,
    SupabaseIdentityResolver, create_store,
};
use hubflow_core::AppConfig;
use std::sync::Arc;
use std::time::Duration;

/// Build the shared state. `cfg` must already be validated.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<ConnectState> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.provider.request_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let initiator = AuthorizationInitiator::from_config(&cfg.provider)?;
    let identity = SupabaseIdentityResolver::from_config(http.clone(), &cfg.supabase)
        .context("supabase.anon_key is required")?;
    let tokens = MercadoLivreClient::from_config(http.clone(), &cfg.provider)
        .context("provider.client_secret is required")?;
    let store = create_store(&cfg.store, &cfg.supabase, http)
        .await
        .context("failed to open credential store")?;

    tracing::info!(
        backend = ?cfg.store.backend,
        landing_page = %cfg.server.landing_page,
        "connection flow ready"
    );

    Ok(ConnectState::new(
        initiator,
        Arc::new(identity),
        Arc::new(tokens),
        store,
        ConnectSettings::from_config(cfg),
    ))
}
