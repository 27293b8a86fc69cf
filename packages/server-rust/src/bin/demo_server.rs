//! Demo server: a tenant-scoped axum app backed by an in-memory tenant table.
//!
//! ```text
//! companyscope-demo --tenant acme=1 --tenant globex=2
//! curl -H 'Host: acme.localhost.test' http://127.0.0.1:3000/whoami
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use companyscope_core::{TenantId, TenantKey};
use companyscope_server::logging::{init_tracing, LogFormat};
use companyscope_server::{
    build_http_layers, CurrentTenant, InMemoryTenantStore, RedirectViolationHandler, ScopeConfig,
    SubdomainMatcher, TenantDirectory, TenantResolver, TenantScopeLayer, TenantStore,
};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "companyscope-demo", about = "Tenant-scoped demo server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "COMPANYSCOPE_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,
    /// Tenant to seed, as KEY=ID. Repeatable.
    #[arg(long = "tenant", value_parser = parse_tenant)]
    tenants: Vec<TenantSeed>,
    /// Fall back to the DEFAULT tenant when no valid key is derivable.
    #[arg(long, env = "COMPANYSCOPE_BOOTSTRAP")]
    bootstrap: bool,
    /// Seconds a resolved tenant stays cached.
    #[arg(long, default_value_t = 300)]
    positive_ttl_secs: u64,
    /// Seconds an unknown key stays cached.
    #[arg(long, default_value_t = 30)]
    negative_ttl_secs: u64,
    /// Upper bound on cached company keys.
    #[arg(long, default_value_t = 10_000)]
    max_cached_keys: u64,
    /// Milliseconds a tenant store query may take.
    #[arg(long, default_value_t = 5_000)]
    store_timeout_ms: u64,
    /// Minimum host labels before the first one is read as a company.
    #[arg(long, default_value_t = 3)]
    min_labels: usize,
    /// Where unknown companies are redirected.
    #[arg(long, default_value = "/wrong_company")]
    wrong_company_path: String,
    #[arg(long, value_enum, env = "COMPANYSCOPE_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Debug, Clone)]
struct TenantSeed {
    key: TenantKey,
    id: TenantId,
}

fn parse_tenant(raw: &str) -> Result<TenantSeed, String> {
    let (key, id) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=ID, got {raw:?}"))?;
    let key = TenantKey::parse(key).map_err(|err| err.to_string())?;
    if id.is_empty() {
        return Err(format!("empty tenant id for {key}"));
    }
    Ok(TenantSeed {
        key,
        id: TenantId::new(id),
    })
}

impl Args {
    fn scope_config(&self) -> ScopeConfig {
        ScopeConfig {
            bootstrap_mode: self.bootstrap,
            positive_ttl: Some(Duration::from_secs(self.positive_ttl_secs)),
            negative_ttl: Some(Duration::from_secs(self.negative_ttl_secs)),
            max_cached_keys: self.max_cached_keys,
            store_timeout: Some(Duration::from_millis(self.store_timeout_ms)),
            ..ScopeConfig::default()
        }
    }
}

async fn whoami(CurrentTenant(id): CurrentTenant) -> Json<serde_json::Value> {
    Json(json!({ "tenant_id": id }))
}

async fn wrong_company() -> &'static str {
    "No such company."
}

async fn healthz(State(directory): State<Arc<TenantDirectory>>) -> Json<serde_json::Value> {
    let stats = directory.stats().await;
    Json(json!({
        "state": "ready",
        "cache": {
            "hits": stats.hits,
            "misses": stats.misses,
            "store_queries": stats.store_queries,
            "cached_keys": stats.cached_keys,
        },
    }))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format)?;

    let config = args.scope_config();
    let store = Arc::new(InMemoryTenantStore::new());
    for seed in &args.tenants {
        store.insert(seed.key.clone(), seed.id.clone());
    }
    tracing::info!(tenants = store.len(), bootstrap = config.bootstrap_mode, "tenant table seeded");

    let directory = Arc::new(TenantDirectory::new(
        Arc::clone(&store) as Arc<dyn TenantStore>,
        &config,
    ));
    if config.bootstrap_mode {
        directory.warm_default().await;
    }

    let purge_every = config.negative_ttl.unwrap_or(Duration::from_secs(60));
    tokio::spawn({
        let directory = Arc::clone(&directory);
        async move {
            let mut ticker = tokio::time::interval(purge_every);
            loop {
                ticker.tick().await;
                directory.purge_expired().await;
            }
        }
    });

    let matcher = SubdomainMatcher::new().with_min_labels(args.min_labels);
    let resolver = TenantResolver::new(Arc::new(matcher), Arc::clone(&directory), &config);
    let scope_layer = TenantScopeLayer::new(resolver, &config).with_violation_handler(Arc::new(
        RedirectViolationHandler::new(args.wrong_company_path.clone()),
    ));

    let scoped = Router::new()
        .route("/whoami", get(whoami))
        .layer(build_http_layers(scope_layer));
    let app = Router::new()
        .route(&args.wrong_company_path, get(wrong_company))
        .route("/healthz", get(healthz))
        .with_state(directory)
        .merge(scoped);

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
