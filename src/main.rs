//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run.
//! No business logic here.
//!
//! Modes:
//! - `serve` (default): run the gateway HTTP service
//! - `analyze <channel> [lang] [depth]`: drive one job against a gateway URL

use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use hub_analyzer::adapters::auth::{HttpSessionAdapter, StaticSessions};
use hub_analyzer::adapters::cms::{CmsHttpAdapter, MemoryCms};
use hub_analyzer::adapters::gateway_api::GatewayApiClient;
use hub_analyzer::adapters::http::{router, AppState};
use hub_analyzer::domain::ReportLanguage;
use hub_analyzer::ports::{CmsPort, SessionPort};
use hub_analyzer::shared::config::AppConfig;
use hub_analyzer::usecases::{GatewayService, JobClient, JobState};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!("no .env found"),
    }

    let cfg = AppConfig::load().unwrap_or_default();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(|s| s.as_str()) {
        None | Some("serve") => serve(cfg).await,
        Some("analyze") => analyze(cfg, &args[1..]).await,
        Some(other) => anyhow::bail!("unknown mode '{}' (expected: serve | analyze)", other),
    }
}

async fn serve(cfg: AppConfig) -> anyhow::Result<()> {
    let cms: Arc<dyn CmsPort> = if cfg.is_cms_configured() {
        let base_url = cfg.cms_base_url.clone().unwrap_or_default();
        info!(url = %base_url, "CMS adapter enabled");
        Arc::new(CmsHttpAdapter::new(
            base_url,
            cfg.cms_email.clone().unwrap_or_default(),
            cfg.cms_password.clone().unwrap_or_default(),
        ))
    } else {
        warn!("HUB_CMS_BASE_URL/HUB_CMS_EMAIL/HUB_CMS_PASSWORD not set, using in-memory store");
        Arc::new(MemoryCms::new())
    };

    let sessions: Arc<dyn SessionPort> = if cfg.is_auth_configured() {
        let base_url = cfg.auth_base_url.clone().unwrap_or_default();
        info!(url = %base_url, "session verification enabled");
        Arc::new(HttpSessionAdapter::new(base_url))
    } else {
        warn!("HUB_AUTH_BASE_URL not set, all callers are anonymous");
        Arc::new(StaticSessions::new())
    };

    let gateway = Arc::new(GatewayService::new(
        cms,
        cfg.analyzer_version_or_default(),
    ));
    let app = router(AppState { gateway, sessions });

    let bind_addr = cfg.bind_addr_or_default();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("bind {} failed: {}", bind_addr, e))?;
    info!(bind_addr = %bind_addr, "hub-analyzer gateway listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("server failed: {}", e))?;
    Ok(())
}

async fn analyze(cfg: AppConfig, args: &[String]) -> anyhow::Result<()> {
    let channel = args
        .first()
        .ok_or_else(|| anyhow::anyhow!("usage: analyze <channel> [lang] [depth]"))?;
    let language: ReportLanguage = args
        .get(1)
        .map(|s| s.parse())
        .transpose()
        .map_err(|e| anyhow::anyhow!("{}", e))?
        .unwrap_or(ReportLanguage::En);
    let depth: u32 = args.get(2).map(|s| s.parse()).transpose()?.unwrap_or(300);

    let api = Arc::new(GatewayApiClient::new(
        cfg.gateway_url_or_default(),
        cfg.session_token.clone(),
    ));
    let client = JobClient::new(
        api,
        Duration::from_millis(cfg.poll_interval_ms_or_default()),
        cfg.poll_max_attempts_or_default(),
    );
    let mut rx = client.subscribe();

    client
        .submit(channel, language, depth, None)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    loop {
        let state = rx.borrow_and_update().clone();
        match &state {
            JobState::Idle => {}
            JobState::Created { request_id } => info!(request_id, "request accepted"),
            JobState::Processing { request_id } => info!(request_id, "processing"),
            JobState::Ready { report } => {
                println!("{}", serde_json::to_string_pretty(report)?);
                break;
            }
            JobState::Failed { message } => {
                anyhow::bail!("analysis failed: {}", message);
            }
            JobState::TimedOut => {
                anyhow::bail!("analysis timed out; try again later");
            }
        }
        if rx.changed().await.is_err() {
            break;
        }
    }

    client.shutdown();
    Ok(())
}
