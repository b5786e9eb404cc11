use std::sync::Arc;

use threadwise::analysis::{Classifier, ThreadProcessor, WorkspaceAnalyzer};
use threadwise::clients::jira::{JiraClient, TicketClient, TicketRegistry};
use threadwise::clients::slack::{ChatClient, SlackClient};
use threadwise::config::{AppConfig, SlackAuth};
use threadwise::cron::CronOrchestrator;
use threadwise::dispatch::backend_for;
use threadwise::llm::{ModelClient, OpenRouterClient};
use threadwise::server::api_routes;
use threadwise::workspace::{StaticWorkspaceStore, WorkspaceStore};

const DEFAULT_THREAD_THRESHOLD: u32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Error: {e}");
        anyhow::anyhow!("configuration invalid")
    })?;

    tracing::info!(
        environment = config.environment.as_str(),
        execution_mode = config.execution_mode.as_str(),
        "Starting threadwise"
    );

    // ── Clients ─────────────────────────────────────────────────────────
    let (chat, channel_id): (Arc<dyn ChatClient>, Option<String>) = match &config.auth {
        SlackAuth::SingleWorkspace {
            bot_token,
            channel_id,
        } => (
            Arc::new(SlackClient::new(bot_token.clone())),
            channel_id.clone(),
        ),
        SlackAuth::MultiWorkspace { .. } => {
            anyhow::bail!("multi-workspace deployment requires a token store, none is configured");
        }
    };

    let model: Arc<dyn ModelClient> = Arc::new(OpenRouterClient::new(config.model.clone())?);

    let registry = Arc::new(TicketRegistry::new(
        config
            .jira
            .clone()
            .map(|jira| Arc::new(JiraClient::new(jira)) as Arc<dyn TicketClient>),
    ));

    // ── Workspaces ──────────────────────────────────────────────────────
    let store: Arc<dyn WorkspaceStore> = match channel_id {
        Some(channel) => Arc::new(StaticWorkspaceStore::single(
            channel,
            DEFAULT_THREAD_THRESHOLD,
        )),
        None => {
            tracing::warn!("SLACK_CHANNEL_ID not set; no channels will be scanned");
            Arc::new(StaticWorkspaceStore::new(vec![]))
        }
    };

    let processor = ThreadProcessor::new(chat.clone(), Classifier::new(model), registry);
    let analyzer = Arc::new(WorkspaceAnalyzer::new(chat, processor, store.clone()));

    // ── HTTP server ─────────────────────────────────────────────────────
    let app = api_routes(analyzer, config.environment);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "API server started");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    // ── Cron ────────────────────────────────────────────────────────────
    if config.cron.enabled {
        let backend = backend_for(&config)?;
        let orchestrator = Arc::new(CronOrchestrator::new(backend, store));
        orchestrator.start(&config.cron)?;
    } else {
        tracing::info!("Cron disabled; analyses run on demand only");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}
