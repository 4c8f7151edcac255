//! Binary entrypoint: settings, tracing, collaborator clients, serve.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use viva_rubric::config::RubricSet;
use viva_rubric::{EvaluatorOptions, RubricEvaluator};
use viva_runtime::{HttpAssetStore, OrchestratorConfig, PipelineOrchestrator};
use viva_server::{AppState, router};
use viva_settings::VivaSettings;
use viva_speech::{AcousticAnalyzer, TranscriptionAdapter};
use viva_store::{DocumentClient, PersistenceGateway, open_pool};

/// Spoken interview answer scoring service.
#[derive(Debug, Parser)]
#[command(name = "viva-server", version)]
struct Args {
    /// Settings file path (defaults to ~/.viva/settings.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listen port from settings.
    #[arg(long)]
    port: Option<u16>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_state(settings: &VivaSettings) -> Result<AppState, Box<dyn std::error::Error>> {
    let speech_client = reqwest::Client::builder()
        .timeout(Duration::from_millis(settings.speech.timeout_ms))
        .build()?;
    let evaluator_client = reqwest::Client::builder()
        .timeout(Duration::from_millis(settings.evaluator.timeout_ms))
        .build()?;
    let asset_client = reqwest::Client::builder()
        .timeout(Duration::from_millis(settings.assets.timeout_ms))
        .build()?;
    let document_client = reqwest::Client::builder()
        .timeout(Duration::from_millis(settings.store.document_timeout_ms))
        .build()?;

    let rubrics = Arc::new(RubricSet::load_dir(std::path::Path::new(
        &settings.pipeline.rubric_dir,
    ))?);

    let pool = open_pool(&settings.store.sqlite_path)?;
    let document = settings
        .store
        .document_base_url
        .as_ref()
        .map(|base_url| DocumentClient::new(document_client, base_url.clone()));
    let gateway = Arc::new(PersistenceGateway::new(pool, document));

    // The orchestrator's per-attempt timeout sits above every client
    // timeout so client timeouts fire first and classify as transient.
    let slowest_ms = settings
        .speech
        .timeout_ms
        .max(settings.evaluator.timeout_ms)
        .max(settings.assets.timeout_ms);
    let orchestrator = PipelineOrchestrator::new(
        Arc::new(HttpAssetStore::new(asset_client)),
        AcousticAnalyzer::new(speech_client.clone(), settings.speech.base_url.clone()),
        TranscriptionAdapter::new(speech_client, settings.speech.base_url.clone()),
        Arc::new(RubricEvaluator::new(
            evaluator_client,
            EvaluatorOptions {
                base_url: settings.evaluator.base_url.clone(),
                model: settings.evaluator.model.clone(),
                api_key: settings.evaluator.api_key.clone(),
                temperature: settings.evaluator.temperature,
                max_tokens: settings.evaluator.max_tokens,
            },
        )),
        rubrics,
        gateway,
        OrchestratorConfig {
            retry: settings.retry,
            call_timeout: Duration::from_millis(slowest_ms + 5_000),
            rubric_concurrency: settings.pipeline.rubric_concurrency,
        },
    );

    let metrics = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .ok();

    Ok(AppState {
        orchestrator: Arc::new(orchestrator),
        metrics,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut signal) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            let _ = signal.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => viva_settings::load_settings_from_path(path)?,
        None => viva_settings::load_settings()?,
    };
    let port = args.port.unwrap_or(settings.server.port);

    let state = build_state(&settings)?;
    let app = router(state);

    let addr = format!("{}:{port}", settings.server.host);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "viva-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
