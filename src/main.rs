use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

use solar_quote::chat::{ChatNotifier, ChatTransport, SlackApiTransport, SlackWebhookTransport};
use solar_quote::config::AppConfig;
use solar_quote::crm::PipedriveClient;
use solar_quote::pipeline::SubmissionPipeline;
use solar_quote::wizard::{QuoteRouteState, SessionStore, quote_routes};

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

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export PIPEDRIVE_API_TOKEN=...");
        std::process::exit(1);
    });

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    eprintln!("☀️  Solar Quote v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Quote API: http://0.0.0.0:{}/api/quote/sessions", config.port);
    eprintln!("   Pipedrive: {}", config.pipedrive.base_url);

    // ── Chat transports, in delivery order ──────────────────────────────
    let mut transports: Vec<Arc<dyn ChatTransport>> = Vec::new();
    if let Some(token) = config.slack.bot_token.clone() {
        transports.push(Arc::new(SlackApiTransport::new(
            config.slack.api_url.clone(),
            token,
            config.slack.channel.clone(),
            http.clone(),
        )));
    }
    if let Some(url) = config.slack.webhook_url.clone() {
        transports.push(Arc::new(SlackWebhookTransport::new(url, http.clone())));
    }
    let chat = ChatNotifier::new(transports);
    let names = chat.transport_names();
    eprintln!(
        "   Slack: {}",
        if names.is_empty() {
            "disabled".to_string()
        } else {
            format!("{} ({})", names.join(" → "), config.slack.channel)
        }
    );

    // ── Pipeline and sessions ───────────────────────────────────────────
    let crm = Arc::new(PipedriveClient::new(config.pipedrive.clone(), http));
    let pipeline = Arc::new(SubmissionPipeline::new(crm, chat));
    let sessions = Arc::new(SessionStore::new(
        pipeline,
        config.lead_source.clone(),
        config.session_idle_timeout,
    ));

    let cors = match &config.allowed_origin {
        Some(origin) => CorsLayer::new().allow_origin(
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid QUOTE_ALLOWED_ORIGIN: {origin}"))?,
        ),
        None => CorsLayer::new().allow_origin(Any),
    }
    .allow_methods(Any)
    .allow_headers(Any);

    let app = quote_routes(QuoteRouteState { sessions }).layer(cors);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Quote server started");
    axum::serve(listener, app).await?;

    Ok(())
}
