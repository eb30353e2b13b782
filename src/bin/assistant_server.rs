use adaptive_sql_assistant::config::AssistantConfig;
use adaptive_sql_assistant::llm::OllamaClient;
use adaptive_sql_assistant::pipeline::Assistant;
use adaptive_sql_assistant::web::start_server;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AssistantConfig::from_env();
    let port = config.port;

    let client = Arc::new(
        OllamaClient::new(
            config.completion_url.clone(),
            config.completion_model.clone(),
        )
        .with_timeout(config.completion_timeout),
    );

    // Storage initialization failures are fatal here; everything downstream
    // degrades gracefully instead.
    let assistant = Assistant::new(config, client)?;

    start_server(assistant, port).await?;
    Ok(())
}
