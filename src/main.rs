use std::io::{self, Stdout};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use weather_agent::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = AgentConfig::from_env()?;

    let gateway = Arc::new(OpenAIGateway::with_config(config.openai));
    let tool = GetWeatherTool::new(WeatherClient::new(config.weather));

    let session_config = SessionConfig {
        model: config.model,
        tools: vec![Box::new(tool)],
        ..Default::default()
    };
    let streaming = session_config.streaming;
    let session = Session::create(gateway, session_config)?;

    let printer: Mutex<StreamPrinter<Stdout>> =
        Mutex::new(StreamPrinter::new(io::stdout(), streaming));
    session.on(move |event| {
        let mut printer = printer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = printer.handle(event) {
            warn!(error = %e, "Failed to write assistant output");
        }
    });

    let stdin = io::stdin();
    run_repl(stdin.lock(), io::stdout(), &session).await?;

    Ok(())
}
