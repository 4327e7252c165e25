use safemark::handlers::{error_response, handle_request, parse_request};
use safemark::{AppResult, ContentPipeline, RenderConfig};
use serde_json::Value;
use std::env;
use std::io::{self, Read, Write};
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Reads one JSON request from stdin and writes one JSON response to stdout.
fn main() -> anyhow::Result<ExitCode> {
    dotenv::dotenv().ok();
    init_tracing();

    let (response, code) = match run() {
        Ok(response) => (response, ExitCode::SUCCESS),
        Err(e) => {
            tracing::error!("Request failed: {}", e);
            (error_response(&e), ExitCode::from(2))
        }
    };

    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    Ok(code)
}

fn run() -> AppResult<Value> {
    let config = RenderConfig::from_env();
    tracing::debug!(?config, "Loaded render configuration");
    let pipeline = ContentPipeline::from_config(&config);

    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    let request = parse_request(&input)?;
    tracing::info!(op = ?request.op, bytes = request.content.len(), "Handling request");
    handle_request(&pipeline, &request, config.default_policy)
}

// Logs go to stderr; stdout carries the response only.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "safemark=info".into());
    let json = env::var("LOG_FORMAT").is_ok_and(|v| v.trim().eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(io::stderr)).init();
    }
}
