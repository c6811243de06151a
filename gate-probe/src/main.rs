// ABOUTME: Fetches a list of API URLs concurrently through a rate-limited client.
// ABOUTME: Demonstrates quotagate retuning and cooldowns against a live API.

use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use quotagate::prelude::*;

/// Load the scheduler config from `QUOTAGATE_CONFIG` (a JSON file), if set.
fn load_config() -> Result<SchedulerConfig> {
    let Ok(path) = std::env::var("QUOTAGATE_CONFIG") else {
        return Ok(SchedulerConfig::default());
    };

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading scheduler config {}", path))?;
    let config: SchedulerConfig =
        serde_json::from_str(&raw).with_context(|| format!("parsing scheduler config {}", path))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        bail!("usage: gate-probe <url> [<url> ...]");
    }

    let scheduler = Scheduler::with_config(load_config()?)?;
    let mut client = RateLimitedClient::new(scheduler.clone());
    if let Ok(token) = std::env::var("API_TOKEN") {
        client = client.with_bearer_token(token);
    }

    let started = Instant::now();
    let results = futures::future::join_all(
        urls.iter()
            .map(|url| client.get_json::<serde_json::Value>(url)),
    )
    .await;

    let mut failures = 0;
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(body) => println!("ok    {} ({} bytes)", url, body.to_string().len()),
            Err(err) => {
                failures += 1;
                println!("error {}: {}", url, err);
            }
        }
    }

    let limits = scheduler.limits();
    println!(
        "\n{} calls in {:.1}s, {} failed; limits now {}/s {}/min",
        urls.len(),
        started.elapsed().as_secs_f64(),
        failures,
        limits.per_second,
        limits.per_minute
    );
    if let Some(cooldown) = scheduler.cooldown_remaining() {
        tracing::warn!(remaining_ms = cooldown.as_millis() as u64, "cooldown still active");
    }

    Ok(())
}
