use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use feed_algorithm::{Config, Engine};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feed_probe=info,feed_algorithm=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(|s| s.as_str()) {
        None | Some("help") => {
            print_help();
            Ok(())
        }

        Some("check") => {
            let engine = Engine::connect(&config).context("Failed to initialize feed engine")?;
            match engine.health_check().await {
                Ok(()) => {
                    info!("Neo4j connection OK ({})", config.neo4j.uri);
                    Ok(())
                }
                Err(e) => {
                    error!("Neo4j health check failed: {}", e);
                    Err(e.into())
                }
            }
        }

        Some(viewer) => {
            if args.len() < 3 {
                print_help();
                return Err(anyhow!("expected <viewer> <start> <end> [limit]"));
            }

            let start = parse_time(&args[1]).context("Invalid start")?;
            let end = parse_time(&args[2]).context("Invalid end")?;
            let limit = match args.get(3) {
                Some(raw) => raw.parse::<usize>().context("Invalid limit")?,
                None => 20,
            };

            let engine = Engine::connect(&config).context("Failed to initialize feed engine")?;
            let entries = engine.try_get_feed(viewer, start, end, limit).await?;

            info!("{} entries for {}", entries.len(), viewer);
            for entry in entries {
                println!("{}", serde_json::to_string(&entry)?);
            }
            Ok(())
        }
    }
}

/// Epoch seconds or RFC 3339
fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(secs) = raw.parse::<i64>() {
        return DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| anyhow!("timestamp {} out of range", secs));
    }

    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn print_help() {
    println!("Feed probe");
    println!();
    println!("Usage:");
    println!("  feed-probe <viewer-pubkey> <start> <end> [limit]");
    println!("  feed-probe check");
    println!();
    println!("<start> and <end> are epoch seconds or RFC 3339 timestamps (both exclusive).");
    println!();
    println!("Environment Variables:");
    println!("  NEO4J_URI                - Neo4j URI (default: bolt://neo4j:7687)");
    println!("  NEO4J_USER               - Neo4j username (default: neo4j)");
    println!("  NEO4J_PASSWORD           - Neo4j password");
    println!("  FEED_QUERY_TIMEOUT_MS    - Storage deadline (default: 5000)");
    println!("  FEED_MAX_LIMIT           - Reject larger limits (default: no cap)");
    println!("  FEED_SCORING_STRATEGY    - personalized | distinct_author");
    println!("  FEED_AGGREGATION         - application | push_down");
    println!("  FEED_UNKNOWN_ENGAGEMENT  - reject | ignore");
}
