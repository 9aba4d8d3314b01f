//! ECG Source Client
//!
//! Connects to a hub as a named source and publishes samples, either read
//! from a file (one value per line) or generated at random.
//!
//! Run with: cargo run --bin ecg-source -- --url ws://127.0.0.1:8888/ws

use anyhow::Context;
use clap::Parser;
use ecg_hub::websocket::{Command, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ecg-source")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Publish heartbeat samples to an ECG hub")]
struct Args {
    /// Hub WebSocket URL
    #[arg(long, default_value = "ws://127.0.0.1:8888/ws")]
    url: String,

    /// Display name (default: HeartbeatSensor<N>)
    #[arg(short, long)]
    name: Option<String>,

    /// Read samples from this file instead of generating them
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Delay between samples in milliseconds (default: 1000 with --file, 250 otherwise)
    #[arg(short, long)]
    interval_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ecg_source=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut samples = match &args.file {
        Some(path) => Samples::File(read_samples(path)?.into_iter()),
        None => Samples::Random,
    };
    let default_interval = if args.file.is_some() { 1000 } else { 250 };
    let interval = Duration::from_millis(args.interval_ms.unwrap_or(default_interval));
    let name = args
        .name
        .unwrap_or_else(|| format!("HeartbeatSensor{}", rand::thread_rng().gen_range(0..=100)));

    let (ws, _) = tokio_tungstenite::connect_async(args.url.as_str())
        .await
        .with_context(|| format!("Failed to connect to {}", args.url))?;
    tracing::info!("Connected to {}", args.url);
    let (mut write, mut read) = ws.split();

    let hello = Command::SetName { name: name.clone() }.encode()?;
    write.send(Message::Text(hello)).await?;
    tracing::info!("Registered as {}", name);

    let reader = tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => log_server_message(&text),
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
        tracing::info!("Disconnected");
    });

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(value) = samples.next() else {
                    tracing::info!("Input exhausted");
                    break;
                };
                let frame = Command::Publish { value }.encode()?;
                tracing::debug!(value, "Sending sample");
                if write.send(Message::Text(frame)).await.is_err() {
                    tracing::warn!("Hub closed the connection");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    let _ = write.send(Message::Close(None)).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), reader).await;
    Ok(())
}

enum Samples {
    File(std::vec::IntoIter<f64>),
    Random,
}

impl Iterator for Samples {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        match self {
            Samples::File(values) => values.next(),
            Samples::Random => Some(f64::from(rand::thread_rng().gen_range(0..=100u8))),
        }
    }
}

fn read_samples(path: &Path) -> anyhow::Result<Vec<f64>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not open input file {}", path.display()))?;
    Ok(parse_samples(&content))
}

fn parse_samples(content: &str) -> Vec<f64> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match line.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(line = %line, "Skipping unparseable sample");
                None
            }
        })
        .collect()
}

fn log_server_message(text: &str) {
    match serde_json::from_str::<ServerMessage>(text) {
        Ok(ServerMessage::Connect { uuid }) => tracing::info!(uuid = %uuid, "Assigned uuid"),
        Ok(ServerMessage::Sources { sources }) => {
            tracing::debug!(count = sources.len(), "Source list updated")
        }
        Ok(ServerMessage::Publish { publish }) => tracing::debug!(value = publish, "Sample"),
        Err(_) => tracing::debug!(text = %text, "Unrecognized server message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_samples_skips_blank_and_bad_lines() {
        let samples = parse_samples("72.5\n\n  80 \nabc\n-1\n");
        assert_eq!(samples, vec![72.5, 80.0, -1.0]);
    }

    #[test]
    fn test_random_samples_in_range() {
        let mut samples = Samples::Random;
        for _ in 0..100 {
            let value = samples.next().unwrap();
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_file_samples_exhaust() {
        let mut samples = Samples::File(vec![1.0, 2.0].into_iter());
        assert_eq!(samples.next(), Some(1.0));
        assert_eq!(samples.next(), Some(2.0));
        assert_eq!(samples.next(), None);
    }
}
