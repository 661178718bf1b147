use anyhow::{Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand};
use mien_core::{PresenceCheck, Recognition, Registration};
use mien_detect::SeetaDetector;
use mien_store::{SqliteStore, StoreConfig};
use std::io::Read;

mod config;
mod report;

use config::Config;

#[derive(Parser)]
#[command(name = "mien", about = "Mien face registration and recognition CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the image on stdin contains a face
    Check,
    /// Register the face on stdin under a name
    Register {
        /// Name to register the face under
        #[arg(short, long)]
        name: String,
    },
    /// Recognize the faces on stdin against the registration log
    Recognize,
    /// Summarize the registration log, optionally answering a keyword query
    Log {
        /// Free-text question about the log (e.g. "who was registered last?")
        #[arg(short, long)]
        query: Option<String>,
    },
}

fn main() {
    // logs go to stderr; stdout carries exactly one JSON document
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(value) => println!("{value}"),
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            println!("{}", serde_json::json!({ "error": err.to_string() }));
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<serde_json::Value> {
    let config = Config::from_env()?;

    match cli.command {
        Commands::Check => {
            let detector = SeetaDetector::load(&config.detect_model)?;
            let image = read_image_payload()?;
            let presence = PresenceCheck::new(detector).check(&image)?;
            Ok(serde_json::to_value(presence)?)
        }
        Commands::Register { name } => {
            let detector = SeetaDetector::load(&config.detect_model)?;
            let store = SqliteStore::open(&StoreConfig { path: config.db_path.clone() })?;
            let image = read_image_payload()?;

            let pipeline = Registration::new(detector, store, config.pipeline());
            let stored = pipeline.register(&image, &name)?;
            Ok(serde_json::json!({
                "success": true,
                "message": format!("Face registered successfully: {}", stored.name),
                "id": stored.id,
                "name": stored.name,
                "timestamp": stored.created_at.to_rfc3339(),
            }))
        }
        Commands::Recognize => {
            let detector = SeetaDetector::load(&config.detect_model)?;
            let store = SqliteStore::open(&StoreConfig { path: config.db_path.clone() })?;
            let image = read_image_payload()?;

            let pipeline = Recognition::new(detector, store, config.pipeline());
            let faces = pipeline.recognize(&image)?;
            Ok(serde_json::json!({ "faces": faces }))
        }
        Commands::Log { query } => {
            let store = SqliteStore::open(&StoreConfig { path: config.db_path.clone() })?;
            report::answer(&store, query.as_deref())
        }
    }
}

/// Read a base64 image payload from stdin. Tolerates a `data:...;base64,`
/// header and embedded whitespace, as browser-captured payloads carry both.
fn read_image_payload() -> Result<Vec<u8>> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("reading image payload from stdin")?;
    decode_payload(&raw)
}

fn decode_payload(raw: &str) -> Result<Vec<u8>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        anyhow::bail!("empty image payload on stdin");
    }
    let encoded = match trimmed.split_once(',') {
        Some((_, body)) => body,
        None => trimmed,
    };
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .context("invalid base64 image payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_base64() {
        let bytes = decode_payload("aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_strips_data_url_header() {
        let bytes = decode_payload("data:image/jpeg;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_tolerates_embedded_whitespace() {
        let bytes = decode_payload("aGVs\nbG8=\n").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_rejects_empty_payload() {
        assert!(decode_payload("").is_err());
        assert!(decode_payload("   \n").is_err());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_payload("!!not base64!!").is_err());
    }
}
