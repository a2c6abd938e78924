//! Command-line interface parsing and startup sequencing
//!
//! This module parses command-line arguments, initializes logging, loads
//! configuration, and hands the assembled dispatcher to the HTTP server.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::core::config::Config;
use crate::core::dispatch::Dispatcher;
use crate::server;

#[derive(Parser)]
#[command(name = "genisi-relay")]
#[command(about = "Bilingual chat relay with tiered model backends")]
#[command(
    long_about = "GENISI Relay accepts { mode, prompt } chat requests over HTTP and forwards \
each prompt to the upstream selected by the mode: 'pro' and 'light' map to \
models on the shared chat-completion endpoint, 'basic' targets a separately \
configured fallback endpoint. The relay always answers with { reply }, \
substituting placeholder text when an upstream fails.\n\n\
Environment Variables:\n\
  OPENROUTER_API_KEY  Bearer credential for the chat-completion endpoint\n\
  BASIC_ENDPOINT      URL of the basic fallback endpoint\n\
  PORT                Port for the HTTP listener (default 3000)\n\n\
Configuration:\n\
  A TOML file in the platform config directory (override with --config) can\n\
  set the same values plus per-mode model overrides, the assistant persona,\n\
  and the upstream request timeout. Environment variables win over the file.\n\n\
Routes:\n\
  POST /api/chat    { \"mode\": \"pro\"|\"light\"|\"basic\", \"prompt\": \"...\" }\n\
  GET  /health      liveness probe\n\
  GET  /metrics     dispatch outcome counters"
)]
pub struct Args {
    /// Port for the HTTP listener
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to an alternate configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

pub async fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match &args.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    // Missing configuration is a deployment-time problem; surface it once
    // at startup.
    if config.api_key.is_none() {
        warn!("no chat API credential configured; pro/light requests depend on the basic fallback");
    }
    if config.basic_endpoint.is_none() {
        warn!("no basic endpoint configured; basic requests will answer with a placeholder");
    }

    let port = args.port.or(config.port).unwrap_or(server::DEFAULT_PORT);
    let dispatcher = Arc::new(Dispatcher::new(&config)?);
    server::serve(port, dispatcher).await
}
