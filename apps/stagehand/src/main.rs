//! # Stagehand - Staged Extension Bootstrapper
//!
//! The main binary for the Stagehand bootstrap engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  apps/stagehand (THE BINARY)                │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌────────────────┐  │
//! │  │    CLI      │    │   Config    │    │   Built-in     │  │
//! │  │   (clap)    │    │   (toml)    │    │    stores      │  │
//! │  └──────┬──────┘    └──────┬──────┘    └───────┬────────┘  │
//! │         └──────────────────┼───────────────────┘           │
//! │                            ▼                               │
//! │                   ┌────────────────┐                       │
//! │                   │ stagehand-core │                       │
//! │                   │  (THE ENGINE)  │                       │
//! │                   └────────────────┘                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! stagehand init --root ./app
//! stagehand plan --root ./app
//! stagehand run --root ./app --timeout 30
//! ```

use clap::Parser;
use stagehand::cli;
use stagehand::config::{LOG_FORMAT_ENV, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    let settings = cli::resolve_settings(&cli);

    // STAGEHAND_LOG_FORMAT wins over the config file.
    let log_format = std::env::var(LOG_FORMAT_ENV)
        .map(|value| LogFormat::from_env_value(&value))
        .unwrap_or_else(|_| {
            settings
                .as_ref()
                .map(|s| s.log_format)
                .unwrap_or_default()
        });
    init_tracing(log_format);

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli.command, &settings, cli.json_mode).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so `--json-mode` output stays parseable.
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stagehand=info,stagehand_core=info".into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Print the Stagehand startup banner.
fn print_banner() {
    println!(
        r#"
  stagehand v{}

  Staged • Ordered • Reconciled
"#,
        env!("CARGO_PKG_VERSION")
    );
}
