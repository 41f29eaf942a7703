//! PrivX connector command line.
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`PRIVX_*`, also read from `.env`)
//! 3. Config file given with `--config` (or `PRIVX_CONFIG`)
//! 4. Embedded defaults (lowest priority)

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use privx_connector::connector::roles::assigned_entitlement;
use privx_connector::connector::{
    Annotation, Annotations, Grant, Resource, ResourceId, ROLE_RESOURCE_TYPE, USER_RESOURCE_TYPE,
};
use privx_connector::sync::Syncer;
use privx_connector::{Config, ConnectorError, PrivxConnector, ResourceProvisioner};

/// PrivX identity governance connector
#[derive(Parser, Debug)]
#[command(name = "privx-connector")]
#[command(version, about, long_about = None)]
struct Args {
    /// Config file (TOML) replacing the embedded defaults
    #[arg(long, env = "PRIVX_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// The hostname (URL) for your PrivX instance
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// The API Client ID (a UUID)
    #[arg(long, global = true)]
    api_client_id: Option<String>,

    /// The API Client Secret (a base64 string)
    #[arg(long, global = true)]
    api_client_secret: Option<String>,

    /// The OAuth Client ID (e.g. "privx-external")
    #[arg(long, global = true)]
    oauth_client_id: Option<String>,

    /// The OAuth Client Secret (a base64 string)
    #[arg(long, global = true)]
    oauth_client_secret: Option<String>,

    /// Page size for listing calls
    #[arg(long, global = true)]
    page_size: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the credentials can obtain an access token
    Verify,
    /// Sync users, roles, entitlements and grants
    Sync {
        /// Write the result here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Add a user to a role
    Grant {
        #[arg(long)]
        user: String,
        #[arg(long)]
        role: String,
    },
    /// Remove a user from a role
    Revoke {
        #[arg(long)]
        user: String,
        #[arg(long)]
        role: String,
    },
}

impl Args {
    /// Apply command line overrides on top of file/env configuration.
    fn apply_to(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.privx.base_url = base_url.clone();
        }
        if let Some(client_id) = &self.api_client_id {
            config.privx.api_client_id = client_id.clone();
        }
        if let Some(secret) = &self.api_client_secret {
            config.privx.api_client_secret = secret.as_str().into();
        }
        if let Some(client_id) = &self.oauth_client_id {
            config.privx.oauth_client_id = client_id.clone();
        }
        if let Some(secret) = &self.oauth_client_secret {
            config.privx.oauth_client_secret = secret.as_str().into();
        }
        if let Some(page_size) = self.page_size {
            config.sync.page_size = page_size;
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present) before anything else
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        if let Some(connector_error) = e.downcast_ref::<ConnectorError>() {
            eprintln!("{}", connector_error.user_message());
        }
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load(args.config.as_deref())?;
    args.apply_to(&mut config);

    init_logging(&config.logging.level);

    info!("Starting PrivX connector v{}", env!("CARGO_PKG_VERSION"));

    config.validate().context("Configuration error")?;

    let connector = PrivxConnector::from_config(&config)?;
    let ctx = cancel_on_ctrl_c();

    match args.command {
        Command::Verify => {
            connector.validate(&ctx).await?;
            info!("Credentials verified");
        }
        Command::Sync { output } => {
            let syncer = Syncer::new(connector.resource_syncers(), config.sync.page_size);
            let report = syncer.run(&ctx).await?;

            let writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(
                    File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?,
                ),
                None => Box::new(io::stdout().lock()),
            };
            let mut writer = BufWriter::new(writer);
            serde_json::to_writer_pretty(&mut writer, &report)?;
            writeln!(writer)?;
            writer.flush()?;

            for failure in &report.failures {
                warn!(
                    "{} resources were not synced: {}",
                    failure.resource_type, failure.error
                );
            }
        }
        Command::Grant { user, role } => {
            let principal = Resource::new(&USER_RESOURCE_TYPE, &user, user.clone())?;
            let entitlement =
                assigned_entitlement(&Resource::new(&ROLE_RESOURCE_TYPE, &role, role.clone())?);

            let annotations = connector
                .role_builder()
                .grant(&ctx, &principal, &entitlement)
                .await?;
            report_annotations(&annotations);
            info!("Granted role {} to user {}", role, user);
        }
        Command::Revoke { user, role } => {
            let entitlement =
                assigned_entitlement(&Resource::new(&ROLE_RESOURCE_TYPE, &role, role.clone())?);
            let grant = Grant::new(&entitlement, ResourceId::new(&USER_RESOURCE_TYPE, &user));

            let annotations = connector.role_builder().revoke(&ctx, &grant).await?;
            report_annotations(&annotations);
            info!("Revoked role {} from user {}", role, user);
        }
    }

    Ok(())
}

/// Initialize tracing/logging. Logs go to stderr so sync output on stdout stays clean.
fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Cancellation token fired by Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let ctx = CancellationToken::new();
    let trigger = ctx.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, canceling in-flight requests");
            trigger.cancel();
        }
    });

    ctx
}

fn report_annotations(annotations: &Annotations) {
    if annotations.contains(Annotation::GrantAlreadyExists) {
        info!("User already had the role; nothing changed");
    }
    if annotations.contains(Annotation::GrantAlreadyRevoked) {
        info!("User did not have the role; nothing changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_grant() {
        let args = Args::parse_from([
            "privx-connector",
            "--base-url",
            "https://privx.example.com",
            "grant",
            "--user",
            "u1",
            "--role",
            "r1",
        ]);
        assert_eq!(args.base_url.as_deref(), Some("https://privx.example.com"));
        assert!(matches!(args.command, Command::Grant { ref user, ref role } if user == "u1" && role == "r1"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "privx-connector",
            "sync",
            "--page-size",
            "25",
            "--api-client-secret",
            "cli-secret",
        ]);
        let mut config = Config::from_toml("[privx]\n").unwrap();
        args.apply_to(&mut config);
        assert_eq!(config.sync.page_size, 25);
        assert_eq!(config.privx.api_client_secret.expose(), "cli-secret");
    }
}
