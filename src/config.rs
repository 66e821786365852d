use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized gateway configuration.
/// Server binding merges environment variables and CLI arguments; bucket
/// credentials and the admin secret come from the environment only.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Backend region, also part of the public URL.
    pub region: String,
    /// Bucket holding the gallery objects.
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    /// Storage provider domain, e.g. `digitaloceanspaces.com`.
    pub storage_domain: String,
    /// Static shared secret required for mutating operations.
    pub admin_secret: String,
    /// Comma-separated origin allow-list. Loopback origins always pass.
    pub allowed_origins: String,
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about = "HTTP gateway for a remote image gallery bucket")]
pub struct Args {
    /// Host to bind to (overrides GALLERY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GALLERY_PORT)
    #[arg(long)]
    pub port: Option<u16>,
}

impl GatewayConfig {
    /// Parse environment variables + CLI args into a GatewayConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("GALLERY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("GALLERY_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing GALLERY_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading GALLERY_PORT"),
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            region: require_env("SPACES_REGION")?,
            bucket: require_env("SPACES_BUCKET")?,
            access_key: require_env("SPACES_KEY")?,
            secret_key: require_env("SPACES_SECRET")?,
            storage_domain: env::var("SPACES_DOMAIN")
                .unwrap_or_else(|_| "digitaloceanspaces.com".into()),
            admin_secret: require_env("ADMIN_SECRET")?,
            allowed_origins: env::var("ALLOWED_ORIGINS").unwrap_or_default(),
        };

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn require_env(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("reading {}", name))
}
