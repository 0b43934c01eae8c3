use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the Vitrine binary.
#[derive(Debug, Parser)]
#[command(name = "vitrine", version, about = "Vitrine studio content server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VITRINE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Vitrine HTTP service.
    Serve(Box<ServeArgs>),
    /// Validate the compiled-in static content and exit.
    Validate,
    /// Upsert the static content into the hosted backend tables.
    Seed(SeedArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BackendOverrides {
    /// Override the hosted backend base URL.
    #[arg(long = "backend-url", value_name = "URL")]
    pub backend_url: Option<String>,

    /// Override the hosted backend anonymous key.
    #[arg(long = "backend-anon-key", value_name = "KEY")]
    pub backend_anon_key: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub backend: BackendOverrides,

    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override how long live content stays memoized.
    #[arg(long = "cache-content-ttl-seconds", value_name = "SECONDS")]
    pub content_ttl_seconds: Option<u64>,

    /// Override how many videos the preload cache keeps.
    #[arg(long = "cache-video-capacity", value_name = "COUNT")]
    pub video_capacity: Option<usize>,

    /// Override the public site URL used in feeds and sitemaps.
    #[arg(long = "site-url", value_name = "URL")]
    pub site_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SeedArgs {
    #[command(flatten)]
    pub backend: BackendOverrides,

    /// Override the service-role key used for writes.
    #[arg(long = "backend-service-role-key", value_name = "KEY")]
    pub service_role_key: Option<String>,

    /// Validate and report what would be written without contacting the backend.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub dry_run: bool,
}
