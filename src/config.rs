use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use crate::error::AppError;

/// Command-line arguments for the server binary.
#[derive(Debug, Clone, Parser)]
#[command(name = "quickpoll", version, about = "Minimal polling service")]
pub struct Cli {
    /// Path to a TOML configuration file. A missing file is ignored.
    #[arg(long, short, env = "QUICKPOLL_CONFIG", default_value = "quickpoll.toml")]
    pub config: PathBuf,

    /// Address to listen on, overriding the configuration file.
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

/// Full service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

/// MongoDB connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub name: String,
    /// Reported to the server in the connection handshake.
    pub app_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Load configuration from defaults, the optional file, the environment and the CLI.
    ///
    /// Environment variables use the `QUICKPOLL__` prefix with `__` between
    /// sections (e.g. `QUICKPOLL__DATABASE__URI`). `MONGODB_URI` and
    /// `MONGODB_DATABASE` are honoured as well.
    pub fn load(cli: &Cli) -> Result<Self, AppError> {
        let builder = config::Config::builder()
            .set_default("server.bind_addr", "0.0.0.0:3000")?
            .set_default("database.uri", "mongodb://localhost:27017")?
            .set_default("database.name", "quickpoll")?
            .set_default("database.app_name", "quickpoll")?
            .set_default("cors.allowed_origins", Vec::<String>::new())?
            .add_source(config::File::from(cli.config.clone()).required(false))
            .add_source(
                config::Environment::with_prefix("QUICKPOLL")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .set_override_option("database.uri", std::env::var("MONGODB_URI").ok())?
            .set_override_option("database.name", std::env::var("MONGODB_DATABASE").ok())?
            .set_override_option("server.bind_addr", cli.bind.map(|addr| addr.to_string()))?;

        let config: AppConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}
