// Financials API - Configuration
// Command-line flags, each with an environment variable fallback

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "financials-server", version, about = "REST API for tasks, revenues and expenses")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Database connection string: a SQLite file path, or `:memory:`
    #[arg(long, env = "DATABASE_URL", default_value = "financials.db")]
    pub database: String,

    /// Emit log lines as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
