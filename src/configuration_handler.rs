use crate::{appointment_manager::DEFAULT_DAILY_LIMIT, configuration::Configuration};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Booking service for shared laundry machines")]
pub struct ConfigurationHandler {
    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value = "3000")]
    port: String,

    /// PostgreSQL connection URL. Appointments are kept in memory if omitted
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// PEM encoded RSA public key the identity provider signs tokens with
    #[arg(long, env = "PUBLIC_KEY_PATH", default_value = "public.pem")]
    public_key_path: PathBuf,

    /// Maximum number of appointments per room and day
    #[arg(long, env = "DAILY_LIMIT", default_value_t = DEFAULT_DAILY_LIMIT)]
    daily_limit: u64,

    /// Allowed CORS origins, comma separated
    #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
    cors_origins: String,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }
}

impl Configuration for ConfigurationHandler {
    fn port(&self) -> String {
        self.port.clone()
    }

    fn database_url(&self) -> Option<String> {
        self.database_url.clone()
    }

    fn public_key_path(&self) -> PathBuf {
        self.public_key_path.clone()
    }

    fn daily_limit(&self) -> u64 {
        self.daily_limit
    }

    fn cors_origins(&self) -> String {
        self.cors_origins.clone()
    }
}
