use std::{process::ExitCode, time::Duration};

use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use washing_book::{
    auth::{KeyError, TokenVerifier},
    configuration::Configuration,
    configuration_handler::ConfigurationHandler,
    database_interface::DatabaseInterface,
    http::create_app,
    local_appointments::LocalAppointments,
};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    PublicKey(#[from] KeyError),
    #[error("Failed to serve on {address}: {source}")]
    Serve {
        address: String,
        source: std::io::Error,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("washing_book=info,tower_http=info")),
        )
        .init();

    let configuration = ConfigurationHandler::parse_arguments();
    match run(configuration).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "Washing book stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run<C: Configuration>(configuration: C) -> Result<(), StartupError> {
    let public_key_path = configuration.public_key_path();
    let token_verifier = TokenVerifier::from_file(&public_key_path)?;
    info!(path = %public_key_path.display(), "Loaded token public key");

    let address = format!("0.0.0.0:{}", configuration.port());
    let serve_error = |source: std::io::Error| StartupError::Serve {
        address: address.clone(),
        source,
    };

    let app = if let Some(database_url) = configuration.database_url() {
        let backend = loop {
            match DatabaseInterface::new(&database_url) {
                Ok(backend) => {
                    info!("Successfully connected to database");
                    break backend;
                }
                Err(err) => {
                    error!(?err, "Failed to establish database connection. Retry in 1 sec. Omit the database url to keep appointments in memory.");
                    sleep(Duration::from_secs(1)).await;
                }
            }
        };
        create_app(backend, token_verifier, &configuration)
    } else {
        info!("No database configured, appointments are kept in memory");
        create_app(LocalAppointments::default(), token_verifier, &configuration)
    };

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(serve_error)?;
    info!("Accessible at {address}");
    axum::serve(listener, app).await.map_err(serve_error)
}
