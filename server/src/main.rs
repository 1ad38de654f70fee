use std::error::Error;

use chrono::Utc;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use popnplan_server::config::{Config, MailBackend, StoreBackend};
use popnplan_server::routes::create_routes;
use popnplan_server::services::accounts::ensure_system_account;
use popnplan_server::services::credentials::Credentials;
use popnplan_server::services::mailer::{Mailer, SmtpMailer};
use popnplan_server::store::{MemoryStore, PgStore, Store};
use popnplan_server::AppState;

const DEFAULT_LOG_FILTER: &str = "popnplan_server=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::from_env()?;

    match config.store_backend {
        StoreBackend::Postgres => {
            let store =
                PgStore::connect(&config.database_url, config.database_max_connections).await?;
            store.migrate().await?;

            serve(store, &config).await
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data is lost on shutdown");
            serve(MemoryStore::new(), &config).await
        }
    }
}

async fn serve<S: Store>(store: S, config: &Config) -> Result<(), Box<dyn Error>> {
    let mailer = match &config.mail {
        MailBackend::Smtp(settings) => {
            tracing::info!(host = %settings.host, port = settings.port, "Sending email over SMTP");
            Mailer::Smtp(SmtpMailer::new(settings.clone()))
        }
        MailBackend::Console => {
            tracing::info!("Email delivery disabled, messages are logged");
            Mailer::Console
        }
    };

    let credentials = Credentials::new(
        config.jwt_secret.as_bytes(),
        config.password_hash_iterations,
    )?;
    let system_account = ensure_system_account(&store, &config.admin_email, Utc::now()).await?;
    tracing::info!(%system_account, email = %config.admin_email, "System account ready");

    let state = AppState::new(store, mailer, credentials, system_account, config.admin_auth);
    let app = create_routes(state, config);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server running at http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
