use std::sync::Arc;

use parley::adapters::http::middleware::AuthState;
use parley::adapters::http::{app_router, MessagingAppState};
use parley::adapters::postgres::{run_migrations, PostgresMessageStore, PostgresUserDirectory};
use parley::adapters::{DirectorySessionValidator, InMemoryEventBus, InMemoryMessageStore};
use parley::config::AppConfig;
use parley::ports::{MessageStore, UserDirectory};
use parley::telemetry::init_tracing;

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.server)?;

    let seeds = config.messaging.seed_user_emails();
    let (store, directory): (Arc<dyn MessageStore>, Arc<dyn UserDirectory>) =
        match &config.database {
            Some(db) => {
                let pool = db.pool_options().connect(&db.url).await?;
                if db.run_migrations {
                    run_migrations(&pool).await?;
                    tracing::info!("Migrations applied");
                }
                let users = PostgresUserDirectory::new(pool.clone());
                for email in &seeds {
                    users.upsert(email).await?;
                }
                let store: Arc<dyn MessageStore> = Arc::new(PostgresMessageStore::new(pool));
                let directory: Arc<dyn UserDirectory> = Arc::new(users);
                (store, directory)
            }
            None => {
                tracing::warn!("No database configured, messages are kept in memory");
                let memory = InMemoryMessageStore::new();
                for email in &seeds {
                    memory.add_user(email).await?;
                }
                let store: Arc<dyn MessageStore> = Arc::new(memory.clone());
                let directory: Arc<dyn UserDirectory> = Arc::new(memory);
                (store, directory)
            }
        };
    if !seeds.is_empty() {
        tracing::info!(count = seeds.len(), "Seeded users");
    }

    let bus = Arc::new(InMemoryEventBus::new());
    let validator: AuthState = Arc::new(DirectorySessionValidator::new(directory.clone()));
    let state = MessagingAppState::new(
        store,
        directory,
        bus,
        config.messaging.subscriber_queue_capacity,
    );
    let app = app_router(state, validator, &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Parley listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
