//! Booking service HTTP server.

use cinema_booking::clock::SystemClock;
use cinema_booking::config::{Config, StoreBackend};
use cinema_booking::gateway::WalletGateway;
use cinema_booking::pricing::FlatRate;
use cinema_booking::server::{build_router, AppState};
use cinema_booking::services::holds::HoldTtl;
use cinema_booking::services::{BookingService, HoldService, ReconciliationService};
use cinema_booking::store::{
    self, BookingStore, HoldStore, InMemoryBookingStore, InMemoryHoldStore, InMemorySeatLedger,
    PgBookingStore, PgHoldStore, PgSeatLedger, SeatLedgerStore,
};
use cinema_booking::types::Money;
use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinema_booking=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cinema booking service");

    let config = Config::from_env();
    info!(
        backend = ?config.store.backend,
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    let (ledger, holds, bookings): (
        Arc<dyn SeatLedgerStore>,
        Arc<dyn HoldStore>,
        Arc<dyn BookingStore>,
    ) = match config.store.backend {
        StoreBackend::Postgres => {
            info!(url = %config.store.url, "Connecting to PostgreSQL");
            let pool = PgPoolOptions::new()
                .max_connections(config.store.max_connections)
                .acquire_timeout(std::time::Duration::from_secs(config.store.connect_timeout))
                .connect(&config.store.url)
                .await?;
            store::postgres::migrate(&pool).await?;
            info!("Database ready");
            (
                Arc::new(PgSeatLedger::new(pool.clone())),
                Arc::new(PgHoldStore::new(pool.clone())),
                Arc::new(PgBookingStore::new(pool)),
            )
        }
        StoreBackend::Memory => {
            info!("Using in-memory stores");
            (
                Arc::new(InMemorySeatLedger::new()),
                Arc::new(InMemoryHoldStore::new()),
                Arc::new(InMemoryBookingStore::new()),
            )
        }
    };

    let clock = Arc::new(SystemClock);
    let gateway = WalletGateway::shared(config.gateway.clone());
    let pricing = FlatRate::shared(Money::from_minor(config.holds.flat_seat_price));

    let hold_service = Arc::new(HoldService::new(
        ledger.clone(),
        holds.clone(),
        pricing,
        clock.clone(),
        HoldTtl {
            default: Duration::minutes(config.holds.default_ttl_minutes),
            max: Duration::minutes(config.holds.max_ttl_minutes),
        },
    ));
    let booking_service = Arc::new(BookingService::new(
        ledger.clone(),
        holds.clone(),
        bookings.clone(),
        gateway.clone(),
        clock.clone(),
    ));
    let reconciliation = Arc::new(ReconciliationService::new(
        ledger.clone(),
        holds,
        bookings,
        gateway.clone(),
    ));

    let state = AppState::new(
        hold_service,
        booking_service,
        reconciliation,
        ledger,
        clock,
        WalletGateway::NAME.to_string(),
    );
    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) = signal::unix::signal(signal::unix::SignalKind::terminate()) {
            sig.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
