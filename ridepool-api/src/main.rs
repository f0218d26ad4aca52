use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ridepool_api::{app, state::AuthSettings, AppState};
use ridepool_core::notify::{MockSmsNotifier, SmsNotifier};
use ridepool_core::reminder::ReminderSweeper;
use ridepool_core::repository::{BookingRepository, RideRepository, UserRepository};
use ridepool_store::app_config::Config;
use ridepool_store::{MemoryStore, NocSmsGateway, PgStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ridepool_api=debug,ridepool_core=debug,tower_http=debug,axum::rejection=trace"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Ridepool API on port {}", config.server.port);

    let sms: Arc<dyn SmsNotifier> = if config.noc.enabled {
        Arc::new(NocSmsGateway::new(&config.noc.base_url, &config.noc.api_key))
    } else {
        tracing::warn!("NOC gateway disabled, using the recording mock notifier");
        Arc::new(MockSmsNotifier::new())
    };

    let auth = AuthSettings {
        secret: config.auth.jwt_secret.clone(),
        issuer: config.auth.jwt_issuer.clone(),
        audience: config.auth.jwt_audience.clone(),
        ttl_minutes: config.auth.jwt_ttl_minutes,
    };

    let state = match config.store.backend.as_str() {
        "postgres" => {
            let url = config
                .store
                .database_url
                .as_deref()
                .expect("store.database_url required for the postgres backend");
            let store = Arc::new(PgStore::connect(url).await.expect("Failed to connect to Postgres"));
            AppState::build(store, sms.clone(), auth, &config.business_rules, &config.admission)
        }
        _ => {
            tracing::warn!("using the in-memory store; data will not survive restart");
            let store = Arc::new(MemoryStore::new());
            AppState::build(store, sms.clone(), auth, &config.business_rules, &config.admission)
        }
    };

    spawn_reminder_sweeper(&state, sms, &config);

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}

fn spawn_reminder_sweeper(state: &AppState, sms: Arc<dyn SmsNotifier>, config: &Config) {
    let rides: Arc<dyn RideRepository> = state.rides.clone();
    let bookings: Arc<dyn BookingRepository> = state.bookings.clone();
    let users: Arc<dyn UserRepository> = state.users.clone();

    let sweeper = ReminderSweeper::new(
        bookings,
        rides,
        users,
        sms,
        config.business_rules.reminder_window_minutes,
    );
    let period = Duration::from_secs(config.business_rules.reminder_period_seconds);

    tokio::spawn(sweeper.run(period));
}
