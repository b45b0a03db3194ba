//! Process wiring: builds storage, the sample provider, the telemetry
//! sink, the coordinator, and the scheduler, then serves the health/admin
//! router. Grounded on `palm-daemon::server::Server`'s `new`/`run` split
//! and its `axum::serve(...).with_graceful_shutdown(...)` pattern.

use std::sync::Arc;

use anvil_audit::telemetry::TracingTelemetry;
use anvil_coordinator::QueueCoordinator;
use anvil_policy::{Policy, RequeuePolicy, Selector};
use anvil_sample_provider::DirectProvider;
use anvil_storage::InMemoryStorage;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;

use crate::config::DaemonConfig;
use crate::error::DaemonResult;
use crate::health;
use crate::scheduler::Scheduler;

pub type Coordinator = QueueCoordinator<InMemoryStorage, DirectProvider<InMemoryStorage>, TracingTelemetry>;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<InMemoryStorage>,
    pub coordinator: Arc<Coordinator>,
    pub started_at: DateTime<Utc>,
}

pub struct Server {
    config: DaemonConfig,
    storage: Arc<InMemoryStorage>,
    telemetry: Arc<TracingTelemetry>,
    coordinator: Arc<Coordinator>,
    scheduler: Arc<Scheduler<InMemoryStorage, TracingTelemetry>>,
    started_at: DateTime<Utc>,
}

impl Server {
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let storage = Arc::new(InMemoryStorage::new());
        let telemetry = Arc::new(TracingTelemetry);

        let provider = Arc::new(DirectProvider::new(storage.clone()));
        let requeue = RequeuePolicy::requeue(
            config.policy.max_requeue_attempts,
            config.policy.requeue_delay_secs,
        );
        let policy = Policy::new(Selector::RoundRobin, requeue);
        let coordinator = Arc::new(
            QueueCoordinator::new(storage.clone(), provider, telemetry.clone(), policy)
                .with_agreement_threshold(config.scheduler.agreement_low_score_threshold),
        );

        let scheduler = Scheduler::new(
            config.scheduler.clone(),
            storage.clone(),
            telemetry.clone(),
            requeue,
            config.privacy.hmac_secret.clone().into_bytes(),
        );

        Ok(Self {
            config,
            storage,
            telemetry,
            coordinator,
            scheduler,
            started_at: Utc::now(),
        })
    }

    pub fn coordinator(&self) -> Arc<Coordinator> {
        self.coordinator.clone()
    }

    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let state = AppState {
            storage: self.storage.clone(),
            coordinator: self.coordinator.clone(),
            started_at: self.started_at,
        };

        let mut router = Router::new()
            .route("/healthz", get(health::health))
            .route("/status", get(health::status))
            .with_state(state);

        if self.config.server.enable_cors {
            router = router.layer(tower_http::cors::CorsLayer::new().allow_origin(tower_http::cors::Any));
        }
        router = router.layer(tower_http::trace::TraceLayer::new_for_http());

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "anvild listening");

        self.scheduler.clone().start().await;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|err| crate::error::DaemonError::Server(err.to_string()))?;

        tracing::info!("anvild shutting down");
        self.scheduler.stop().await;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
