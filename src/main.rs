use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use buildtrust_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes,
    services::audit_service::{spawn_audit_worker, AuditRecorder, PgAuditSink},
    AppState,
};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);
const AUDIT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("buildtrust_backend=debug,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    init_config()?;
    let config = Arc::new(get_config().clone());

    let pool = create_pool(&config).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let (queue, audit_worker) =
        spawn_audit_worker(Arc::new(PgAuditSink::new(pool.clone())), &config.audit);
    let recorder = AuditRecorder::new(queue, Arc::new(config.audit.clone()));
    let app_state = AppState::new(pool, config.clone(), recorder)?;

    // Holds only the auth service so the audit sender is released at shutdown.
    let purge_task = {
        let auth = app_state.auth_service.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PURGE_INTERVAL);
            loop {
                ticker.tick().await;
                if let Err(e) = auth.purge_expired().await {
                    tracing::error!(error = ?e, "expired session purge failed");
                }
            }
        })
    };

    info!("Serving uploads from: {}", config.uploads_dir);
    let app = routes::router(app_state);

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    purge_task.abort();
    info!("draining audit queue");
    if tokio::time::timeout(AUDIT_DRAIN_TIMEOUT, audit_worker)
        .await
        .is_err()
    {
        tracing::warn!("audit queue did not drain before timeout");
    }

    Ok(())
}
