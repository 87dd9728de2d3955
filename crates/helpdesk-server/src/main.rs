mod logging;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use helpdesk_api::AppStateInner;
use helpdesk_api::session::run_session_sweep;
use helpdesk_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let log_path = logging::init()?;

    // Config
    let db_path = std::env::var("HELPDESK_DB_PATH").unwrap_or_else(|_| "helpdesk.db".into());
    let host = std::env::var("HELPDESK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("HELPDESK_PORT")
        .unwrap_or_else(|_| "5000".into())
        .parse()?;
    let seed_demo = std::env::var("HELPDESK_SEED_DEMO")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    let session_ttl_secs: u64 = std::env::var("HELPDESK_SESSION_TTL_SECS")
        .unwrap_or_else(|_| "43200".into())
        .parse()?;
    let sweep_secs: u64 = std::env::var("HELPDESK_SESSION_SWEEP_SECS")
        .unwrap_or_else(|_| "300".into())
        .parse()?;

    // Init database
    let db = Database::open(&PathBuf::from(&db_path))?;
    if seed_demo {
        let seeded = tokio::task::spawn_blocking({
            let db = db.clone();
            move || db.seed_demo_data()
        })
        .await??;
        if seeded {
            info!("Demo data inserted into {}", db_path);
        } else {
            info!("Demo data skipped: {} already has users", db_path);
        }
    }

    let state = AppStateInner::with_session_ttl(db, Duration::from_secs(session_ttl_secs));

    // Spawn expired-session sweep
    tokio::spawn(run_session_sweep(state.clone(), sweep_secs));
    info!("Session sweep every {}s, idle timeout {}s", sweep_secs, session_ttl_secs);

    let app = helpdesk_api::router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Help desk listening on {}", addr);
    info!("Warnings are also written to {}", log_path.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
