use std::sync::Arc;
use std::time::Duration;

use territory_server::config::ServerConfig;
use territory_server::game::traits::Renderer;
use territory_server::games::paperio::{PaperioConfig, PaperioGame};
use territory_server::network::{broadcast, handler, udp::UdpServer};
use territory_server::render::{TracingRenderer, WatchRenderer};
use territory_server::scheduler::{self, GameHandle};
use territory_server::session::SessionManager;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Scoreboard log cadence in ticks.
const SCOREBOARD_LOG_TICKS: u64 = 500;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    init_tracing(&config.log_level);

    let (watch_renderer, snapshots) = WatchRenderer::new(config.game.grid_width, config.game.grid_height);
    let renderer = (
        TracingRenderer::new(config.game.grid_width, config.game.grid_height, SCOREBOARD_LOG_TICKS),
        watch_renderer,
    );

    // The grid always matches what the renderers display.
    let (width, height) = renderer.viewport_size();
    let game = PaperioGame::with_config(PaperioConfig {
        grid_width: width,
        grid_height: height,
        ..config.game.clone()
    });
    info!(
        "Territory server: {}x{} grid, {} Hz, {} cells/s",
        width, height, config.game.tick_rate_hz, config.game.speed_cells_per_second
    );

    let handle = GameHandle::new(game);
    let server = Arc::new(UdpServer::bind(&config.server_addr.to_string()).await?);
    let sessions = Arc::new(Mutex::new(SessionManager::new(config.session_timeout_secs)));

    let mut tick_loop = tokio::spawn(scheduler::run(handle.clone(), renderer));
    let broadcaster = tokio::spawn(broadcast::run(
        server.clone(),
        sessions.clone(),
        snapshots,
        config.broadcast_gap(),
    ));
    let receiver = tokio::spawn(handler::serve(server.clone(), sessions.clone(), handle.clone()));

    // Cleanup task for timed-out sessions
    let sessions_cleanup = sessions.clone();
    let cleanup = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            let timed_out = sessions_cleanup.lock().await.cleanup_timed_out();
            if !timed_out.is_empty() {
                tracing::debug!("Dropped {} idle sessions", timed_out.len());
            }
        }
    });

    let console = tokio::spawn(run_console(handle.clone()));

    tokio::select! {
        result = &mut tick_loop => {
            info!("Game closed");
            result?;
        }
        _ = shutdown_signal() => {
            handle.close().await;
            let ticks = tick_loop.await?;
            info!("Tick loop finished after {} ticks", ticks);
        }
    }

    receiver.abort();
    cleanup.abort();
    console.abort();
    // The tick loop dropped the snapshot sender, so the broadcaster winds down.
    broadcaster.await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Operator keys on stdin: `p` pauses or resumes, `q` closes the game.
async fn run_console(handle: GameHandle<PaperioGame>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("Console ready: 'p' + Enter toggles pause, 'q' + Enter quits");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::debug!("stdin closed, console stopping");
                return;
            }
            Err(e) => {
                tracing::warn!("Failed to read stdin: {}", e);
                return;
            }
        };

        match line.trim() {
            "p" | "P" => handle.toggle_running().await,
            "q" | "Q" => {
                handle.close().await;
                return;
            }
            "" => {}
            other => tracing::info!("Unknown console command {:?}", other),
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
