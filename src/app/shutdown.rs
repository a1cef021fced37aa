use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tracing::info;

/// Resolves when the process receives SIGINT (Ctrl+C) or, on unix,
/// SIGTERM. Container runtimes stop services with SIGTERM, so both are
/// treated as a graceful shutdown request.
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = unix_signal(SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
    }

    Ok(())
}
