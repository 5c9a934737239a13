//! OS シグナル待ち
//!
//! Unix では SIGINT / SIGTERM / SIGQUIT のどれか、その他では Ctrl-C で完了する。

#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
    };
    tracing::debug!(signal = name, "received signal");
    Ok(())
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Resolves on the first shutdown signal. If the handlers cannot be installed the run
/// is still bounded by its configured duration, so this just never resolves.
pub async fn interrupt() {
    if let Err(err) = wait_for_shutdown_signal().await {
        tracing::error!(error = %err, "failed to install signal handlers");
        std::future::pending::<()>().await;
    }
}
