//! Ctrl-C handling. The first interrupt cancels the running scan so partial
//! results can still be reported; a second one exits immediately.

use romforge_lib::CancelToken;

/// Exit status after a second interrupt (128 + SIGINT).
const INTERRUPTED_EXIT: i32 = 130;

/// Watch for interrupts on a background thread for the rest of the process.
pub(crate) fn cancel_on_interrupt(token: CancelToken) -> std::io::Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    std::thread::Builder::new()
        .name("interrupt".into())
        .spawn(move || rt.block_on(watch(token)))?;
    Ok(())
}

async fn watch(token: CancelToken) {
    if let Err(e) = shutdown_signal().await {
        log::debug!("Interrupt handler unavailable: {e}");
        return;
    }
    log::warn!("Interrupted; finishing files in progress (interrupt again to quit)");
    token.cancel();

    if shutdown_signal().await.is_ok() {
        std::process::exit(INTERRUPTED_EXIT);
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            r = tokio::signal::ctrl_c() => r,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await
}
