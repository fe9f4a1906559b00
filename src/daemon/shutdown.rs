use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancels `cancelation` on Ctrl-C. Returns early if something else cancels it first.
///
/// On Windows detached processes can't detect signals sent to them, `daybook stop` kills the
/// process instead.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => {},
    };
}
