//! Background session maintenance

use nervelle_auth::SessionAuthenticator;
use tracing::{debug, info, warn};

/// Spawn a task that periodically deletes expired session rows
pub fn spawn_session_cleanup_task(
    auth: SessionAuthenticator,
    interval_minutes: u64,
) -> tokio::task::JoinHandle<()> {
    use tokio::time::{Duration, interval};

    info!(
        "Starting background session cleanup task (interval: {} minutes)",
        interval_minutes
    );

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_minutes.max(1) * 60));

        // Skip the first tick (which fires immediately)
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match auth.purge_expired_sessions().await {
                Ok(0) => debug!("No expired sessions to purge"),
                Ok(purged) => info!("Purged {} expired session(s)", purged),
                Err(e) => warn!("Error during session cleanup: {}", e),
            }
        }
    })
}
