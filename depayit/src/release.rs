use actix_web::web;
use chrono::Utc;
use tokio::time::{Duration, sleep};

use crate::state::AppState;

/// Periodically releases shipped transactions whose auto-release time has passed.
pub async fn start_release_runner(data: web::Data<AppState>, interval: Duration) {
    log::info!("Auto-release runner started, checking every {:?}", interval);
    loop {
        let now = Utc::now();
        match data.escrow.release_due(now).await {
            Ok(released) if !released.is_empty() => {
                log::info!(
                    "Auto released {} transactions: {}",
                    released.len(),
                    released.join(", ")
                );
            }
            Ok(_) => log::debug!("No transactions due for release"),
            Err(e) => log::error!("Error releasing due transactions: {}", e),
        }
        sleep(interval).await;
    }
}
