use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::state::AppState;
use crate::core::time::now_utc;

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Drives countdown expiry, global question advancement and run auto-stop.
/// Purely an accelerator for push delivery: every transition it applies is
/// derived from absolute timestamps, so missed or delayed ticks are healed
/// by the next tick or by any participant poll.
pub(crate) async fn run(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(err) = state.controller().advance_tick(now_utc()).await {
                    tracing::error!(error = %err, "Exam tick failed");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("Exam ticker stopped");
}
