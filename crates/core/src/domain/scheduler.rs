use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime, Utc};
use tracing::{error, info, warn};

use crate::db::SnapshotsDao;
use crate::domain::SnapshotRecorder;
use crate::models::RunStatus;
use crate::utils::time;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Fires one reconciliation cycle per day at a fixed reference-timezone
/// wall-clock time, on a dedicated background thread.
///
/// Concurrency is delegated to the recorder's guard; the scheduler only
/// decides *when* to trigger. Cancellable: `stop()` flags the thread and
/// joins it.
pub struct DailyScheduler {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DailyScheduler {
    /// Spawn the scheduler thread. If no snapshot exists yet for the
    /// current reference-timezone date, an immediate catch-up cycle runs
    /// first so a restart does not silently skip a day.
    pub fn start(
        recorder: Arc<SnapshotRecorder>,
        snapshots: SnapshotsDao,
        offset: FixedOffset,
        run_time: NaiveTime,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("snapshot-scheduler".into())
            .spawn(move || scheduler_loop(recorder, snapshots, offset, run_time, stop_flag))
            .expect("failed to spawn scheduler thread");

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signal the thread to exit and wait for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DailyScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn scheduler_loop(
    recorder: Arc<SnapshotRecorder>,
    snapshots: SnapshotsDao,
    offset: FixedOffset,
    run_time: NaiveTime,
    stop: Arc<AtomicBool>,
) {
    // Catch-up: a restart after the day's fire time must still record.
    match snapshots.has_snapshot(time::reference_today(offset)) {
        Ok(false) => {
            info!("no snapshot for today yet, running catch-up cycle");
            run_cycle(&recorder);
        }
        Ok(true) => {}
        Err(e) => warn!(error = %e, "could not check for today's snapshot"),
    }

    while !stop.load(Ordering::Relaxed) {
        let next_due = time::next_run_instant(Utc::now(), offset, run_time);
        info!(next_due = %next_due, "scheduler sleeping until next cycle");

        while !stop.load(Ordering::Relaxed) && Utc::now() < next_due {
            let remaining = (next_due - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO);
            std::thread::sleep(remaining.min(POLL_INTERVAL));
        }

        if stop.load(Ordering::Relaxed) {
            break;
        }

        run_cycle(&recorder);
    }
}

/// One scheduled trigger. Failures are logged and swallowed; nothing a
/// cycle does may prevent the next day's firing.
fn run_cycle(recorder: &SnapshotRecorder) {
    let result = recorder.record_today();
    match result.status {
        RunStatus::Completed => info!(
            date = %result.date,
            total_hours = result.total_hours,
            games_count = result.games_count,
            source_refreshed = result.source_refreshed,
            "scheduled snapshot recorded"
        ),
        RunStatus::Skipped => info!(date = %result.date, "scheduled cycle skipped, already running"),
        RunStatus::Failed => error!(
            date = %result.date,
            error = result.error.as_deref().unwrap_or("unknown"),
            "scheduled snapshot failed"
        ),
    }
}
