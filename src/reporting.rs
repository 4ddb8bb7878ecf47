//! SessionReporter
//!
//! Session-end reports are fire-and-forget: each one is posted from its own
//! task, failures are logged and dropped, and nothing in playback ever
//! waits on them. [`SessionReporter::drain`] exists so shutdown can give
//! in-flight reports a chance to finish.

use crate::api::{SessionReport, SessionTracker};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct SessionReporter {
    tracker: Arc<dyn SessionTracker>,
    pending: Vec<JoinHandle<()>>,
    submitted: usize,
}

impl SessionReporter {
    pub fn new(tracker: Arc<dyn SessionTracker>) -> Self {
        Self {
            tracker,
            pending: Vec::new(),
            submitted: 0,
        }
    }

    /// Number of reports handed off so far
    pub fn submitted(&self) -> usize {
        self.submitted
    }

    pub fn report(&mut self, report: SessionReport) {
        self.pending.retain(|task| !task.is_finished());
        self.submitted += 1;

        let tracker = self.tracker.clone();
        info!(
            "Reporting end of session for chip {} ({} videos watched, completed: {})",
            report.chip_uid,
            report.videos_watched.len(),
            report.completed
        );
        self.pending.push(tokio::spawn(async move {
            match tracker.report_session_end(&report).await {
                Ok(()) => debug!("Session report for chip {} delivered", report.chip_uid),
                Err(e) => warn!("Session report for chip {} lost: {}", report.chip_uid, e),
            }
        }));
    }

    /// Waits for every report still in flight
    pub async fn drain(&mut self) {
        for task in self.pending.drain(..) {
            if let Err(e) = task.await {
                warn!("Session report task failed: {}", e);
            }
        }
    }
}
