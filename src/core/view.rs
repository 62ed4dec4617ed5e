use chrono::{DateTime, Local};
use log::warn;

use super::scheduler::RefreshOutcome;
use super::snapshot::Snapshot;

const UNRECOGNIZED_LISTING: &str =
    "Listing has no recognizable connection lines (expected `netstat -ano` output, see --source-cmd)";

/// What the presentation layer shows: the last good snapshot and, out of
/// band, the reason the most recent cycle failed.
#[derive(Debug, Clone)]
pub struct ViewState {
    snapshot: Snapshot,
    status: Option<String>,
    received_any: bool,
    last_failure_at: Option<DateTime<Local>>,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::empty(),
            status: None,
            received_any: false,
            last_failure_at: None,
        }
    }

    /// A failed cycle never replaces good data; it only sets the status line.
    pub fn apply(&mut self, outcome: RefreshOutcome) {
        match outcome {
            Ok(snapshot) => {
                self.status = if snapshot.listing_unrecognized() {
                    Some(UNRECOGNIZED_LISTING.to_string())
                } else {
                    None
                };
                self.snapshot = snapshot;
                self.received_any = true;
            }
            Err(e) => {
                warn!("Keeping previous snapshot after failed refresh: {}", e);
                self.status = Some(format!("Refresh failed: {}", e));
                self.last_failure_at = Some(Local::now());
            }
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn has_data(&self) -> bool {
        self.received_any
    }

    pub fn last_failure_at(&self) -> Option<DateTime<Local>> {
        self.last_failure_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::MonitorError;
    use crate::core::parser::parse_listing;

    fn snapshot(text: &str) -> Snapshot {
        Snapshot::new(parse_listing(text), Local::now())
    }

    #[test]
    fn test_failure_keeps_last_good_snapshot() {
        let mut view = ViewState::new();
        let good = snapshot("TCP 0.0.0.0:135 0.0.0.0:0 LISTENING 1044\nUDP 0.0.0.0:500 *:* 3920\n");
        view.apply(Ok(good.clone()));
        assert!(view.status().is_none());

        view.apply(Err(MonitorError::SourceUnavailable("netstat exited with 1".to_string())));
        assert_eq!(view.snapshot(), &good);
        assert_eq!(
            view.status(),
            Some("Refresh failed: connection listing unavailable: netstat exited with 1")
        );
        assert!(view.last_failure_at().is_some());
    }

    #[test]
    fn test_unrecognized_listing_sets_status() {
        let mut builder = crate::core::snapshot::SnapshotBuilder::new(
            Box::new(crate::core::snapshot::fakes::FixedSource::new(
                "Proto Recv-Q Send-Q Local Address Foreign Address State\ntcp 0 0 0.0.0.0:22 0.0.0.0:* LISTEN\n",
            )),
            crate::core::identity::IdentityResolver::new(
                Box::new(crate::core::identity::fakes::FakeProcesses::default()),
                Box::new(crate::core::identity::fakes::FakeServices::default()),
            ),
        );
        let mut view = ViewState::new();
        view.apply(builder.build());
        assert!(view.has_data());
        assert!(view.status().unwrap().contains("no recognizable connection lines"));

        view.apply(Ok(snapshot("TCP 0.0.0.0:22 0.0.0.0:0 LISTENING 1\n")));
        assert!(view.status().is_none());
    }

    #[test]
    fn test_success_clears_status() {
        let mut view = ViewState::new();
        assert!(!view.has_data());
        view.apply(Err(MonitorError::SourceUnavailable("boom".to_string())));
        assert!(view.snapshot().is_empty());
        assert!(!view.has_data());

        view.apply(Ok(snapshot("TCP 0.0.0.0:22 0.0.0.0:0 LISTENING 1\n")));
        assert!(view.has_data());
        assert!(view.status().is_none());
        assert_eq!(view.snapshot().len(), 1);
    }
}
