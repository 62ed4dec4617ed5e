use chrono::{DateTime, Local};
use log::{debug, info, warn};

use super::connection::ConnectionRecord;
use super::error::MonitorError;
use super::filters::FilterCriterion;
use super::identity::IdentityResolver;
use super::parser::parse_listing;
use super::source::ListingSource;

/// One poll cycle's worth of records, sorted by local port, together with
/// the criterion that selected them.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    records: Vec<ConnectionRecord>,
    taken_at: DateTime<Local>,
    criterion: FilterCriterion,
    unrecognized_listing: bool,
}

impl Snapshot {
    pub fn new(records: Vec<ConnectionRecord>, taken_at: DateTime<Local>) -> Self {
        Self {
            records,
            taken_at,
            criterion: FilterCriterion::All,
            unrecognized_listing: false,
        }
    }

    /// Same cycle, narrowed to `records` by `criterion`.
    pub fn narrowed(&self, records: Vec<ConnectionRecord>, criterion: FilterCriterion) -> Self {
        Self {
            records,
            taken_at: self.taken_at,
            criterion,
            unrecognized_listing: self.unrecognized_listing,
        }
    }

    pub fn criterion(&self) -> FilterCriterion {
        self.criterion
    }

    /// True when the listing had text but not a single connection line, which
    /// usually means the tool prints a format other than `netstat -ano`.
    pub fn listing_unrecognized(&self) -> bool {
        self.unrecognized_listing
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Local::now())
    }

    pub fn records(&self) -> &[ConnectionRecord] {
        &self.records
    }

    pub fn taken_at(&self) -> DateTime<Local> {
        self.taken_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ConnectionRecord> {
        self.records.get(index)
    }
}

/// Ascending numeric local port; records whose port is not a number go last.
/// The sort is stable, so ties and non-numeric ports keep listing order.
pub fn sort_by_local_port(records: &mut [ConnectionRecord]) {
    records.sort_by_key(|rec| match rec.local_port_number() {
        Some(port) => (false, port),
        None => (true, 0),
    });
}

pub struct SnapshotBuilder {
    source: Box<dyn ListingSource>,
    resolver: IdentityResolver,
}

impl SnapshotBuilder {
    pub fn new(source: Box<dyn ListingSource>, resolver: IdentityResolver) -> Self {
        Self { source, resolver }
    }

    /// Fetches the listing once and builds a full snapshot from it. Either the
    /// whole listing is read or the build fails; nothing is merged across reads.
    pub fn build(&mut self) -> Result<Snapshot, MonitorError> {
        let taken_at = Local::now();
        let text = self.source.fetch()?;

        let parsed = parse_listing(&text);
        debug!("Parsed {} records from {}", parsed.len(), self.source.describe());

        let unrecognized_listing = parsed.is_empty() && text.lines().any(|line| !line.trim().is_empty());
        if unrecognized_listing {
            warn!(
                "No connection lines recognized in output of {}; expected `netstat -ano` format",
                self.source.describe()
            );
        }

        self.resolver.refresh();
        let mut records: Vec<ConnectionRecord> = parsed
            .into_iter()
            .map(|rec| match rec.pid {
                Some(pid) => {
                    let identity = self.resolver.resolve(pid);
                    rec.with_identity(identity)
                }
                None => rec,
            })
            .collect();

        sort_by_local_port(&mut records);
        info!("Snapshot built with {} records", records.len());

        let mut snapshot = Snapshot::new(records, taken_at);
        snapshot.unrecognized_listing = unrecognized_listing;
        Ok(snapshot)
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    /// Serves a fixed listing, or fails when `text` is None.
    pub struct FixedSource {
        pub text: Option<String>,
        pub fetches: Arc<AtomicUsize>,
    }

    impl FixedSource {
        pub fn new(text: &str) -> Self {
            Self {
                text: Some(text.to_string()),
                fetches: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn failing() -> Self {
            Self {
                text: None,
                fetches: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ListingSource for FixedSource {
        fn fetch(&self) -> Result<String, MonitorError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.text
                .clone()
                .ok_or_else(|| MonitorError::SourceUnavailable("netstat not found".to_string()))
        }

        fn describe(&self) -> String {
            "fixed listing".to_string()
        }
    }
}
