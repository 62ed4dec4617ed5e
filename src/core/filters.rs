use std::fmt;

use super::connection::{ConnectionRecord, Protocol};
use super::snapshot::Snapshot;

/// View filters offered by the filter selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterCriterion {
    #[default]
    All,
    Tcp,
    Udp,
    Listening,
    Established,
}

impl FilterCriterion {
    pub const ALL: [FilterCriterion; 5] = [
        FilterCriterion::All,
        FilterCriterion::Tcp,
        FilterCriterion::Udp,
        FilterCriterion::Listening,
        FilterCriterion::Established,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterCriterion::All => "All",
            FilterCriterion::Tcp => "TCP",
            FilterCriterion::Udp => "UDP",
            FilterCriterion::Listening => "Listening",
            FilterCriterion::Established => "Established",
        }
    }

    /// Case-insensitive. Names outside the closed set fall back to `All`.
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(name.trim()))
            .unwrap_or(FilterCriterion::All)
    }

    pub fn matches(&self, record: &ConnectionRecord) -> bool {
        match self {
            FilterCriterion::All => true,
            FilterCriterion::Tcp => record.protocol == Protocol::Tcp,
            FilterCriterion::Udp => record.protocol == Protocol::Udp,
            FilterCriterion::Listening => record.state_is("LISTENING"),
            FilterCriterion::Established => record.state_is("ESTABLISHED"),
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            FilterCriterion::All => 0,
            FilterCriterion::Tcp => 1,
            FilterCriterion::Udp => 2,
            FilterCriterion::Listening => 3,
            FilterCriterion::Established => 4,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        Self::ALL
            .get(value as usize)
            .copied()
            .unwrap_or(FilterCriterion::All)
    }
}

impl fmt::Display for FilterCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keeps the records matching `criterion`, in snapshot order.
pub fn apply(snapshot: &Snapshot, criterion: FilterCriterion) -> Snapshot {
    let records = snapshot
        .records()
        .iter()
        .filter(|rec| criterion.matches(rec))
        .cloned()
        .collect();
    snapshot.narrowed(records, criterion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_listing;
    use chrono::Local;

    fn sample() -> Snapshot {
        let text = "\
TCP 0.0.0.0:135 0.0.0.0:0 LISTENING 1044
TCP 10.0.0.5:50000 20.42.73.29:443 ESTABLISHED 4120
TCP 10.0.0.5:50001 20.42.73.29:443 TIME_WAIT 0
TCP 10.0.0.5:50002 20.42.73.29:443 established 4120
UDP 0.0.0.0:500 *:* 3920
UDP [::]:5353 *:* 2216
";
        Snapshot::new(parse_listing(text), Local::now())
    }

    fn ports(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.records().iter().map(|r| r.local_port.as_str()).collect()
    }

    #[test]
    fn test_all_is_identity() {
        let s = sample();
        assert_eq!(apply(&s, FilterCriterion::All), s);
    }

    #[test]
    fn test_protocol_filters() {
        let s = sample();
        assert_eq!(ports(&apply(&s, FilterCriterion::Tcp)), vec!["135", "50000", "50001", "50002"]);
        assert_eq!(ports(&apply(&s, FilterCriterion::Udp)), vec!["500", "5353"]);
    }

    #[test]
    fn test_state_filters_ignore_case() {
        let s = sample();
        assert_eq!(ports(&apply(&s, FilterCriterion::Listening)), vec!["135"]);
        assert_eq!(ports(&apply(&s, FilterCriterion::Established)), vec!["50000", "50002"]);
    }

    #[test]
    fn test_filtered_snapshot_records_its_criterion() {
        let s = sample();
        let udp = apply(&s, FilterCriterion::Udp);
        assert_eq!(udp.criterion(), FilterCriterion::Udp);
        assert_eq!(udp.taken_at(), s.taken_at());
        assert_eq!(apply(&udp, FilterCriterion::Tcp).criterion(), FilterCriterion::Tcp);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let s = sample();
        for criterion in FilterCriterion::ALL {
            let once = apply(&s, criterion);
            assert_eq!(apply(&once, criterion), once, "criterion {}", criterion);
        }
    }

    #[test]
    fn test_from_name() {
        assert_eq!(FilterCriterion::from_name("tcp"), FilterCriterion::Tcp);
        assert_eq!(FilterCriterion::from_name("LISTENING"), FilterCriterion::Listening);
        assert_eq!(FilterCriterion::from_name(" Established "), FilterCriterion::Established);
        assert_eq!(FilterCriterion::from_name("closing"), FilterCriterion::All);
        assert_eq!(FilterCriterion::from_name(""), FilterCriterion::All);
    }

    #[test]
    fn test_u8_round_trip_covers_every_criterion() {
        for criterion in FilterCriterion::ALL {
            assert_eq!(FilterCriterion::from_u8(criterion.to_u8()), criterion);
        }
        assert_eq!(FilterCriterion::from_u8(200), FilterCriterion::All);
    }
}
