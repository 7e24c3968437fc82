//! Time-ordered record identifiers.
//!
//! Identifiers are version-1 time UUIDs, the layout the store's `timeuuid`
//! type expects. Byte order of a v1 UUID does not follow time, so ordering is
//! defined on the embedded timestamp first (matching the store's comparator)
//! and on the raw bytes second.

use std::cmp::Ordering;
use std::fmt;

use uuid::{ContextV1, Timestamp, Uuid};

use crate::error::TimeFormatError;
use crate::time::{format_date, parse_time, DatePrecision};

/// 100ns intervals between 1582-10-15 and 1970-01-01.
const GREGORIAN_OFFSET_TICKS: u64 = 0x01B2_1DD2_1381_4000;

/// Latest millisecond a v1 UUID's 60-bit timestamp can hold (early 5236).
pub const MAX_UNIX_MILLIS: i64 =
    (((1u64 << 60) - 1 - GREGORIAN_OFFSET_TICKS) / 10_000) as i64;

/// A time UUID used as the clustering key of both views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordIdentifier(Uuid);

impl RecordIdentifier {
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }

    /// The 60-bit timestamp in 100ns ticks since the Gregorian epoch.
    pub fn timestamp_ticks(&self) -> u64 {
        let b = self.0.as_bytes();
        let time_low = u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]]));
        let time_mid = u64::from(u16::from_be_bytes([b[4], b[5]]));
        let time_hi = u64::from(u16::from_be_bytes([b[6], b[7]]) & 0x0FFF);
        (time_hi << 48) | (time_mid << 32) | time_low
    }

    /// Milliseconds since the Unix epoch encoded in the identifier.
    pub fn unix_millis(&self) -> i64 {
        (self.timestamp_ticks().saturating_sub(GREGORIAN_OFFSET_TICKS) / 10_000) as i64
    }
}

impl Ord for RecordIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp_ticks()
            .cmp(&other.timestamp_ticks())
            .then_with(|| self.0.as_bytes().cmp(other.0.as_bytes()))
    }
}

impl PartialOrd for RecordIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RecordIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl From<RecordIdentifier> for Uuid {
    fn from(id: RecordIdentifier) -> Self {
        id.0
    }
}

/// Everything derived from one record's event time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedTime {
    pub epoch_seconds: i64,
    /// `epoch_seconds * 1000`, stored in the `create_time` column.
    pub create_time_ms: i64,
    pub id: RecordIdentifier,
    pub logdate: String,
}

/// Identifier generator plus time derivation.
///
/// Each instance owns its own clock sequence and a random node id, so
/// separate writers never need to coordinate. Identifiers generated for the
/// same millisecond are told apart by the clock sequence only; that is best
/// effort, not a uniqueness guarantee.
#[derive(Debug)]
pub struct Deriver {
    context: ContextV1,
    node_id: [u8; 6],
}

impl Default for Deriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Deriver {
    pub fn new() -> Self {
        Self::with_node_id(rand::random())
    }

    pub fn with_node_id(node_id: [u8; 6]) -> Self {
        Self {
            context: ContextV1::new(rand::random()),
            node_id,
        }
    }

    /// Generate an identifier for a millisecond Unix timestamp.
    ///
    /// `None` outside `0..=MAX_UNIX_MILLIS`, where the timestamp would not
    /// survive the round trip through the UUID.
    pub fn identifier_at(&self, unix_millis: i64) -> Option<RecordIdentifier> {
        if !(0..=MAX_UNIX_MILLIS).contains(&unix_millis) {
            return None;
        }
        let seconds = (unix_millis / 1_000) as u64;
        let subsec_nanos = ((unix_millis % 1_000) * 1_000_000) as u32;
        let ts = Timestamp::from_unix(&self.context, seconds, subsec_nanos);
        Some(RecordIdentifier(Uuid::new_v1(ts, &self.node_id)))
    }

    /// Parse `event_time` and derive the epoch value, identifier and logdate.
    pub fn derive(
        &self,
        event_time: &str,
        precision: DatePrecision,
    ) -> Result<DerivedTime, TimeFormatError> {
        let ts = parse_time(event_time)?;
        let epoch_seconds = ts.timestamp();
        let create_time_ms = epoch_seconds
            .checked_mul(1_000)
            .ok_or_else(|| TimeFormatError::new(event_time, "timestamp out of range"))?;
        if create_time_ms < 0 {
            return Err(TimeFormatError::new(event_time, "timestamp before Unix epoch"));
        }
        let id = self.identifier_at(create_time_ms).ok_or_else(|| {
            TimeFormatError::new(event_time, "timestamp beyond time UUID range")
        })?;

        Ok(DerivedTime {
            epoch_seconds,
            create_time_ms,
            id,
            logdate: format_date(&ts, precision),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn identifier_encodes_millisecond_timestamp() {
        let deriver = Deriver::new();
        let id = deriver.identifier_at(1_704_067_200_123).unwrap();
        assert_eq!(id.as_uuid().get_version_num(), 1);
        assert_eq!(id.unix_millis(), 1_704_067_200_123);
    }

    #[test]
    fn identifiers_follow_time_order() {
        let deriver = Deriver::new();
        let times = [
            "2024-01-01T00:00:00",
            "2024-01-01T00:00:01",
            "2024-01-01T00:01:00",
            "2024-02-01T00:00:00",
            "2025-01-01T00:00:00",
        ];

        let ids: Vec<RecordIdentifier> = times
            .iter()
            .map(|t| deriver.derive(t, DatePrecision::Day).unwrap().id)
            .collect();

        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn ordering_holds_across_generators() {
        let early = Deriver::with_node_id([0xff; 6]).identifier_at(1_000).unwrap();
        let late = Deriver::with_node_id([0x00; 6]).identifier_at(2_000).unwrap();
        assert!(early < late);
    }

    #[test]
    fn same_millisecond_identifiers_differ() {
        let deriver = Deriver::new();
        let ids: HashSet<RecordIdentifier> = (0..100)
            .map(|_| deriver.identifier_at(1_704_067_200_000).unwrap())
            .collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn derive_fills_all_fields() {
        let deriver = Deriver::new();
        let derived = deriver
            .derive("2024-01-01 00:00:05", DatePrecision::Day)
            .unwrap();
        assert_eq!(derived.epoch_seconds, 1_704_067_205);
        assert_eq!(derived.create_time_ms, 1_704_067_205_000);
        assert_eq!(derived.logdate, "2024-01-01");
        assert_eq!(derived.id.unix_millis(), derived.create_time_ms);
    }

    #[test]
    fn derive_rejects_bad_and_pre_epoch_times() {
        let deriver = Deriver::new();
        assert!(deriver.derive("not a time", DatePrecision::Day).is_err());
        let err = deriver
            .derive("1969-12-31 23:59:59", DatePrecision::Day)
            .unwrap_err();
        assert!(err.reason.contains("before Unix epoch"));
    }

    #[test]
    fn derive_rejects_times_past_uuid_range() {
        let deriver = Deriver::new();

        let late = deriver.derive("5000-01-01 00:00:00", DatePrecision::Day).unwrap();
        assert_eq!(late.id.unix_millis(), late.create_time_ms);

        let err = deriver
            .derive("6000-01-01 00:00:00", DatePrecision::Day)
            .unwrap_err();
        assert!(err.reason.contains("time UUID range"));

        let last = deriver.identifier_at(MAX_UNIX_MILLIS).unwrap();
        assert_eq!(last.unix_millis(), MAX_UNIX_MILLIS);
        assert!(late.id < last);
        assert!(deriver.identifier_at(MAX_UNIX_MILLIS + 1).is_none());
    }

    #[test]
    fn views_bucket_differently_near_month_boundary() {
        let deriver = Deriver::new();
        let last_of_jan = "2024-01-31 23:59:59";
        let first_of_feb = "2024-02-01 00:00:00";

        let fine_jan = deriver.derive(last_of_jan, DatePrecision::Day).unwrap();
        let coarse_jan = deriver.derive(last_of_jan, DatePrecision::DayKey).unwrap();
        assert_eq!(fine_jan.logdate, "2024-01-31");
        assert_eq!(coarse_jan.logdate, "20240131");
        assert_ne!(fine_jan.logdate, coarse_jan.logdate);

        // one second later both views roll over to the next day and month
        let fine_feb = deriver.derive(first_of_feb, DatePrecision::Day).unwrap();
        let coarse_feb = deriver.derive(first_of_feb, DatePrecision::DayKey).unwrap();
        assert_eq!(fine_feb.logdate, "2024-02-01");
        assert_eq!(coarse_feb.logdate, "20240201");
        assert_ne!(coarse_jan.logdate, coarse_feb.logdate);
    }

    #[test]
    fn coarse_bucket_is_one_calendar_day() {
        let deriver = Deriver::new();
        let bucket = |t| deriver.derive(t, DatePrecision::DayKey).unwrap().logdate;

        assert_eq!(bucket("2024-06-15 00:00:00"), bucket("2024-06-15 23:59:59"));
        assert_ne!(bucket("2024-01-01 12:00:00"), bucket("2024-12-31 12:00:00"));
        assert_ne!(bucket("2024-06-15 23:59:59"), bucket("2024-06-16 00:00:00"));
    }
}
