// logfanout-core - Pure record handling for the ingestion write path
//
// Everything here is deterministic apart from identifier entropy:
// no I/O, no async, no storage types.
//
// raw line -> record::parse_line -> id::Deriver::derive -> partition::partition

pub mod error;
pub mod id;
pub mod partition;
pub mod record;
pub mod time;

pub use error::{ParseError, RecordError, TimeFormatError};
pub use id::{DerivedTime, Deriver, RecordIdentifier, MAX_UNIX_MILLIS};
pub use partition::{partition, Chunk, Partition};
pub use record::{parse_line, ParsedFields, FIELD_COUNT, FIELD_DELIMITER};
pub use time::{format_date, parse_time, DatePrecision};

/// Default number of rows in one storage batch.
pub const BATCH_SIZE: usize = 200;

/// Default number of shards for the by-day view.
pub const SHARD_COUNT: u32 = 12;
