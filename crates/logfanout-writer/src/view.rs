//! The two denormalized views and the batches written to them.
//!
//! | view   | partition key          | clustering | columns                 |
//! |--------|------------------------|------------|-------------------------|
//! | by-id  | (logdate, log_type)    | log_id     | create_time, raw_data   |
//! | by-day | (logdate, shardid)     | log_id     | create_time, raw_data   |

use std::fmt;
use std::sync::Arc;

use logfanout_config::BY_DAY_TABLE;
use logfanout_core::{DatePrecision, RecordIdentifier};
use uuid::Uuid;

/// Number of bound positions in every insert statement.
pub const BOUND_VALUES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    ById,
    ByDay,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::ById => write!(f, "by_id"),
            View::ByDay => write!(f, "by_day"),
        }
    }
}

/// Second partition-key component of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionValue {
    LogType(String),
    Shard(i32),
}

/// A value bound to one `?` of an insert statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundValue {
    Text(String),
    Int(i32),
    BigInt(i64),
    TimeUuid(Uuid),
}

/// One prepared write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRow {
    pub logdate: String,
    pub partition: PartitionValue,
    pub log_id: RecordIdentifier,
    /// Milliseconds since the Unix epoch
    pub create_time: i64,
    pub raw_data: String,
}

impl ViewRow {
    /// Values in statement order: logdate, log_type|shardid, log_id, create_time, raw_data.
    pub fn bind_values(&self) -> [BoundValue; BOUND_VALUES] {
        let partition = match &self.partition {
            PartitionValue::LogType(log_type) => BoundValue::Text(log_type.clone()),
            PartitionValue::Shard(shard) => BoundValue::Int(*shard),
        };
        [
            BoundValue::Text(self.logdate.clone()),
            partition,
            BoundValue::TimeUuid(self.log_id.into_uuid()),
            BoundValue::BigInt(self.create_time),
            BoundValue::Text(self.raw_data.clone()),
        ]
    }

    pub fn shard(&self) -> Option<i32> {
        match self.partition {
            PartitionValue::Shard(shard) => Some(shard),
            PartitionValue::LogType(_) => None,
        }
    }
}

/// Where and how rows for one view are written.
#[derive(Debug, Clone)]
pub struct ViewTarget {
    pub view: View,
    pub table: Arc<str>,
    pub query: Arc<str>,
    /// Logdate bucket granularity for this view
    pub precision: DatePrecision,
}

impl ViewTarget {
    pub fn by_id(table: &str, precision: DatePrecision) -> Self {
        Self {
            view: View::ById,
            table: Arc::from(table),
            query: Arc::from(insert_statement(table, "log_type")),
            precision,
        }
    }

    pub fn by_day(precision: DatePrecision) -> Self {
        Self {
            view: View::ByDay,
            table: Arc::from(BY_DAY_TABLE),
            query: Arc::from(insert_statement(BY_DAY_TABLE, "shardid")),
            precision,
        }
    }
}

fn insert_statement(table: &str, partition_column: &str) -> String {
    format!(
        "INSERT INTO {} (logdate, {}, log_id, create_time, raw_data) VALUES (?, ?, ?, ?, ?);",
        table, partition_column
    )
}

/// An ordered group of rows for one view, applied atomically by the store.
#[derive(Debug, Clone)]
pub struct WriteBatch {
    pub view: View,
    pub table: Arc<str>,
    pub query: Arc<str>,
    pub rows: Vec<ViewRow>,
}

impl WriteBatch {
    pub fn new(target: &ViewTarget, capacity: usize) -> Self {
        Self {
            view: target.view,
            table: Arc::clone(&target.table),
            query: Arc::clone(&target.query),
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, row: ViewRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logfanout_core::Deriver;

    #[test]
    fn statements_have_five_positions() {
        let by_id = ViewTarget::by_id("nginx.t_nginx_log_by_id", DatePrecision::Day);
        assert_eq!(
            &*by_id.query,
            "INSERT INTO nginx.t_nginx_log_by_id (logdate, log_type, log_id, create_time, raw_data) VALUES (?, ?, ?, ?, ?);"
        );
        assert_eq!(by_id.query.matches('?').count(), BOUND_VALUES);

        let by_day = ViewTarget::by_day(DatePrecision::DayKey);
        assert_eq!(&*by_day.table, "nginx.t_nginx_log_by_day");
        assert!(by_day.query.contains("(logdate, shardid, log_id, create_time, raw_data)"));
        assert_eq!(by_day.query.matches('?').count(), BOUND_VALUES);
    }

    #[test]
    fn bind_values_follow_statement_order() {
        let id = Deriver::new().identifier_at(1_704_067_200_000).unwrap();
        let row = ViewRow {
            logdate: "20240101".to_string(),
            partition: PartitionValue::Shard(7),
            log_id: id,
            create_time: 1_704_067_200_000,
            raw_data: "hello".to_string(),
        };

        assert_eq!(
            row.bind_values(),
            [
                BoundValue::Text("20240101".to_string()),
                BoundValue::Int(7),
                BoundValue::TimeUuid(id.into_uuid()),
                BoundValue::BigInt(1_704_067_200_000),
                BoundValue::Text("hello".to_string()),
            ]
        );
        assert_eq!(row.shard(), Some(7));
    }
}
