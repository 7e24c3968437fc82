// logfanout - Load pipe-delimited log lines into two Cassandra/ScyllaDB views
//
// Every line `logType|eventTime|rawData` is written twice:
// - by id:  partitioned by (logdate, log_type), logdate at day granularity
// - by day: partitioned by (logdate, shardid), logdate as a compact day key
//
// Pieces:
// - logfanout-core: parsing, time derivation, identifiers, chunking
// - logfanout-config: layered TOML + environment configuration
// - logfanout-writer: sessions, the dual-view writer and the worker pool
// - this crate: tracing setup, input reading and the CLI

mod ingest;
mod init;

pub use ingest::{ingest_reader, run, Input};
pub use init::{connect_session, init_tracing};

pub use logfanout_config as config;
pub use logfanout_writer as writer;
