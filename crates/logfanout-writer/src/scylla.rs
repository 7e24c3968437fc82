//! Cassandra/ScyllaDB session backed by the `scylla` driver.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use logfanout_config::StorageConfig;
use parking_lot::{Mutex, RwLock};
use scylla::client::session::Session as ClusterSession;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::batch::{Batch, BatchType};
use scylla::statement::prepared::PreparedStatement;
use scylla::value::{CqlTimeuuid, CqlValue};
use tracing::{debug, info};

use crate::error::{Result, StorageError, WriterError};
use crate::session::{Ack, Session};
use crate::view::{BoundValue, WriteBatch};

pub struct ScyllaSession {
    session: RwLock<Option<Arc<ClusterSession>>>,
    /// Prepared inserts keyed by statement text
    prepared: Mutex<HashMap<Arc<str>, PreparedStatement>>,
}

impl ScyllaSession {
    /// Connect to the cluster described by `config`.
    ///
    /// Fails without writing anything when the cluster is unreachable or
    /// rejects the credentials.
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let mut builder = SessionBuilder::new()
            .known_nodes(&config.contact_points)
            .connection_timeout(config.connect_timeout());
        if let (Some(user), Some(password)) = (&config.username, &config.password) {
            builder = builder.user(user, password);
        }

        let session = builder
            .build()
            .await
            .map_err(|e| WriterError::connection_setup(&config.contact_points, e.to_string()))?;

        info!(hosts = ?config.contact_points, "Connected to cluster");
        Ok(Self {
            session: RwLock::new(Some(Arc::new(session))),
            prepared: Mutex::new(HashMap::new()),
        })
    }

    fn live(&self) -> std::result::Result<Arc<ClusterSession>, StorageError> {
        self.session.read().clone().ok_or(StorageError::Closed)
    }

    async fn prepared(
        &self,
        session: &ClusterSession,
        query: &Arc<str>,
    ) -> std::result::Result<PreparedStatement, StorageError> {
        let cached = self.prepared.lock().get(query).cloned();
        if let Some(statement) = cached {
            return Ok(statement);
        }

        debug!(query = %query, "Preparing statement");
        let statement = session
            .prepare(query.as_ref())
            .await
            .map_err(|e| StorageError::Execute(e.to_string()))?;
        self.prepared
            .lock()
            .insert(Arc::clone(query), statement.clone());
        Ok(statement)
    }
}

fn to_cql(value: BoundValue) -> CqlValue {
    match value {
        BoundValue::Text(s) => CqlValue::Text(s),
        BoundValue::Int(v) => CqlValue::Int(v),
        BoundValue::BigInt(v) => CqlValue::BigInt(v),
        BoundValue::TimeUuid(id) => CqlValue::Timeuuid(CqlTimeuuid::from(id)),
    }
}

#[async_trait]
impl Session for ScyllaSession {
    async fn execute(&self, query: &str) -> std::result::Result<Ack, StorageError> {
        let session = self.live()?;
        session
            .query_unpaged(query, ())
            .await
            .map_err(|e| StorageError::Execute(e.to_string()))?;
        Ok(Ack { statements: 1 })
    }

    async fn execute_batch(&self, batch: &WriteBatch) -> std::result::Result<Ack, StorageError> {
        let session = self.live()?;
        let statement = self.prepared(&session, &batch.query).await?;

        let mut logged = Batch::new(BatchType::Logged);
        let mut values: Vec<Vec<CqlValue>> = Vec::with_capacity(batch.len());
        for row in &batch.rows {
            logged.append_statement(statement.clone());
            values.push(row.bind_values().into_iter().map(to_cql).collect());
        }

        session
            .batch(&logged, values)
            .await
            .map_err(|e| StorageError::Batch(e.to_string()))?;
        Ok(Ack {
            statements: batch.len(),
        })
    }

    async fn close(&self) -> std::result::Result<(), StorageError> {
        if self.session.write().take().is_some() {
            self.prepared.lock().clear();
            debug!("Cluster session closed");
        }
        Ok(())
    }
}
