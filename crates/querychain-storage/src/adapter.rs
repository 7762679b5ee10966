// SPDX-FileCopyrightText: 2026 QueryChain Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`SessionMemory`] trait.

use async_trait::async_trait;
use querychain_config::model::StorageConfig;
use querychain_core::{
    AdapterType, HealthStatus, PluginAdapter, QueryChainError, Role, SessionMemory, Turn,
};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::database::{map_tr_err, Database};
use crate::queries;

/// SQLite-backed session memory.
///
/// The database is opened on [`SessionMemory::initialize`]; every other
/// operation fails with a storage error until then.
pub struct SqliteSessionMemory {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteSessionMemory {
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, QueryChainError> {
        self.db.get().ok_or_else(|| QueryChainError::Storage {
            source: "session memory not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteSessionMemory {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SessionMemory
    }

    async fn health_check(&self) -> Result<HealthStatus, QueryChainError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), QueryChainError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl SessionMemory for SqliteSessionMemory {
    async fn initialize(&self) -> Result<(), QueryChainError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| QueryChainError::Storage {
            source: "session memory already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite session memory initialized");
        Ok(())
    }

    async fn append(
        &self,
        session_id: &str,
        user_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Turn, QueryChainError> {
        queries::turns::insert_turn(self.db()?, session_id, user_id, role, content).await
    }

    async fn recent_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<Turn>, QueryChainError> {
        queries::turns::recent_turns(self.db()?, session_id, limit).await
    }

    async fn clear(&self, session_id: &str) -> Result<u64, QueryChainError> {
        let removed = queries::turns::delete_session_turns(self.db()?, session_id).await?;
        debug!(session_id, removed, "session cleared");
        Ok(removed)
    }
}
