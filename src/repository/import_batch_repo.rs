// ==========================================
// 学校纪律追踪系统 - 导入批次台账仓储
// ==========================================
// 职责: import_batch 表（每次预览/提交一行）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::infraction::ImportBatch;
use crate::domain::types::{FaultType, ImportPhase};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::infraction_import_repo::ImportBatchLedger;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

pub struct ImportBatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportBatchRepository {
    /// 创建新的 ImportBatchRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入批次记录
    pub fn insert(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, phase, file_name, fault_type, trimester_id,
                total_rows, processed_rows, created_rows, updated_rows,
                duplicate_rows, error_rows, errors_json, imported_at, elapsed_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                batch.batch_id,
                batch.phase.to_db_str(),
                batch.file_name,
                batch.fault_type.to_db_str(),
                batch.trimester_id,
                batch.total_rows,
                batch.processed_rows,
                batch.created_rows,
                batch.updated_rows,
                batch.duplicate_rows,
                batch.error_rows,
                batch.errors_json,
                batch.imported_at.to_rfc3339(),
                batch.elapsed_ms,
            ],
        )?;
        Ok(())
    }

    /// 查询最近的导入批次（按导入时间倒序）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, phase, file_name, fault_type, trimester_id,
                   total_rows, processed_rows, created_rows, updated_rows,
                   duplicate_rows, error_rows, errors_json, imported_at, elapsed_ms
            FROM import_batch
            ORDER BY imported_at DESC
            LIMIT ?1
            "#,
        )?;

        let batches = stmt
            .query_map(params![limit as i64], |row| {
                let fault_raw: String = row.get(3)?;
                let imported_raw: String = row.get(12)?;
                Ok(ImportBatch {
                    batch_id: row.get(0)?,
                    phase: ImportPhase::from_str(&row.get::<_, String>(1)?),
                    file_name: row.get(2)?,
                    fault_type: FaultType::from_str(&fault_raw).ok_or_else(|| {
                        rusqlite::Error::FromSqlConversionFailure(
                            3,
                            rusqlite::types::Type::Text,
                            format!("未知违纪类型: {}", fault_raw).into(),
                        )
                    })?,
                    trimester_id: row.get(4)?,
                    total_rows: row.get(5)?,
                    processed_rows: row.get(6)?,
                    created_rows: row.get(7)?,
                    updated_rows: row.get(8)?,
                    duplicate_rows: row.get(9)?,
                    error_rows: row.get(10)?,
                    errors_json: row.get(11)?,
                    imported_at: DateTime::parse_from_rfc3339(&imported_raw)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                12,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?,
                    elapsed_ms: row.get(13)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(batches)
    }
}

#[async_trait]
impl ImportBatchLedger for ImportBatchRepository {
    async fn record_batch(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        self.insert(batch)
    }
}
