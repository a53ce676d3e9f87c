// ==========================================
// 学校纪律追踪系统 - 违纪记录仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: hash 为主键，唯一约束冲突原样上抛（由导入层判定为并发重复）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::infraction::InfractionRecord;
use crate::domain::types::{AcademicLevel, FaultType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::infraction_import_repo::InfractionStore;
use crate::repository::sql_value::{
    fmt_date, fmt_datetime, parse_date_column, parse_datetime_column,
};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    hash, student_id, student_code, fault_type, fault_number,
    description, detail, remedial_actions, author,
    occurred_on, reported_at, last_edited_at, last_editor,
    section, academic_level, trimester_id, school_year_id, external_id
"#;

// ==========================================
// InfractionRepository - 违纪记录仓储
// ==========================================
pub struct InfractionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InfractionRepository {
    /// 创建新的 InfractionRepository 实例
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

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询学生的全部违纪记录（按发生日期升序）
    pub fn find_by_student_code(&self, student_code: &str) -> RepositoryResult<Vec<InfractionRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM infraction WHERE student_code = ?1 ORDER BY occurred_on, hash",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params![student_code], map_infraction_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// 统计某学期的违纪记录数
    pub fn count_by_trimester(&self, trimester_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM infraction WHERE trimester_id = ?1",
            params![trimester_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 统计全部违纪记录数
    pub fn count_all(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM infraction", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[async_trait]
impl InfractionStore for InfractionRepository {
    async fn find_infraction_by_hash(
        &self,
        hash: &str,
    ) -> RepositoryResult<Option<InfractionRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM infraction WHERE hash = ?1", SELECT_COLUMNS);
        let record = conn
            .query_row(&sql, params![hash], map_infraction_row)
            .optional()?;
        Ok(record)
    }

    async fn create_infraction(&self, record: &InfractionRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO infraction (
                hash, student_id, student_code, fault_type, fault_number,
                description, detail, remedial_actions, author,
                occurred_on, reported_at, last_edited_at, last_editor,
                section, academic_level, trimester_id, school_year_id, external_id,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?19
            )
            "#,
            params![
                record.hash,
                record.student_id,
                record.student_code,
                record.fault_type.to_db_str(),
                record.fault_number,
                record.description,
                record.detail,
                record.remedial_actions,
                record.author,
                fmt_date(record.occurred_on),
                fmt_datetime(record.reported_at),
                record.last_edited_at.map(fmt_datetime),
                record.last_editor,
                record.section,
                record.academic_level.to_db_str(),
                record.trimester_id,
                record.school_year_id,
                record.external_id,
                now,
            ],
        )?;
        Ok(())
    }

    async fn update_infraction(
        &self,
        hash: &str,
        record: &InfractionRecord,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE infraction SET
                student_id = ?2,
                student_code = ?3,
                fault_type = ?4,
                fault_number = ?5,
                description = ?6,
                detail = ?7,
                remedial_actions = ?8,
                author = ?9,
                occurred_on = ?10,
                reported_at = ?11,
                last_edited_at = ?12,
                last_editor = ?13,
                section = ?14,
                academic_level = ?15,
                trimester_id = ?16,
                school_year_id = ?17,
                external_id = ?18,
                updated_at = ?19
            WHERE hash = ?1
            "#,
            params![
                hash,
                record.student_id,
                record.student_code,
                record.fault_type.to_db_str(),
                record.fault_number,
                record.description,
                record.detail,
                record.remedial_actions,
                record.author,
                fmt_date(record.occurred_on),
                fmt_datetime(record.reported_at),
                record.last_edited_at.map(fmt_datetime),
                record.last_editor,
                record.section,
                record.academic_level.to_db_str(),
                record.trimester_id,
                record.school_year_id,
                record.external_id,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(affected > 0)
    }
}

/// 行映射: infraction → InfractionRecord
fn map_infraction_row(row: &Row<'_>) -> rusqlite::Result<InfractionRecord> {
    let fault_type_raw: String = row.get(3)?;
    let fault_type = FaultType::from_str(&fault_type_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("未知违纪类型: {}", fault_type_raw).into(),
        )
    })?;

    let last_edited_at = match row.get::<_, Option<String>>(11)? {
        Some(raw) => Some(parse_datetime_column(&raw, 11)?),
        None => None,
    };

    Ok(InfractionRecord {
        hash: row.get(0)?,
        student_id: row.get(1)?,
        student_code: row.get(2)?,
        fault_type,
        fault_number: row.get(4)?,
        description: row.get(5)?,
        detail: row.get(6)?,
        remedial_actions: row.get(7)?,
        author: row.get(8)?,
        occurred_on: parse_date_column(&row.get::<_, String>(9)?, 9)?,
        reported_at: parse_datetime_column(&row.get::<_, String>(10)?, 10)?,
        last_edited_at,
        last_editor: row.get(12)?,
        section: row.get(13)?,
        academic_level: AcademicLevel::from_str(&row.get::<_, String>(14)?),
        trimester_id: row.get(15)?,
        school_year_id: row.get(16)?,
        external_id: row.get(17)?,
    })
}
