// ==========================================
// 学校纪律追踪系统 - 学生仓储
// ==========================================
// 职责: 按学号查找/惰性创建学生
// 红线: Repository 不含业务逻辑（学段分类由导入层完成后传入）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::student::{Student, StudentProfile};
use crate::domain::types::AcademicLevel;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::infraction_import_repo::StudentResolver;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

// ==========================================
// StudentRepository - 学生仓储
// ==========================================
pub struct StudentRepository {
    conn: Arc<Mutex<Connection>>,
    // 学号不存在时是否自动建档（config_kv: auto_create_students）
    auto_create: bool,
}

impl StudentRepository {
    /// 创建新的 StudentRepository 实例（默认允许自动建档）
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            auto_create: true,
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            auto_create: true,
        }
    }

    /// 设置是否允许自动建档
    pub fn with_auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按学号查询学生
    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<Student>> {
        let conn = self.get_conn()?;
        let student = conn
            .query_row(
                r#"
                SELECT student_id, code, full_name, section, academic_level, created_at, updated_at
                FROM student WHERE code = ?1
                "#,
                params![code],
                |row| {
                    Ok(Student {
                        student_id: row.get(0)?,
                        code: row.get(1)?,
                        full_name: row.get(2)?,
                        section: row.get(3)?,
                        academic_level: AcademicLevel::from_str(&row.get::<_, String>(4)?),
                        created_at: parse_rfc3339(&row.get::<_, String>(5)?, 5)?,
                        updated_at: parse_rfc3339(&row.get::<_, String>(6)?, 6)?,
                    })
                },
            )
            .optional()?;
        Ok(student)
    }

    /// 统计学生数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM student", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[async_trait]
impl StudentResolver for StudentRepository {
    async fn find_or_create_student(
        &self,
        code: &str,
        profile: &StudentProfile,
    ) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let now = Utc::now().to_rfc3339();

        if let Some(student_id) = select_student_id(&conn, code)? {
            refresh_profile(&conn, &student_id, profile, &now)?;
            return Ok(student_id);
        }

        if !self.auto_create {
            return Err(RepositoryError::NotFound {
                entity: "Student".to_string(),
                id: code.to_string(),
            });
        }

        insert_or_adopt(&conn, code, profile, &now)
    }
}

fn select_student_id(conn: &Connection, code: &str) -> RepositoryResult<Option<String>> {
    let id = conn
        .query_row(
            "SELECT student_id FROM student WHERE code = ?1",
            params![code],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// 以最新上传刷新姓名/班级/学段（空值不覆盖）
fn refresh_profile(
    conn: &Connection,
    student_id: &str,
    profile: &StudentProfile,
    now: &str,
) -> RepositoryResult<()> {
    conn.execute(
        r#"
        UPDATE student SET
            full_name = COALESCE(?2, full_name),
            section = COALESCE(?3, section),
            academic_level = CASE WHEN ?3 IS NULL THEN academic_level ELSE ?4 END,
            updated_at = ?5
        WHERE student_id = ?1
        "#,
        params![
            student_id,
            profile.full_name,
            profile.section,
            profile.academic_level.to_db_str(),
            now,
        ],
    )?;
    Ok(())
}

/// INSERT ... ON CONFLICT(code) DO NOTHING；未插入时读取胜出方的 student_id
fn insert_or_adopt(
    conn: &Connection,
    code: &str,
    profile: &StudentProfile,
    now: &str,
) -> RepositoryResult<String> {
    let student_id = Uuid::new_v4().to_string();
    let inserted = conn.execute(
        r#"
        INSERT INTO student (
            student_id, code, full_name, section, academic_level, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        ON CONFLICT(code) DO NOTHING
        "#,
        params![
            student_id,
            code,
            profile.full_name,
            profile.section,
            profile.academic_level.to_db_str(),
            now,
        ],
    )?;

    if inserted > 0 {
        debug!(student_code = %code, student_id = %student_id, "自动创建学生档案");
        return Ok(student_id);
    }

    let existing = select_student_id(conn, code)?.ok_or_else(|| RepositoryError::NotFound {
        entity: "Student".to_string(),
        id: code.to_string(),
    })?;
    debug!(student_code = %code, student_id = %existing, "学号已由并发上传建档");
    refresh_profile(conn, &existing, profile, now)?;
    Ok(existing)
}

fn parse_rfc3339(raw: &str, col: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
        })
}
