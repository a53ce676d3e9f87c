// ==========================================
// 学校纪律追踪系统 - 学年/学期仓储
// ==========================================
// 职责: school_year / trimester 表的读写
// 红线: 不校验区间是否重叠（由学期解析器报告配置缺陷）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::period::{AcademicPeriod, SchoolYear, Trimester};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::infraction_import_repo::AcademicPeriodSource;
use crate::repository::sql_value::{fmt_date, parse_date_column};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex};

const PERIOD_SELECT: &str = r#"
    SELECT
        y.school_year_id, y.name, y.is_active,
        t.trimester_id, t.name, t.sort_order, t.start_date, t.end_date
    FROM trimester t
    JOIN school_year y ON y.school_year_id = t.school_year_id
"#;

// ==========================================
// AcademicPeriodRepository - 学期仓储
// ==========================================
pub struct AcademicPeriodRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AcademicPeriodRepository {
    /// 创建新的 AcademicPeriodRepository 实例
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

    /// 创建学年
    ///
    /// 若 is_active = true，同一事务内取消其他学年的激活状态（最多一个激活学年）
    pub fn create_school_year(&self, year: &SchoolYear) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        insert_school_year(&tx, year)?;
        tx.commit()?;
        Ok(())
    }

    /// 创建学期
    pub fn create_trimester(&self, trimester: &Trimester) -> RepositoryResult<()> {
        validate_trimester(trimester)?;
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        insert_trimester(&tx, trimester)?;
        tx.commit()?;
        Ok(())
    }

    /// 在同一事务内创建学年及其学期
    ///
    /// 任一学期写入失败时整体回滚，不留下缺学期的学年
    pub fn create_school_year_with_trimesters(
        &self,
        year: &SchoolYear,
        trimesters: &[Trimester],
    ) -> RepositoryResult<()> {
        for trimester in trimesters {
            validate_trimester(trimester)?;
        }

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        insert_school_year(&tx, year)?;
        for trimester in trimesters {
            insert_trimester(&tx, trimester)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// 按学期 ID 查询（带所属学年）
    pub fn find_period_by_trimester_id(
        &self,
        trimester_id: &str,
    ) -> RepositoryResult<Option<AcademicPeriod>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE t.trimester_id = ?1", PERIOD_SELECT);
        let period = conn
            .query_row(&sql, params![trimester_id], map_period_row)
            .optional()?;
        Ok(period)
    }

    /// 查询当前激活学年
    pub fn find_active_school_year_id(&self) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let id = conn
            .query_row(
                "SELECT school_year_id FROM school_year WHERE is_active = 1 LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }
}

#[async_trait]
impl AcademicPeriodSource for AcademicPeriodRepository {
    async fn find_period(&self, trimester_id: &str) -> RepositoryResult<Option<AcademicPeriod>> {
        self.find_period_by_trimester_id(trimester_id)
    }

    async fn list_academic_periods(
        &self,
        school_year_id: Option<&str>,
    ) -> RepositoryResult<Vec<AcademicPeriod>> {
        let conn = self.get_conn()?;
        let periods = match school_year_id {
            Some(id) => {
                let sql = format!(
                    "{} WHERE t.school_year_id = ?1 ORDER BY t.start_date, t.sort_order",
                    PERIOD_SELECT
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![id], map_period_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let sql = format!("{} ORDER BY t.start_date, t.sort_order", PERIOD_SELECT);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], map_period_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(periods)
    }
}

fn validate_trimester(trimester: &Trimester) -> RepositoryResult<()> {
    if !(1..=3).contains(&trimester.order) {
        return Err(RepositoryError::FieldValueError {
            field: "order".to_string(),
            message: format!("学期顺序必须在 1..3 之间，实际 {}", trimester.order),
        });
    }
    if trimester.start_date > trimester.end_date {
        return Err(RepositoryError::FieldValueError {
            field: "start_date".to_string(),
            message: format!(
                "开始日期 {} 晚于结束日期 {}",
                trimester.start_date, trimester.end_date
            ),
        });
    }
    Ok(())
}

fn insert_school_year(tx: &Transaction<'_>, year: &SchoolYear) -> RepositoryResult<()> {
    if year.is_active {
        tx.execute("UPDATE school_year SET is_active = 0", [])?;
    }
    tx.execute(
        r#"
        INSERT INTO school_year (school_year_id, name, is_active, start_date, end_date)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            year.school_year_id,
            year.name,
            year.is_active as i32,
            fmt_date(year.start_date),
            fmt_date(year.end_date),
        ],
    )?;
    Ok(())
}

fn insert_trimester(tx: &Transaction<'_>, trimester: &Trimester) -> RepositoryResult<()> {
    tx.execute(
        r#"
        INSERT INTO trimester (trimester_id, school_year_id, name, sort_order, start_date, end_date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            trimester.trimester_id,
            trimester.school_year_id,
            trimester.name,
            trimester.order,
            fmt_date(trimester.start_date),
            fmt_date(trimester.end_date),
        ],
    )?;
    Ok(())
}

fn map_period_row(row: &Row<'_>) -> rusqlite::Result<AcademicPeriod> {
    Ok(AcademicPeriod {
        school_year_id: row.get(0)?,
        school_year_name: row.get(1)?,
        is_active: row.get::<_, i32>(2)? != 0,
        trimester_id: row.get(3)?,
        trimester_name: row.get(4)?,
        order: row.get(5)?,
        start_date: parse_date_column(&row.get::<_, String>(6)?, 6)?,
        end_date: parse_date_column(&row.get::<_, String>(7)?, 7)?,
    })
}
