// ==========================================
// 学校纪律追踪系统 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发上传时的偶发 busy 错误
// - infraction.hash 为主键: 并发上传同一 hash 时由存储层唯一约束兜底
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 建表语句（幂等）
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS school_year (
    school_year_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 0,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS trimester (
    trimester_id TEXT PRIMARY KEY,
    school_year_id TEXT NOT NULL REFERENCES school_year(school_year_id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    sort_order INTEGER NOT NULL CHECK (sort_order BETWEEN 1 AND 3),
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    UNIQUE (school_year_id, sort_order)
);

CREATE TABLE IF NOT EXISTS student (
    student_id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    full_name TEXT,
    section TEXT,
    academic_level TEXT NOT NULL DEFAULT 'UNCLASSIFIED',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS infraction (
    hash TEXT PRIMARY KEY,
    student_id TEXT NOT NULL REFERENCES student(student_id),
    student_code TEXT NOT NULL,
    fault_type TEXT NOT NULL,
    fault_number INTEGER,
    description TEXT NOT NULL,
    detail TEXT,
    remedial_actions TEXT,
    author TEXT,
    occurred_on TEXT NOT NULL,
    reported_at TEXT NOT NULL,
    last_edited_at TEXT,
    last_editor TEXT,
    section TEXT,
    academic_level TEXT NOT NULL,
    trimester_id TEXT NOT NULL REFERENCES trimester(trimester_id),
    school_year_id TEXT NOT NULL REFERENCES school_year(school_year_id),
    external_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_infraction_student ON infraction(student_id);
CREATE INDEX IF NOT EXISTS idx_infraction_trimester ON infraction(trimester_id);

CREATE TABLE IF NOT EXISTS import_batch (
    batch_id TEXT PRIMARY KEY,
    phase TEXT NOT NULL,
    file_name TEXT,
    fault_type TEXT NOT NULL,
    trimester_id TEXT NOT NULL,
    total_rows INTEGER NOT NULL,
    processed_rows INTEGER NOT NULL,
    created_rows INTEGER NOT NULL,
    updated_rows INTEGER NOT NULL,
    duplicate_rows INTEGER NOT NULL,
    error_rows INTEGER NOT NULL,
    errors_json TEXT,
    imported_at TEXT NOT NULL,
    elapsed_ms INTEGER NOT NULL
);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表并登记 schema_version（可重复执行）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
