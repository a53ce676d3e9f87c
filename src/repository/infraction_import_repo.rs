// ==========================================
// 学校纪律追踪系统 - 违纪导入 Repository Trait
// ==========================================
// 职责: 定义导入核心所依赖的存储协作者接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::infraction::{ImportBatch, InfractionRecord};
use crate::domain::period::AcademicPeriod;
use crate::domain::student::StudentProfile;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// InfractionStore Trait
// ==========================================
// 用途: 违纪记录按 hash 读写
// 实现者: InfractionRepository（使用 rusqlite）
#[async_trait]
pub trait InfractionStore: Send + Sync {
    /// 按 hash 查询违纪记录
    ///
    /// # 返回
    /// - Ok(Some(record)): 已存在
    /// - Ok(None): 不存在
    async fn find_infraction_by_hash(&self, hash: &str)
        -> RepositoryResult<Option<InfractionRecord>>;

    /// 新建违纪记录
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): hash 已被（并发）写入
    async fn create_infraction(&self, record: &InfractionRecord) -> RepositoryResult<()>;

    /// 用新解析的字段覆盖已存在的记录（hash 不变）
    ///
    /// # 返回
    /// - Ok(true): 已覆盖
    /// - Ok(false): 记录已不存在
    async fn update_infraction(
        &self,
        hash: &str,
        record: &InfractionRecord,
    ) -> RepositoryResult<bool>;
}

// ==========================================
// StudentResolver Trait
// ==========================================
// 用途: 按学号查找学生,不存在时惰性创建
// 实现者: StudentRepository
#[async_trait]
pub trait StudentResolver: Send + Sync {
    /// 查找或创建学生
    ///
    /// # 参数
    /// - code: 学号（CSV "Código" 列）
    /// - profile: 随行携带的姓名/班级/学段
    ///
    /// # 返回
    /// - Ok(student_id)
    /// - Err(NotFound): 学生不存在且不允许自动创建
    async fn find_or_create_student(
        &self,
        code: &str,
        profile: &StudentProfile,
    ) -> RepositoryResult<String>;
}

// ==========================================
// AcademicPeriodSource Trait
// ==========================================
// 用途: 读取学年/学期区间（只读）
// 实现者: AcademicPeriodRepository
#[async_trait]
pub trait AcademicPeriodSource: Send + Sync {
    /// 列出学期区间
    ///
    /// # 参数
    /// - school_year_id: None 表示所有学年
    async fn list_academic_periods(
        &self,
        school_year_id: Option<&str>,
    ) -> RepositoryResult<Vec<AcademicPeriod>>;

    /// 按学期 ID 查询（带所属学年）
    async fn find_period(&self, trimester_id: &str) -> RepositoryResult<Option<AcademicPeriod>>;
}

// ==========================================
// ImportBatchLedger Trait
// ==========================================
// 用途: 记录每次导入（预览/提交）的批次台账
// 实现者: ImportBatchRepository
#[async_trait]
pub trait ImportBatchLedger: Send + Sync {
    /// 写入批次记录
    async fn record_batch(&self, batch: &ImportBatch) -> RepositoryResult<()>;
}
