// ==========================================
// 学校纪律追踪系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod import_batch_repo;
pub mod infraction_import_repo;
pub mod infraction_repo;
pub mod period_repo;
pub mod sql_value;
pub mod student_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use import_batch_repo::ImportBatchRepository;
pub use infraction_import_repo::{
    AcademicPeriodSource, ImportBatchLedger, InfractionStore, StudentResolver,
};
pub use infraction_repo::InfractionRepository;
pub use period_repo::AcademicPeriodRepository;
pub use student_repo::StudentRepository;
