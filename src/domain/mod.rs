// ==========================================
// 学校纪律追踪系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含导入逻辑
// ==========================================

pub mod infraction;
pub mod period;
pub mod student;
pub mod types;

// 重导出核心类型
pub use infraction::{
    DuplicateDecision, DuplicateHandling, DuplicateRecord, ImportBatch, ImportOutcome,
    InfractionRecord, PeriodDiagnosticReport, PeriodDiagnosticRow, ProcessingError,
    ProcessingErrorKind, TransformedRow,
};
pub use period::{AcademicPeriod, SchoolYear, Trimester};
pub use student::{Student, StudentProfile};
pub use types::{AcademicLevel, DuplicateAction, FaultType, ImportPhase};
