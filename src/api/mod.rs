// ==========================================
// 学校纪律追踪系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供应用层命令调用
// ==========================================

pub mod academic_period_api;
pub mod error;
pub mod import_api;

// 重导出核心类型
pub use academic_period_api::AcademicPeriodApi;
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, ImportInfractionsRequest};
