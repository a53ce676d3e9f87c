// ==========================================
// 学校纪律追踪系统 - 应用层
// ==========================================
// 职责: 共享状态与命令，连接调用方与后端
// ==========================================

pub mod commands;
pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
