// ==========================================
// 学校纪律追踪系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 违纪记录 CSV 导入，按 hash 去重，两阶段人工核对
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "es");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - CSV → 违纪记录
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 共享状态与命令
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AcademicLevel, DuplicateAction, FaultType, ImportPhase};

// 领域实体
pub use domain::{
    AcademicPeriod, DuplicateRecord, ImportOutcome, InfractionRecord, ProcessingError, SchoolYear,
    Student, Trimester,
};

// 导入核心
pub use importer::{
    AcademicLevelClassifier, BatchReconciler, DateInterpreter, PeriodResolver, RecordHasher,
    RowTransformer,
};

// API
pub use api::{AcademicPeriodApi, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "学校纪律追踪系统";
