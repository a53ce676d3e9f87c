// ==========================================
// 学校纪律追踪系统 - 导入层
// ==========================================
// 职责: 违纪 CSV → 违纪记录，含跨批次去重核对
// 支持: CSV（分号分隔，表头容忍首尾空白）
// ==========================================

// 模块声明
pub mod batch_reconciler;
pub mod conflict_handler;
pub mod date_interpreter;
pub mod error;
pub mod file_parser;
pub mod infraction_importer_trait;
pub mod level_classifier;
pub mod period_resolver;
pub mod record_hasher;
pub mod row_transformer;

// 重导出核心类型
pub use batch_reconciler::BatchReconciler;
pub use conflict_handler::ConflictHandler;
pub use date_interpreter::DateInterpreter;
pub use error::{
    DateFormatError, ImportError, ImportResult, PeriodResolutionError, RowRejection,
    RowValidationError,
};
pub use file_parser::{CsvParser, ParsedCsv, RawCsvRow};
pub use level_classifier::{AcademicLevelClassifier, LevelMatch, MatchStrategy};
pub use period_resolver::PeriodResolver;
pub use record_hasher::{HashFields, RecordHasher};
pub use row_transformer::{RowTransformer, TransformContext};

// 重导出 Trait 接口
pub use infraction_importer_trait::{ImportRequest, InfractionImporter};
