// ==========================================
// 学校纪律追踪系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取 CSV 分隔符
    ///
    /// # 默认值
    /// - ';'
    async fn get_csv_delimiter(&self) -> Result<u8, Box<dyn Error>>;

    /// 学号不存在时是否自动创建学生
    ///
    /// # 默认值
    /// - true
    async fn get_auto_create_students(&self) -> Result<bool, Box<dyn Error>>;

    /// 获取上传文件大小上限（字节）
    ///
    /// # 默认值
    /// - 5 MiB
    async fn get_max_upload_bytes(&self) -> Result<u64, Box<dyn Error>>;

    /// 获取界面语言（用于结果消息）
    ///
    /// # 默认值
    /// - "es"
    async fn get_ui_locale(&self) -> Result<String, Box<dyn Error>>;
}
