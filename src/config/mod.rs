// ==========================================
// 利用率合并引擎 - 配置层
// ==========================================
// 职责: 导入参数默认值 + config_kv 覆写
// ==========================================

pub mod config_manager;
pub mod ingest_config;

pub use config_manager::{config_keys, ConfigManager};
pub use ingest_config::IngestConfig;
