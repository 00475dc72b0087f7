// ==========================================
// 利用率合并引擎 - 配置管理器
// ==========================================
// 职责: 读取 / 覆写导入参数
// 存储: config_kv 表 (scope_id='global', key 以 "ingest/" 开头)
// 缺失的键回退到 IngestConfig::default()，无法解析的值报错而不是静默回退
// ==========================================

use crate::config::ingest_config::IngestConfig;
use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与仓储共用同一连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        debug!(key, value, "配置已写入");
        Ok(())
    }

    fn get_parsed<T: FromStr>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T::Err: std::fmt::Display,
    {
        match self.get_global_value(key)? {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| RepositoryError::ConfigValueError {
                    key: key.to_string(),
                    message: format!("'{}' 无法解析: {}", raw, e),
                }),
        }
    }

    /// 读取生效的导入参数（默认值 + config_kv 覆写）
    ///
    /// # 错误
    /// - ConfigValueError: 值无法解析或超出合法范围
    pub fn get_ingest_config(&self) -> RepositoryResult<IngestConfig> {
        let defaults = IngestConfig::default();
        let config = IngestConfig {
            header_scan_depth: self
                .get_parsed(config_keys::HEADER_SCAN_DEPTH, defaults.header_scan_depth)?,
            min_week_cells: self.get_parsed(config_keys::MIN_WEEK_CELLS, defaults.min_week_cells)?,
            role_offset_window: self
                .get_parsed(config_keys::ROLE_OFFSET_WINDOW, defaults.role_offset_window)?,
            fixed_header_row: self
                .get_parsed(config_keys::FIXED_HEADER_ROW, defaults.fixed_header_row)?,
            fixed_data_start_row: self
                .get_parsed(config_keys::FIXED_DATA_START_ROW, defaults.fixed_data_start_row)?,
            historical_weeks: self
                .get_parsed(config_keys::HISTORICAL_WEEKS, defaults.historical_weeks)?,
            forecast_weeks: self.get_parsed(config_keys::FORECAST_WEEKS, defaults.forecast_weeks)?,
            fraction_threshold: self
                .get_parsed(config_keys::FRACTION_THRESHOLD, defaults.fraction_threshold)?,
        };
        validate(&config)?;
        Ok(config)
    }

    /// 生效参数的 JSON 快照（默认值叠加 config_kv 覆写，供诊断输出）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let config = self.get_ingest_config()?;
        Ok(serde_json::to_string(&config)?)
    }
}

fn validate(config: &IngestConfig) -> RepositoryResult<()> {
    let invalid = |key: &str, message: &str| {
        Err(RepositoryError::ConfigValueError {
            key: key.to_string(),
            message: message.to_string(),
        })
    };
    if config.header_scan_depth == 0 {
        return invalid(config_keys::HEADER_SCAN_DEPTH, "必须大于 0");
    }
    if config.min_week_cells == 0 {
        return invalid(config_keys::MIN_WEEK_CELLS, "必须大于 0");
    }
    if config.fixed_data_start_row <= config.fixed_header_row {
        return invalid(config_keys::FIXED_DATA_START_ROW, "必须位于固定表头行之后");
    }
    if !config.fraction_threshold.is_finite() || config.fraction_threshold < 0.0 {
        return invalid(config_keys::FRACTION_THRESHOLD, "必须为非负有限数");
    }
    Ok(())
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 表头定位
    pub const HEADER_SCAN_DEPTH: &str = "ingest/header_scan_depth";
    pub const MIN_WEEK_CELLS: &str = "ingest/min_week_cells";
    pub const ROLE_OFFSET_WINDOW: &str = "ingest/role_offset_window";

    // 固定布局
    pub const FIXED_HEADER_ROW: &str = "ingest/fixed_header_row";
    pub const FIXED_DATA_START_ROW: &str = "ingest/fixed_data_start_row";

    // 周窗口
    pub const HISTORICAL_WEEKS: &str = "ingest/historical_weeks";
    pub const FORECAST_WEEKS: &str = "ingest/forecast_weeks";

    pub const FRACTION_THRESHOLD: &str = "ingest/fraction_threshold";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = manager().get_ingest_config().unwrap();
        assert_eq!(config, IngestConfig::default());
    }

    #[test]
    fn test_override() {
        let manager = manager();
        manager.set_global_value(config_keys::FORECAST_WEEKS, "4").unwrap();
        manager.set_global_value(config_keys::FORECAST_WEEKS, " 6 ").unwrap();
        let config = manager.get_ingest_config().unwrap();
        assert_eq!(config.forecast_weeks, 6);
        assert_eq!(config.historical_weeks, 8);
    }

    #[test]
    fn test_unparsable_value_rejected() {
        let manager = manager();
        manager.set_global_value(config_keys::HISTORICAL_WEEKS, "acht").unwrap();
        let err = manager.get_ingest_config().unwrap_err();
        assert!(matches!(err, RepositoryError::ConfigValueError { ref key, .. } if key == config_keys::HISTORICAL_WEEKS));
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let manager = manager();
        manager.set_global_value(config_keys::FIXED_DATA_START_ROW, "2").unwrap();
        assert!(manager.get_ingest_config().is_err());
    }

    #[test]
    fn test_snapshot() {
        let manager = manager();
        manager.set_global_value(config_keys::FORECAST_WEEKS, "4").unwrap();
        let snapshot = manager.get_config_snapshot().unwrap();
        let value: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(value["fixed_data_start_row"], 8);
        assert_eq!(value["forecast_weeks"], 4, "快照反映覆写后的生效值");
    }
}
