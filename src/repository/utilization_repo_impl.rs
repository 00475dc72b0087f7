// ==========================================
// 利用率合并引擎 - 利用率 Repository 实现
// ==========================================
// 职责: 基于 rusqlite 的外部存储实现
// 红线: Repository 不含合并规则，只做数据存取
// 存储: 扁平记录以 JSON 文本保存
// - source_row: (source, person)
// - consolidated_entry: (composite_key, week)
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::types::SourceKind;
use crate::domain::utilization::{ConsolidatedEntry, FlatRecord, IngestBatch, NormalizedRow};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::utilization_repo::{StoreContext, UtilizationRepository};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

// ==========================================
// SqliteUtilizationRepository
// ==========================================
pub struct SqliteUtilizationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUtilizationRepository {
    /// 创建新的 Repository 实例
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

    /// 从已有连接创建（可与 ConfigManager 共用连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

fn record_person(record: &FlatRecord) -> RepositoryResult<String> {
    record
        .get("person")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RepositoryError::SerializationError("扁平记录缺少 person 字段".to_string()))
}

fn parse_source(code: &str) -> RepositoryResult<SourceKind> {
    SourceKind::from_code(code)
        .ok_or_else(|| RepositoryError::SerializationError(format!("未知数据源代码: {}", code)))
}

fn parse_timestamp(raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::SerializationError(format!("时间格式错误 '{}': {}", raw, e)))
}

#[async_trait]
impl UtilizationRepository for SqliteUtilizationRepository {
    /// 替换数据源记录（事务化）
    async fn replace_source_rows(
        &self,
        ctx: &StoreContext,
        source: SourceKind,
        file_name: &str,
        records: Vec<FlatRecord>,
    ) -> RepositoryResult<usize> {
        ctx.ensure_valid()?;
        let now = Utc::now().to_rfc3339();

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM source_row WHERE source = ?1", params![source.code()])?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO source_row (
                    source, person, seq_no, file_name, record_json, updated_at, updated_by
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for (seq_no, record) in records.iter().enumerate() {
                let person = record_person(record)?;
                let json = serde_json::to_string(record)?;
                stmt.execute(params![
                    source.code(),
                    person,
                    seq_no as i64,
                    file_name,
                    json,
                    now,
                    ctx.actor,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        debug!(source = %source, count, file_name, "数据源记录已替换");
        Ok(count)
    }

    async fn load_source_rows(
        &self,
        ctx: &StoreContext,
        source: SourceKind,
    ) -> RepositoryResult<Vec<NormalizedRow>> {
        ctx.ensure_valid()?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT person, record_json FROM source_row WHERE source = ?1 ORDER BY seq_no",
        )?;
        let raw = stmt
            .query_map(params![source.code()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(raw.len());
        for (person, json) in raw {
            let record: FlatRecord = serde_json::from_str(&json)?;
            match NormalizedRow::from_flat_record(&record) {
                Some(row) => rows.push(row),
                None => warn!(source = %source, person, "无法还原的扁平记录，忽略"),
            }
        }
        Ok(rows)
    }

    /// 全量替换合并结果（事务化）
    async fn replace_consolidated(
        &self,
        ctx: &StoreContext,
        entries: Vec<ConsolidatedEntry>,
    ) -> RepositoryResult<usize> {
        ctx.ensure_valid()?;
        let now = Utc::now().to_rfc3339();

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM consolidated_entry", [])?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO consolidated_entry (
                    composite_key, week, person, seq_no, entry_json, updated_at, updated_by
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for (seq_no, entry) in entries.iter().enumerate() {
                stmt.execute(params![
                    entry.composite_key,
                    entry.week.as_str(),
                    entry.person,
                    seq_no as i64,
                    serde_json::to_string(entry)?,
                    now,
                    ctx.actor,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        debug!(count, "合并结果已替换");
        Ok(count)
    }

    async fn load_consolidated(&self, ctx: &StoreContext) -> RepositoryResult<Vec<ConsolidatedEntry>> {
        ctx.ensure_valid()?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT entry_json FROM consolidated_entry ORDER BY seq_no")?;
        let raw = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        raw.iter()
            .map(|json| serde_json::from_str::<ConsolidatedEntry>(json).map_err(RepositoryError::from))
            .collect()
    }

    async fn insert_ingest_batch(&self, ctx: &StoreContext, batch: IngestBatch) -> RepositoryResult<()> {
        ctx.ensure_valid()?;
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO ingest_batch (
                batch_id, source, file_name, row_count, is_valid, error,
                diagnostics_json, imported_at, imported_by, elapsed_ms
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                batch.batch_id,
                batch.source.code(),
                batch.file_name,
                batch.row_count as i64,
                batch.is_valid,
                batch.error,
                serde_json::to_string(&batch.diagnostics)?,
                batch.imported_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                batch.imported_by,
                batch.elapsed_ms,
            ],
        )?;
        Ok(())
    }

    async fn recent_ingest_batches(&self, limit: usize) -> RepositoryResult<Vec<IngestBatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, source, file_name, row_count, is_valid, error,
                   diagnostics_json, imported_at, imported_by, elapsed_ms
            FROM ingest_batch
            ORDER BY imported_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;

        type RawBatch = (String, String, String, i64, bool, Option<String>, String, String, String, i64);
        let raw: Vec<RawBatch> = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(
                |(batch_id, source, file_name, row_count, is_valid, error, diagnostics, imported_at, imported_by, elapsed_ms)|
                 -> RepositoryResult<IngestBatch> {
                    Ok(IngestBatch {
                        batch_id,
                        source: parse_source(&source)?,
                        file_name,
                        row_count: row_count.max(0) as usize,
                        is_valid,
                        error,
                        diagnostics: serde_json::from_str(&diagnostics)?,
                        imported_at: parse_timestamp(&imported_at)?,
                        imported_by,
                        elapsed_ms,
                    })
                },
            )
            .collect()
    }
}
