// ==========================================
// 利用率合并引擎 - 上传处理流水线
// ==========================================
// 单文件流程:
// 1. 字节 → 网格（按扩展名选择解析器）
// 2. 按数据源选择提取策略 → NormalizedRow
// 3. 有效结果立即持久化（按数据源整体替换）
// 4. 记录上传批次
// 5. 从存储重新读取 A、B 两个数据源并合并
// ==========================================
// 红线: 单文件错误写入 IngestOutcome，不向外传播，
//       不影响另一个文件的流水线
// ==========================================

use crate::config::IngestConfig;
use crate::domain::types::SourceKind;
use crate::domain::utilization::{
    ConsolidatedEntry, ConsolidationStatus, IngestBatch, NormalizedRow,
};
use crate::engine::consolidation::{ConsolidationEngine, ConsolidationResult};
use crate::importer::deployment_plan_extractor::extractor_for;
use crate::importer::error::ImportErrorKind;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::sheet_extractor_trait::{
    ExtractionFailure, ExtractionResult, ExtractionResultExt, GridLoader,
};
use crate::repository::utilization_repo::{StoreContext, UtilizationRepository};
use chrono::{Local, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// 输入 / 输出
// ==========================================

/// 一次上传: 数据源 + 文件名 + 内存中的文件内容
#[derive(Debug, Clone)]
pub struct Upload {
    pub source: SourceKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(source: SourceKind, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            source,
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// 一次合并运行的结果
#[derive(Debug, Clone)]
pub struct ConsolidationRun {
    pub run_id: String,
    pub entries: Vec<ConsolidatedEntry>,
    pub status: ConsolidationStatus,
}

/// 单文件流水线结果
#[derive(Debug)]
pub struct IngestOutcome {
    /// 审计记录（含有效性、错误、诊断）
    pub batch: IngestBatch,
    pub rows: Vec<NormalizedRow>,
    /// 提取阶段失败时的错误种类
    pub error_kind: Option<ImportErrorKind>,
    /// 持久化成功后触发的合并；未触发时为 None
    pub consolidation: Option<ConsolidationResult<ConsolidationRun>>,
}

impl IngestOutcome {
    pub fn is_valid(&self) -> bool {
        self.batch.is_valid
    }

    pub fn error_message(&self) -> Option<&str> {
        self.batch.error.as_deref()
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.batch.diagnostics
    }
}

// ==========================================
// UtilizationPipeline
// ==========================================
pub struct UtilizationPipeline<R>
where
    R: UtilizationRepository,
{
    repo: Arc<R>,
    config: IngestConfig,
    loader: Box<dyn GridLoader>,
    engine: ConsolidationEngine,
    today: Option<NaiveDate>,
}

impl<R> UtilizationPipeline<R>
where
    R: UtilizationRepository,
{
    /// 创建流水线（默认按扩展名选择 Excel / CSV 解析器）
    pub fn new(repo: Arc<R>, config: IngestConfig) -> Self {
        Self {
            repo,
            engine: ConsolidationEngine::new(&config),
            config,
            loader: Box::new(UniversalFileParser),
            today: None,
        }
    }

    /// 替换网格加载器
    pub fn with_loader(mut self, loader: Box<dyn GridLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// 固定参考日期（默认取本地当天）
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// 解析（同步）: 加载网格 → 提取
    pub fn extract(&self, upload: &Upload) -> ExtractionResult {
        let grid = match self.loader.load_grid(&upload.file_name, &upload.bytes) {
            Ok(grid) => grid,
            Err(error) => {
                let diagnostics = vec![format!("读取文件 '{}' 失败: {}", upload.file_name, error)];
                return Err(ExtractionFailure { error, diagnostics });
            }
        };
        extractor_for(upload.source, &self.config).extract(&grid)
    }

    /// 处理单个上传文件
    ///
    /// # 返回
    /// - IngestOutcome: 永不失败；错误写在 batch.error / error_kind 中
    #[instrument(skip(self, ctx, upload), fields(source = %upload.source, file_name = %upload.file_name))]
    pub async fn ingest_file(&self, ctx: &StoreContext, upload: Upload) -> IngestOutcome {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        info!(batch_id = %batch_id, bytes = upload.bytes.len(), "开始处理上传文件");

        // === 步骤 1-2: 解析 ===
        let extraction = self.extract(&upload);
        let is_valid = extraction.is_valid();
        let mut error_message = extraction.error_message();
        let error_kind = extraction.as_ref().err().map(|f| f.kind());
        let (rows, mut diagnostics) = match extraction {
            Ok(sheet) => (sheet.rows, sheet.diagnostics),
            Err(failure) => {
                warn!(error = %failure.error, "文件解析失败");
                (Vec::new(), failure.diagnostics)
            }
        };

        // === 步骤 3: 持久化 ===
        let mut persisted = false;
        if is_valid {
            let records = rows.iter().map(NormalizedRow::to_flat_record).collect();
            match self
                .repo
                .replace_source_rows(ctx, upload.source, &upload.file_name, records)
                .await
            {
                Ok(count) => {
                    persisted = true;
                    diagnostics.push(format!("已持久化 {} 条记录（数据源 {}）", count, upload.source));
                }
                Err(e) => {
                    error!(error = %e, "持久化失败");
                    diagnostics.push(format!("持久化失败: {}", e));
                    error_message = Some(format!("持久化失败: {}", e));
                }
            }
        }

        // === 步骤 4: 记录批次 ===
        let batch = IngestBatch {
            batch_id: batch_id.clone(),
            source: upload.source,
            file_name: upload.file_name.clone(),
            row_count: rows.len(),
            is_valid: persisted,
            error: error_message,
            diagnostics,
            imported_at: Utc::now(),
            imported_by: ctx.actor.clone(),
            elapsed_ms: start_time.elapsed().as_millis() as i64,
        };
        if let Err(e) = self.repo.insert_ingest_batch(ctx, batch.clone()).await {
            error!(batch_id = %batch_id, error = %e, "上传批次记录失败");
        }

        // === 步骤 5: 合并（从存储重新读取两个数据源）===
        let consolidation = if persisted {
            Some(self.consolidate(ctx).await)
        } else {
            None
        };

        info!(
            batch_id = %batch_id,
            valid = batch.is_valid,
            rows = batch.row_count,
            elapsed_ms = batch.elapsed_ms,
            "上传文件处理完成"
        );

        IngestOutcome {
            batch,
            rows,
            error_kind,
            consolidation,
        }
    }

    /// 并发处理两个上传（任一可缺省）
    ///
    /// 一个文件失败不影响另一个文件的流水线及其触发的合并
    pub async fn ingest_both(
        &self,
        ctx: &StoreContext,
        first: Option<Upload>,
        second: Option<Upload>,
    ) -> (Option<IngestOutcome>, Option<IngestOutcome>) {
        let run = |upload: Option<Upload>| async move {
            match upload {
                Some(upload) => Some(self.ingest_file(ctx, upload).await),
                None => None,
            }
        };
        futures::join!(run(first), run(second))
    }

    /// 从存储读取两个数据源，全量重算并替换合并结果
    ///
    /// # 错误
    /// - NoDataAvailable: 两个数据源都没有记录
    /// - Repository: 存储读写失败
    #[instrument(skip(self, ctx))]
    pub async fn consolidate(&self, ctx: &StoreContext) -> ConsolidationResult<ConsolidationRun> {
        let run_id = Uuid::new_v4().to_string();
        let source_a = self
            .repo
            .load_source_rows(ctx, SourceKind::CurrentUtilization)
            .await?;
        let source_b = self.repo.load_source_rows(ctx, SourceKind::DeploymentPlan).await?;

        let outcome = self.engine.consolidate(&source_a, &source_b, self.today())?;
        let written = self
            .repo
            .replace_consolidated(ctx, outcome.entries.clone())
            .await?;

        info!(run_id = %run_id, written, status = %outcome.status.message, "合并结果已写入");
        Ok(ConsolidationRun {
            run_id,
            entries: outcome.entries,
            status: outcome.status,
        })
    }
}
