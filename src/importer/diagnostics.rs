// ==========================================
// 利用率合并引擎 - 解析诊断
// ==========================================
// 一次引擎运行 → 一份有序诊断文本（排查上传问题用，非稳定契约）
// 每行同时写入 tracing
// ==========================================

use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    lines: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一条诊断
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!(diagnostic = %line);
        self.lines.push(line);
    }

    /// 记录一条警告级诊断（非致命）
    pub fn warn(&mut self, line: impl Into<String>) {
        let line = format!("警告: {}", line.into());
        warn!(diagnostic = %line);
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}
