// ==========================================
// 班组管理系统 - 导入器接口定义
// ==========================================
// 流程: 校验表头 → 逐行映射 → 权限过滤 → 落库
// 行级错误只计数不中断，文件级错误直接返回
// ==========================================

use crate::domain::types::ImportModule;
use crate::engine::access::AccessScope;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::require_headers;
use crate::importer::file_parser::SheetData;
use serde::Serialize;
use serde_json::{json, Value};

/// 保存的行级错误上限
pub const MAX_ROW_ERRORS: usize = 50;

/// 单行错误
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

/// 导入上下文
#[derive(Debug, Clone)]
pub struct ImportContext<'a> {
    pub scope: &'a AccessScope,
    pub created_by: Option<i64>,
    pub source_file: Option<String>,
}

/// 导入结果统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub total: usize,
    pub imported: usize,
    pub skipped_no_dept: usize,
    pub skipped_no_permission: usize,
    pub failed: usize,
    pub errors: Vec<RowError>,
}

impl ImportOutcome {
    pub fn skipped(&self) -> usize {
        self.skipped_no_dept + self.skipped_no_permission
    }

    /// 记一行失败，明细只保留前 MAX_ROW_ERRORS 条
    pub fn record_failure(&mut self, row: usize, message: impl Into<String>) {
        self.failed += 1;
        if self.errors.len() < MAX_ROW_ERRORS {
            self.errors.push(RowError {
                row,
                message: message.into(),
            });
        }
    }

    /// 面向用户的汇总文案
    pub fn summary_message(&self) -> String {
        let mut parts = vec![format!("已导入 {} 条记录", self.imported)];
        if self.skipped_no_dept > 0 {
            parts.push(format!("{} 条因未填写部门或部门无效被跳过", self.skipped_no_dept));
        }
        if self.skipped_no_permission > 0 {
            parts.push(format!("{} 条因无权限被跳过", self.skipped_no_permission));
        }
        if self.failed > 0 {
            parts.push(format!("{} 条导入失败", self.failed));
        }
        parts.join("，")
    }

    /// 写入导入日志的明细
    pub fn to_details(&self) -> Value {
        json!({
            "imported": self.imported,
            "skipped_no_dept": self.skipped_no_dept,
            "skipped_no_permission": self.skipped_no_permission,
            "failed": self.failed,
            "errors": self.errors,
        })
    }

    /// 首条错误（写入日志 error_message）
    pub fn first_error(&self) -> Option<String> {
        self.errors
            .first()
            .map(|e| format!("第 {} 行: {}", e.row, e.message))
    }
}

// ==========================================
// SheetImporter - 按模块导入工作表
// ==========================================
pub trait SheetImporter: Send + Sync {
    /// 所属模块（决定导入日志的 module 字段）
    fn module(&self) -> ImportModule;

    /// 必需表头
    fn required_headers(&self) -> &'static [&'static str];

    /// 逐行导入（表头已校验）
    fn import_rows(&self, sheet: &SheetData, ctx: &ImportContext<'_>) -> ImportResult<ImportOutcome>;

    /// 校验表头后导入
    fn import(&self, sheet: &SheetData, ctx: &ImportContext<'_>) -> ImportResult<ImportOutcome> {
        require_headers(&sheet.headers, self.required_headers())?;
        let mut outcome = self.import_rows(sheet, ctx)?;
        outcome.total = sheet.rows.len();
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_failure_caps_details() {
        let mut outcome = ImportOutcome::default();
        for row in 0..(MAX_ROW_ERRORS + 10) {
            outcome.record_failure(row + 2, "bad");
        }
        assert_eq!(outcome.failed, MAX_ROW_ERRORS + 10);
        assert_eq!(outcome.errors.len(), MAX_ROW_ERRORS);
        assert_eq!(outcome.first_error().as_deref(), Some("第 2 行: bad"));
    }

    #[test]
    fn test_summary_message() {
        let outcome = ImportOutcome {
            total: 5,
            imported: 3,
            skipped_no_dept: 1,
            skipped_no_permission: 1,
            ..Default::default()
        };
        assert_eq!(outcome.skipped(), 2);
        assert_eq!(
            outcome.summary_message(),
            "已导入 3 条记录，1 条因未填写部门或部门无效被跳过，1 条因无权限被跳过"
        );
        assert_eq!(outcome.to_details()["imported"], 3);
    }
}
