// ==========================================
// 班组管理系统 - 导入错误
// ==========================================
// 整表级错误（格式、表头、存储）中断导入；
// 单行错误（InvalidCell）由导入器计入 failed 并继续
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("不支持的文件类型: {0}（可上传 xlsx / xls / csv）")]
    UnsupportedExtension(String),

    #[error("文件为空或没有数据行")]
    EmptyFile,

    #[error("无法读取上传文件: {0}")]
    Io(String),

    #[error("表格无法解析: {0}")]
    Workbook(String),

    #[error("CSV 内容有误: {0}")]
    Csv(String),

    #[error("缺少必需列: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),

    /// 第 row 行（含表头计数）某列取值不合法
    #[error("第 {row} 行「{column}」{message}")]
    InvalidCell {
        row: usize,
        column: String,
        message: String,
    },

    #[error("生成 Excel 失败: {0}")]
    Export(String),

    #[error("写入数据库失败: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::Io(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::Csv(err.to_string())
    }
}

impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::Workbook(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for ImportError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        ImportError::Export(err.to_string())
    }
}

impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Storage(err.to_string())
    }
}

impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        ImportError::Storage(err.to_string())
    }
}

pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ImportError::MissingHeaders(vec!["工号".to_string(), "姓名".to_string()]);
        assert_eq!(err.to_string(), "缺少必需列: 工号, 姓名");

        let err = ImportError::InvalidCell {
            row: 3,
            column: "月份".to_string(),
            message: "不能为空".to_string(),
        };
        assert_eq!(err.to_string(), "第 3 行「月份」不能为空");
    }

    #[test]
    fn test_storage_errors_wrap_repository() {
        let err: ImportError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(err, ImportError::Storage(ref m) if m.contains("poisoned")));
    }
}
