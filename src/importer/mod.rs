// ==========================================
// 班组管理系统 - 导入导出层
// ==========================================
// 职责: 上传文件解析、按模块导入、Excel 导出
// 支持: Excel (.xlsx/.xls), CSV
// ==========================================

// 模块声明
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod performance_importer;
pub mod personnel_importer;
pub mod safety_importer;
pub mod training_importer;
pub mod xlsx_export;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use field_mapper::{require_headers, FieldMapper};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRow, SheetData, UniversalFileParser};
pub use importer_trait::{ImportContext, ImportOutcome, RowError, SheetImporter};
pub use performance_importer::PerformanceImporter;
pub use personnel_importer::{PersonnelImporter, PERSONNEL_EXAMPLE, PERSONNEL_HEADERS};
pub use safety_importer::{person_in_scope, SafetyImporter};
pub use training_importer::TrainingImporter;
pub use xlsx_export::{write_sheet, XlsxCell};
