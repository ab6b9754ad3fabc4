// ==========================================
// 班组管理系统 - 上传文件解析器
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输入为上传的字节流，输出为按表头取值的行
// ==========================================

use crate::engine::text::excel_serial_to_date;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::Cursor;

/// 单行原始数据
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    /// 表格中的行号（表头为第 1 行）
    pub row_number: usize,
    pub cells: HashMap<String, String>,
}

/// 解析后的工作表
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl SheetData {
    fn from_grid(header_row: Vec<String>, body: impl Iterator<Item = Vec<String>>) -> Self {
        let headers: Vec<String> = header_row.into_iter().map(clean_header).collect();
        let mut rows = Vec::new();
        for (idx, values) in body.enumerate() {
            let mut cells = HashMap::new();
            for (col, value) in values.into_iter().enumerate() {
                if let Some(header) = headers.get(col).filter(|h| !h.is_empty()) {
                    cells.insert(header.clone(), value.trim().to_string());
                }
            }
            // 跳过完全空白的行
            if cells.values().all(|v| v.is_empty()) {
                continue;
            }
            rows.push(RawRow {
                row_number: idx + 2,
                cells,
            });
        }
        Self { headers, rows }
    }
}

fn clean_header(raw: String) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_string()
}

/// 文件解析接口
pub trait FileParser: Send + Sync {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<SheetData>;
}

// ==========================================
// CSV Parser
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<SheetData> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut body = Vec::new();
        for record in reader.records() {
            let record = record?;
            body.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }
        Ok(SheetData::from_grid(headers, body.into_iter()))
    }
}

// ==========================================
// Excel Parser（读取第一个工作表）
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<SheetData> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ImportError::Workbook("Excel 文件无工作表".to_string()))??;

        let mut rows = range.rows();
        let header_row = match rows.next() {
            Some(row) => row.iter().map(cell_to_string).collect::<Vec<_>>(),
            None => return Err(ImportError::EmptyFile),
        };
        let body = rows.map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>());
        Ok(SheetData::from_grid(header_row, body))
    }
}

/// 单元格转文本: 整数值浮点去掉小数，日期单元格转 YYYY-MM-DD
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            excel_serial_to_date(serial)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| serial.to_string())
        }
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse(&self, file_name: &str, bytes: &[u8]) -> ImportResult<SheetData> {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        let sheet = match ext.as_str() {
            "csv" => CsvParser.parse_bytes(bytes)?,
            "xlsx" | "xls" => ExcelParser.parse_bytes(bytes)?,
            _ => return Err(ImportError::UnsupportedExtension(ext)),
        };
        if sheet.rows.is_empty() {
            return Err(ImportError::EmptyFile);
        }
        Ok(sheet)
    }
}
