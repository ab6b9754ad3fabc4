// ==========================================
// 班组管理系统 - Excel 导出
// ==========================================
// 单工作表输出: 加粗表头 + 数据行，返回 xlsx 字节
// ==========================================

use crate::importer::error::ImportResult;
use rust_xlsxwriter::{Format, Workbook};

/// 导出单元格
#[derive(Debug, Clone, PartialEq)]
pub enum XlsxCell {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&str> for XlsxCell {
    fn from(value: &str) -> Self {
        XlsxCell::Text(value.to_string())
    }
}

impl From<String> for XlsxCell {
    fn from(value: String) -> Self {
        XlsxCell::Text(value)
    }
}

impl From<f64> for XlsxCell {
    fn from(value: f64) -> Self {
        XlsxCell::Number(value)
    }
}

impl From<Option<String>> for XlsxCell {
    fn from(value: Option<String>) -> Self {
        value.map(XlsxCell::Text).unwrap_or(XlsxCell::Empty)
    }
}

/// 生成单工作表 xlsx
pub fn write_sheet(sheet_name: &str, headers: &[&str], rows: &[Vec<XlsxCell>]) -> ImportResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;

    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }
    for (r, row) in rows.iter().enumerate() {
        let row_idx = (r + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                XlsxCell::Text(s) => {
                    sheet.write_string(row_idx, col as u16, s)?;
                }
                XlsxCell::Number(n) => {
                    sheet.write_number(row_idx, col as u16, *n)?;
                }
                XlsxCell::Empty => {}
            }
        }
    }
    sheet.set_freeze_panes(1, 0)?;

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::file_parser::{ExcelParser, FileParser};

    #[test]
    fn test_write_sheet_readable_by_parser() {
        let rows = vec![
            vec![XlsxCell::from("E001"), XlsxCell::from(92.5), XlsxCell::Empty],
            vec![XlsxCell::from("E002".to_string()), XlsxCell::from(80.0), XlsxCell::from(Some("备注".to_string()))],
        ];
        let bytes = write_sheet("九宫格", &["工号", "综合分", "备注"], &rows).unwrap();
        let parsed = ExcelParser.parse_bytes(&bytes).unwrap();
        assert_eq!(parsed.headers, vec!["工号", "综合分", "备注"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].cells["综合分"], "92.5");
        assert_eq!(parsed.rows[1].cells["综合分"], "80");
        assert_eq!(parsed.rows[1].cells["备注"], "备注");
    }
}
