// ==========================================
// 学校纪律追踪系统 - CSV 解析器
// ==========================================
// 阶段 0: 文件读取与解析
// 格式: 分号分隔，首行为表头（表头去首尾空白: "Fecha " → "Fecha"）
// 行号: 数据行从 1 开始，空行/空白行被跳过但计入后续行号
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::path::Path;

/// 一行原始 CSV（列名 → 值），仅存活到行转换为止
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCsvRow {
    pub row_number: usize,
    pub fields: HashMap<String, String>,
}

/// 解析结果
#[derive(Debug, Clone)]
pub struct ParsedCsv {
    pub headers: Vec<String>,
    pub rows: Vec<RawCsvRow>,
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser {
    delimiter: u8,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self { delimiter: b';' }
    }
}

impl CsvParser {
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// 校验路径并读取文件字节
    ///
    /// # 返回
    /// - Err(FileNotFound): 文件不存在
    /// - Err(UnsupportedFormat): 扩展名不是 .csv
    pub fn read_file(path: &Path) -> ImportResult<Vec<u8>> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        Ok(std::fs::read(path)?)
    }

    /// 解析 CSV 文件
    pub fn parse_file(&self, path: &Path) -> ImportResult<ParsedCsv> {
        let bytes = Self::read_file(path)?;
        self.parse_bytes(&bytes)
    }

    /// 解析 CSV 内容
    ///
    /// # 返回
    /// - Err(FileFormatError): 空文件 / 无表头 / 非 UTF-8 文本
    pub fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<ParsedCsv> {
        // 去除 UTF-8 BOM（Excel 导出常见）
        let content = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        if content.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ImportError::FileFormatError("文件为空".to_string()));
        }
        if std::str::from_utf8(content).is_err() {
            return Err(ImportError::FileFormatError(
                "文件不是 UTF-8 编码的文本".to_string(),
            ));
        }

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(content);

        // 读取表头
        let header_record = reader.headers()?.clone();
        let headers: Vec<String> = header_record
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::FileFormatError("缺少表头行".to_string()));
        }

        // csv 会静默跳过空行，行号按物理行位置推算
        let mut next_line =
            record_start_line(&header_record, 1) + embedded_newlines(&header_record) + 1;
        let mut row_number = 0usize;

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let line = record_start_line(&record, next_line);
            row_number += 1 + line.saturating_sub(next_line) as usize;
            next_line = line + embedded_newlines(&record) + 1;

            let mut fields = HashMap::new();
            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    if header.is_empty() {
                        continue;
                    }
                    fields.insert(header.clone(), value.trim().to_string());
                }
            }

            // 跳过完全空白的行
            if fields.values().all(|v| v.is_empty()) {
                continue;
            }

            rows.push(RawCsvRow { row_number, fields });
        }

        Ok(ParsedCsv { headers, rows })
    }
}

/// 记录起始物理行（1 起）
fn record_start_line(record: &StringRecord, fallback: u64) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(fallback)
}

/// 引号字段内的换行数（一条记录跨越的额外物理行）
fn embedded_newlines(record: &StringRecord) -> u64 {
    record
        .iter()
        .map(|field| field.matches('\n').count() as u64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_trailing_space_header_is_trimmed() {
        let csv = "Código;Fecha ;Descripcion de la falta\n3314;26/08/2025;texto X\n";
        let parsed = CsvParser::default().parse_bytes(csv.as_bytes()).unwrap();

        assert_eq!(parsed.headers, vec!["Código", "Fecha", "Descripcion de la falta"]);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].row_number, 1);
        assert_eq!(parsed.rows[0].fields.get("Fecha").unwrap(), "26/08/2025");
    }

    #[test]
    fn test_blank_rows_skipped_but_numbering_kept() {
        let csv = "Código;Fecha\n1;01/02/2025\n;\n3;03/02/2025\n";
        let parsed = CsvParser::default().parse_bytes(csv.as_bytes()).unwrap();

        let numbers: Vec<usize> = parsed.rows.iter().map(|r| r.row_number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }

    #[test]
    fn test_empty_lines_count_towards_row_numbers() {
        let csv = "Código;Fecha\n1;01/02/2025\n\n3;03/02/2025\n\n\n6;06/02/2025\n";
        let parsed = CsvParser::default().parse_bytes(csv.as_bytes()).unwrap();

        let numbers: Vec<usize> = parsed.rows.iter().map(|r| r.row_number).collect();
        assert_eq!(numbers, vec![1, 3, 6]);
    }

    #[test]
    fn test_multiline_quoted_field_keeps_row_numbers() {
        let csv = "Código;Descripcion de la falta\r\n1;\"linea uno\r\nlinea dos\"\r\n2;otra\r\n";
        let parsed = CsvParser::default().parse_bytes(csv.as_bytes()).unwrap();

        let numbers: Vec<usize> = parsed.rows.iter().map(|r| r.row_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(
            parsed.rows[0].fields.get("Descripcion de la falta").unwrap(),
            "linea uno\r\nlinea dos"
        );
    }

    #[test]
    fn test_quoted_semicolon_and_bom() {
        let csv = "\u{FEFF}Código;Descripcion de la falta\n42;\"uno; dos\"\n";
        let parsed = CsvParser::default().parse_bytes(csv.as_bytes()).unwrap();

        assert_eq!(parsed.headers[0], "Código");
        assert_eq!(
            parsed.rows[0].fields.get("Descripcion de la falta").unwrap(),
            "uno; dos"
        );
    }

    #[test]
    fn test_custom_delimiter() {
        let csv = "Código,Fecha\n7,01/02/2025\n";
        let parsed = CsvParser::with_delimiter(b',').parse_bytes(csv.as_bytes()).unwrap();
        assert_eq!(parsed.rows[0].fields.get("Código").unwrap(), "7");
    }

    #[test]
    fn test_empty_or_binary_content_is_fatal() {
        assert!(matches!(
            CsvParser::default().parse_bytes(b"  \n"),
            Err(ImportError::FileFormatError(_))
        ));
        assert!(matches!(
            CsvParser::default().parse_bytes(&[0xFF, 0xFE, 0x00, 0x41]),
            Err(ImportError::FileFormatError(_))
        ));
    }

    #[test]
    fn test_read_file_checks_existence_and_extension() {
        assert!(matches!(
            CsvParser::read_file(Path::new("/nonexistent/file.csv")),
            Err(ImportError::FileNotFound(_))
        ));

        let mut xlsx = Builder::new().suffix(".xlsx").tempfile().unwrap();
        writeln!(xlsx, "not a csv").unwrap();
        assert!(matches!(
            CsvParser::read_file(xlsx.path()),
            Err(ImportError::UnsupportedFormat(_))
        ));

        let mut csv = Builder::new().suffix(".CSV").tempfile().unwrap();
        writeln!(csv, "Código;Fecha").unwrap();
        writeln!(csv, "1;01/02/2025").unwrap();
        let parsed = CsvParser::default().parse_file(csv.path()).unwrap();
        assert_eq!(parsed.rows.len(), 1);
    }
}
