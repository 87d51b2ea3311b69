//! Tabular file parsing for CSV and Excel (.xlsx/.xlsm/.xls) uploads.

use anyhow::{Context, Result};
use calamine::{open_workbook_from_rs, Data, Reader, Xls, Xlsx};
use std::io::Cursor;

/// Raw parsed table before column detection. All cells are read as text.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Values of one column across all rows, positionally indexed.
    /// Short rows yield empty strings.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |r| r.get(idx).map(|v| v.as_str()).unwrap_or(""))
    }
}

/// Dispatch file parsing by extension.
pub fn parse_file(filename: &str, data: &[u8]) -> Result<Vec<RawTable>> {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();

    match ext.as_str() {
        "csv" => parse_csv(filename, data),
        "xlsx" | "xlsm" => parse_xlsx(data),
        "xls" => parse_xls(data),
        _ => anyhow::bail!(
            "Unsupported file type: .{}. Supported: .csv, .xlsx, .xlsm, .xls",
            ext
        ),
    }
}

/// Decode raw bytes into text, trying encodings in order:
/// UTF-8, UTF-8 with BOM, Latin-1.
fn decode_text(data: &[u8]) -> (String, &'static str) {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Some(stripped) = s.strip_prefix('\u{feff}') {
            return (stripped.to_string(), "utf-8-sig");
        }
        return (s.to_string(), "utf-8");
    }
    // Latin-1 decodes any byte sequence
    (data.iter().map(|&b| b as char).collect(), "latin-1")
}

/// Parse a CSV file into a single RawTable.
fn parse_csv(filename: &str, data: &[u8]) -> Result<Vec<RawTable>> {
    let (text, encoding) = decode_text(data);
    tracing::debug!("Decoded '{}' as {}", filename, encoding);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        anyhow::bail!("CSV file has no headers");
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read CSV record")?;
        let row: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        if row.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        rows.push(row);
    }

    if rows.is_empty() {
        anyhow::bail!("CSV file has no data rows");
    }

    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim_end_matches(".csv")
        .to_string();

    Ok(vec![RawTable { name, headers, rows }])
}

/// Parse an xlsx/xlsm file. All worksheets become separate RawTable entries.
fn parse_xlsx(data: &[u8]) -> Result<Vec<RawTable>> {
    let cursor = Cursor::new(data);
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(cursor).context("Failed to open Excel workbook")?;
    collect_sheets(&mut workbook)
}

/// Parse a legacy xls file.
fn parse_xls(data: &[u8]) -> Result<Vec<RawTable>> {
    let cursor = Cursor::new(data);
    let mut workbook: Xls<_> =
        open_workbook_from_rs(cursor).context("Failed to open Excel workbook")?;
    collect_sheets(&mut workbook)
}

fn collect_sheets<RS, R>(workbook: &mut R) -> Result<Vec<RawTable>>
where
    RS: std::io::Read + std::io::Seek,
    R: Reader<RS>,
    R::Error: std::error::Error,
{
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut tables = Vec::new();

    for name in &sheet_names {
        let range = match workbook.worksheet_range(name) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping sheet '{}': {}", name, e);
                continue;
            }
        };

        if let Some(table) = range_to_table(name, &range) {
            tables.push(table);
        }
    }

    if tables.is_empty() {
        anyhow::bail!("No sheets with data found in workbook");
    }

    Ok(tables)
}

/// Convert a calamine Range into a RawTable. First row = headers.
/// Skips sheets that are empty or have only a header row.
fn range_to_table(name: &str, range: &calamine::Range<Data>) -> Option<RawTable> {
    let mut row_iter = range.rows();

    let header_row = row_iter.next()?;
    let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return None;
    }

    let mut rows = Vec::new();
    for row in row_iter {
        let values: Vec<String> = row.iter().map(cell_to_string).collect();
        if values.iter().all(|v| v.is_empty()) {
            continue;
        }
        rows.push(values);
    }

    if rows.is_empty() {
        return None;
    }

    Some(RawTable {
        name: name.to_string(),
        headers,
        rows,
    })
}

/// Convert a calamine cell to its string representation.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Avoid trailing ".0" for whole numbers
            if *f == (*f as i64) as f64 && f.abs() < i64::MAX as f64 {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{:?}", e),
    }
}

/// Convert an Excel serial date number to a YYYY-MM-DD string.
/// Epoch 1899-12-30, adjusted for the fake Feb 29, 1900 (serial 60).
fn excel_serial_to_date(serial: f64) -> String {
    let days = serial as i64;
    // Serial <= 59 predates the phantom leap day, shifting the epoch by one
    let adjusted = if days > 59 { days } else { days + 1 };
    let mut remaining = (adjusted - 25569) as i32; // days since 1970-01-01

    let mut year = 1970i32;
    loop {
        let diy = if is_leap(year) { 366 } else { 365 };
        if (0..diy).contains(&remaining) {
            break;
        }
        if remaining >= diy {
            remaining -= diy;
            year += 1;
        } else {
            year -= 1;
            remaining += if is_leap(year) { 366 } else { 365 };
        }
    }

    let dim: [i32; 12] = if is_leap(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };
    let mut month = 1;
    for d in dim {
        if remaining < d {
            break;
        }
        remaining -= d;
        month += 1;
    }

    format!("{:04}-{:02}-{:02}", year, month, remaining + 1)
}

fn is_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_basic() {
        let data = b"review,source\nGood coffee,MY_SHOP\nSlow service,MY_SHOP\n";
        let tables = parse_file("reviews.csv", data).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].headers, vec!["review", "source"]);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].name, "reviews");
    }

    #[test]
    fn test_parse_csv_utf8_bom() {
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice(b"review\nngon\n");
        let tables = parse_file("bom.csv", &data).unwrap();
        assert_eq!(tables[0].headers, vec!["review"]);
    }

    #[test]
    fn test_parse_csv_latin1_fallback() {
        // 0xE9 is 'é' in Latin-1 and invalid as a standalone UTF-8 byte
        let data = b"review\ncaf\xe9 excellent\n";
        let tables = parse_file("latin.csv", data).unwrap();
        assert_eq!(tables[0].rows[0][0], "café excellent");
    }

    #[test]
    fn test_parse_csv_skips_blank_rows() {
        let data = b"review,source\nok,MY_SHOP\n,\nfine,COMPETITOR\n";
        let tables = parse_file("r.csv", data).unwrap();
        assert_eq!(tables[0].rows.len(), 2);
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(parse_file("notes.txt", b"data").is_err());
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(excel_serial_to_date(45292.0), "2024-01-01");
        assert_eq!(excel_serial_to_date(25569.0), "1970-01-01");
    }

    #[test]
    fn test_column_values_pads_short_rows() {
        let table = RawTable {
            name: "t".into(),
            headers: vec!["a".into(), "b".into()],
            rows: vec![vec!["1".into(), "2".into()], vec!["3".into()]],
        };
        let col: Vec<&str> = table.column_values(1).collect();
        assert_eq!(col, vec!["2", ""]);
    }
}
