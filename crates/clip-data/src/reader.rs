//! Record parsing for clip progress exports.
//!
//! Turns either delimited text (the progress CSV export) or the JSON rows
//! returned by the progress API into [`InputRecord`]s, in original row order.

use std::path::Path;

use clip_core::conversions::{to_int, value_to_int, value_to_string};
use clip_core::error::{ReportError, Result};
use clip_core::models::InputRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

// ── Columns ───────────────────────────────────────────────────────────────────

/// Record field a delimited column feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Member,
    Product,
    Course,
    Content,
    Day,
    CumulativePlayTime,
    TotalPlayTime,
    TotalContentPlayTime,
}

impl Column {
    /// Map a header name to its field. Report-shaped names (`memberId`,
    /// `contentId`, `day`) are accepted next to the export names.
    fn from_header(name: &str) -> Option<Self> {
        match name {
            "targetId" | "memberId" => Some(Column::Member),
            "productId" => Some(Column::Product),
            "courseId" => Some(Column::Course),
            "courseContentId" | "contentId" => Some(Column::Content),
            "dailyDate" | "day" => Some(Column::Day),
            "cumulativePlayTime" => Some(Column::CumulativePlayTime),
            "totalPlayTime" => Some(Column::TotalPlayTime),
            "totalContentPlayTime" => Some(Column::TotalContentPlayTime),
            _ => None,
        }
    }

    fn apply(self, record: &mut InputRecord, raw: &str) {
        match self {
            Column::Member => record.member_id = to_int(raw),
            Column::Product => record.product_id = to_int(raw),
            Column::Course => record.course_id = to_int(raw),
            Column::Content => record.content_id = to_int(raw),
            Column::Day => record.day = raw.to_string(),
            Column::CumulativePlayTime => record.cumulative_play_time_sec = to_int(raw).max(0),
            Column::TotalPlayTime => record.total_play_time_sec = to_int(raw).max(0),
            Column::TotalContentPlayTime => {
                record.total_content_play_time_sec = to_int(raw).max(0)
            }
        }
    }
}

// ── Delimited text ────────────────────────────────────────────────────────────

/// Parse comma-separated text whose first non-blank line is the header row.
///
/// Each line is one row: blank and whitespace-only lines are skipped, short
/// rows read missing trailing cells as empty, and unknown columns are
/// ignored. When a field name appears under two aliases the first column
/// wins. Double-quoted cells may contain commas but never span lines, so an
/// unbalanced quote only affects its own row.
pub fn parse_delimited(text: &str) -> Result<Vec<InputRecord>> {
    let text = text.trim_start_matches('\u{feff}');
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(true).trim(csv::Trim::All);

    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let Some(header_line) = lines.next() else {
        return Ok(Vec::new());
    };
    let headers = split_line(&builder, header_line)?;

    let mut columns: Vec<(usize, Column)> = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        if let Some(column) = Column::from_header(name) {
            if columns.iter().all(|(_, c)| *c != column) {
                columns.push((idx, column));
            }
        }
    }
    debug!(
        headers = headers.len(),
        mapped = columns.len(),
        "parsed delimited header row"
    );

    let mut records = Vec::new();
    for line in lines {
        let row = split_line(&builder, line)?;
        let mut record = InputRecord::default();
        for (idx, column) in &columns {
            column.apply(&mut record, row.get(*idx).unwrap_or(""));
        }
        records.push(record);
    }

    debug!("Parsed {} records from delimited text", records.len());
    Ok(records)
}

/// Cells of a single line.
fn split_line(builder: &csv::ReaderBuilder, line: &str) -> Result<csv::StringRecord> {
    let mut reader = builder.from_reader(line.as_bytes());
    let mut row = csv::StringRecord::new();
    reader.read_record(&mut row)?;
    Ok(row)
}

/// Read a CSV export from disk and parse it with [`parse_delimited`].
pub fn load_csv_file(path: &Path) -> Result<Vec<InputRecord>> {
    let text = std::fs::read_to_string(path).map_err(|source| ReportError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    parse_delimited(&text)
}

// ── Structured rows ───────────────────────────────────────────────────────────

/// One row as returned by the course-content progress API.
///
/// Cells are kept as raw JSON so numbers delivered as strings (or missing
/// entirely) still convert leniently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceRow {
    pub target_id: Value,
    pub product_id: Value,
    pub course_id: Value,
    pub course_content_id: Value,
    pub daily_date: Value,
    pub cumulative_play_time: Value,
    pub total_play_time: Value,
    pub total_content_play_time: Value,
}

impl From<&SourceRow> for InputRecord {
    fn from(row: &SourceRow) -> Self {
        InputRecord {
            member_id: value_to_int(&row.target_id),
            product_id: value_to_int(&row.product_id),
            course_id: value_to_int(&row.course_id),
            content_id: value_to_int(&row.course_content_id),
            day: value_to_string(&row.daily_date),
            cumulative_play_time_sec: value_to_int(&row.cumulative_play_time).max(0),
            total_play_time_sec: value_to_int(&row.total_play_time).max(0),
            total_content_play_time_sec: value_to_int(&row.total_content_play_time).max(0),
        }
    }
}

/// Convert API rows into records. Extra fields are ignored; a row that is not
/// a JSON object becomes an all-default record.
pub fn parse_source_rows(rows: &[Value]) -> Vec<InputRecord> {
    let records: Vec<InputRecord> = rows
        .iter()
        .map(|value| {
            let row: SourceRow = serde_json::from_value(value.clone()).unwrap_or_default();
            InputRecord::from(&row)
        })
        .collect();

    debug!("Converted {} source rows into records", records.len());
    records
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HEADER: &str = "targetId,productId,courseId,courseContentId,dailyDate,cumulativePlayTime,totalPlayTime,totalContentPlayTime";

    // ── parse_delimited ───────────────────────────────────────────────────────

    #[test]
    fn test_parse_basic_row() {
        let text = format!("{HEADER}\n7,2,3,4,2024-03-05,120,90,600\n");
        let records = parse_delimited(&text).unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.member_id, 7);
        assert_eq!(r.product_id, 2);
        assert_eq!(r.course_id, 3);
        assert_eq!(r.content_id, 4);
        assert_eq!(r.day, "2024-03-05");
        assert_eq!(r.cumulative_play_time_sec, 120);
        assert_eq!(r.total_play_time_sec, 90);
        assert_eq!(r.total_content_play_time_sec, 600);
    }

    #[test]
    fn test_parse_empty_text() {
        assert!(parse_delimited("").unwrap().is_empty());
        assert!(parse_delimited(HEADER).unwrap().is_empty());
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let text = format!("{HEADER}\n\n1,1,1,1,2024-01-01,1,1,1\n   \n\n2,2,2,2,2024-01-02,2,2,2\n");
        let records = parse_delimited(&text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].member_id, 1);
        assert_eq!(records[1].member_id, 2);
    }

    #[test]
    fn test_parse_skips_whitespace_before_header() {
        let text = format!("   \n\t\n{HEADER}\n7,2,3,4,2024-03-05,120,90,600\n");
        let records = parse_delimited(&text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].member_id, 7);
        assert_eq!(records[0].day, "2024-03-05");
    }

    #[test]
    fn test_parse_only_blank_lines() {
        assert!(parse_delimited("  \n\n \t \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_unbalanced_quote_stays_in_its_row() {
        let text = "targetId,dailyDate,totalPlayTime\n1,\"2024-03-05,10\n2,2024-03-06,20\n3,2024-03-07,30\n";
        let records = parse_delimited(text).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].member_id, 1);
        assert_eq!(records[1].member_id, 2);
        assert_eq!(records[1].day, "2024-03-06");
        assert_eq!(records[1].total_play_time_sec, 20);
        assert_eq!(records[2].member_id, 3);
        assert_eq!(records[2].total_play_time_sec, 30);
    }

    #[test]
    fn test_parse_short_row_fills_empty() {
        let text = format!("{HEADER}\n5,6,7\n");
        let records = parse_delimited(&text).unwrap();
        let r = &records[0];
        assert_eq!(r.course_id, 7);
        assert_eq!(r.content_id, 0);
        assert_eq!(r.day, "");
        assert_eq!(r.total_content_play_time_sec, 0);
    }

    #[test]
    fn test_parse_row_of_empty_cells_is_kept() {
        let text = format!("{HEADER}\n,,,,,,,\n");
        let records = parse_delimited(&text).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0], InputRecord::default());
    }

    #[test]
    fn test_parse_non_numeric_defaults_to_zero() {
        let text = format!("{HEADER}\nabc,,x,4,2024-03-05,n/a,-30,ten\n");
        let r = &parse_delimited(&text).unwrap()[0];
        assert_eq!(r.member_id, 0);
        assert_eq!(r.product_id, 0);
        assert_eq!(r.course_id, 0);
        assert_eq!(r.cumulative_play_time_sec, 0);
        assert_eq!(r.total_play_time_sec, 0);
        assert_eq!(r.total_content_play_time_sec, 0);
    }

    #[test]
    fn test_parse_trims_headers_and_cells() {
        let text = " targetId , dailyDate \r\n 9 , 2024-02-29 \r\n";
        let r = &parse_delimited(text).unwrap()[0];
        assert_eq!(r.member_id, 9);
        assert_eq!(r.day, "2024-02-29");
    }

    #[test]
    fn test_parse_column_order_independent() {
        let text = "dailyDate,courseContentId,targetId\n2024-05-01,11,22\n";
        let r = &parse_delimited(text).unwrap()[0];
        assert_eq!(r.content_id, 11);
        assert_eq!(r.member_id, 22);
    }

    #[test]
    fn test_parse_report_aliases() {
        let text = "month,memberId,courseContentId,contentId\n2024-03,3,8,9\n";
        let r = &parse_delimited(text).unwrap()[0];
        assert_eq!(r.member_id, 3);
        // First alias column wins.
        assert_eq!(r.content_id, 8);
        assert_eq!(r.day, "");
    }

    #[test]
    fn test_parse_quoted_cell_with_comma() {
        let text = "targetId,note,courseId\n1,\"hello, world\",5\n";
        let r = &parse_delimited(text).unwrap()[0];
        assert_eq!(r.member_id, 1);
        assert_eq!(r.course_id, 5);
    }

    #[test]
    fn test_parse_preserves_row_order() {
        let text = format!("{HEADER}\n3,0,0,0,,0,0,0\n1,0,0,0,,0,0,0\n2,0,0,0,,0,0,0\n");
        let ids: Vec<i64> = parse_delimited(&text)
            .unwrap()
            .iter()
            .map(|r| r.member_id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    // ── load_csv_file ─────────────────────────────────────────────────────────

    #[test]
    fn test_load_csv_file_missing() {
        let err = load_csv_file(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, ReportError::FileRead { .. }));
    }

    #[test]
    fn test_load_csv_file_with_bom() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let path = tmp.path().join("export.csv");
        let text = format!("\u{feff}{}\n7,8,9,10,2024-06-01,1,2,3\n", HEADER);
        std::fs::write(&path, text).expect("write export");

        let records = load_csv_file(&path).expect("load");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].member_id, 7);
        assert_eq!(records[0].total_content_play_time_sec, 3);
    }

    // ── parse_source_rows ─────────────────────────────────────────────────────

    #[test]
    fn test_source_rows_mixed_types() {
        let rows = vec![json!({
            "targetId": 101,
            "productId": "202",
            "courseId": 303,
            "courseContentId": 404,
            "dailyDate": "2024-03-05T00:00:00.000Z",
            "cumulativePlayTime": 60,
            "totalPlayTime": "45",
            "totalContentPlayTime": 300.0,
            "_id": "65f0c0ffee",
        })];
        let records = parse_source_rows(&rows);
        let r = &records[0];
        assert_eq!(r.member_id, 101);
        assert_eq!(r.product_id, 202);
        assert_eq!(r.content_id, 404);
        assert_eq!(r.day, "2024-03-05T00:00:00.000Z");
        assert_eq!(r.total_play_time_sec, 45);
        assert_eq!(r.total_content_play_time_sec, 300);
    }

    #[test]
    fn test_source_rows_missing_fields_default() {
        let records = parse_source_rows(&[json!({ "targetId": 5 })]);
        assert_eq!(records[0].member_id, 5);
        assert_eq!(records[0].course_id, 0);
        assert_eq!(records[0].day, "");
    }

    #[test]
    fn test_source_rows_non_object() {
        let records = parse_source_rows(&[json!(42), json!(null)]);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], InputRecord::default());
    }
}
