use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::entry::{ScheduleEntry, SubjectType};
use crate::error::{Result, TimetableError};

/// Columns of a flat timetable table, as found in the header row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Column {
    Group,
    Day,
    Time,
    Course,
    Teacher,
    Room,
    SubjectType,
    Duration,
}

const REQUIRED: [Column; 4] = [Column::Group, Column::Day, Column::Time, Column::Course];

impl Column {
    fn from_header(name: &str) -> Option<Self> {
        let name: String = name
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match name.as_str() {
            "group" | "class" => Some(Column::Group),
            "day" => Some(Column::Day),
            "time" | "timeslot" | "slot" => Some(Column::Time),
            "course" | "subject" => Some(Column::Course),
            "teacher" | "instructor" | "lecturer" => Some(Column::Teacher),
            "room" | "location" => Some(Column::Room),
            "type" | "subjecttype" => Some(Column::SubjectType),
            "duration" => Some(Column::Duration),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Column::Group => "group",
            Column::Day => "day",
            Column::Time => "time",
            Column::Course => "course",
            Column::Teacher => "teacher",
            Column::Room => "room",
            Column::SubjectType => "type",
            Column::Duration => "duration",
        }
    }
}

/// Turns a header row plus data rows into raw entry records.
///
/// Header names are matched case-insensitively in any order. Rows that are
/// entirely blank are dropped; every other row yields a record, even an
/// invalid one, so that the importer can report it by row number.
pub fn records_from_rows(rows: Vec<Vec<String>>) -> Result<Vec<ScheduleEntry>> {
    let mut rows = rows.into_iter();
    let header = rows
        .next()
        .ok_or_else(|| TimetableError::Import("table is empty".to_string()))?;

    let mut columns: HashMap<Column, usize> = HashMap::new();
    for (index, name) in header.iter().enumerate() {
        if let Some(column) = Column::from_header(name) {
            columns.entry(column).or_insert(index);
        }
    }
    for column in REQUIRED {
        if !columns.contains_key(&column) {
            return Err(TimetableError::Import(format!(
                "missing `{}` column",
                column.name()
            )));
        }
    }

    let records: Vec<ScheduleEntry> = rows
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| {
            let cell = |column: Column| -> String {
                columns
                    .get(&column)
                    .and_then(|&i| row.get(i))
                    .map(|v| v.trim().to_string())
                    .unwrap_or_default()
            };
            ScheduleEntry::new(
                cell(Column::Group),
                cell(Column::Day),
                cell(Column::Time),
                cell(Column::Course),
            )
            .with_teacher(cell(Column::Teacher))
            .with_room(cell(Column::Room))
            .with_subject_type(SubjectType::from_label(&cell(Column::SubjectType)))
            .with_duration(parse_duration(&cell(Column::Duration)))
        })
        .collect();

    debug!("parsed {} records", records.len());
    Ok(records)
}

/// Unparsable or missing durations count as one slot.
fn parse_duration(value: &str) -> u32 {
    let value = value.trim();
    if let Ok(n) = value.parse::<u32>() {
        return n;
    }
    match value.parse::<f64>() {
        Ok(f) if f >= 1.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => f as u32,
        _ => 1,
    }
}

/// Parses CSV text into raw entry records.
///
/// # Examples
/// ```
/// use timetable::loader::records_from_csv;
///
/// let csv = "group,day,time,course,teacher\nG1,Monday,08:30,Math,\"Dr.X, B201\"\n";
/// let records = records_from_csv(csv).unwrap();
/// assert_eq!(records[0].teacher, "Dr.X, B201");
/// ```
pub fn records_from_csv(text: &str) -> Result<Vec<ScheduleEntry>> {
    records_from_rows(parse_csv(text))
}

/// Splits CSV text into rows of fields.
///
/// Handles quoted fields, doubled quotes inside them and line breaks
/// inside quotes. `\r\n` and `\n` both end a row.
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = text.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    // Double quote inside quoted field - add a single quote
                    current_field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                row.push(std::mem::take(&mut current_field));
            }
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut current_field));
                rows.push(std::mem::take(&mut row));
            }
            _ => current_field.push(c),
        }
    }

    if !current_field.is_empty() || !row.is_empty() {
        row.push(current_field);
        rows.push(row);
    }
    rows
}

/// Reads raw entry records from the first worksheet of an XLSX workbook.
#[cfg(feature = "web")]
pub fn records_from_xlsx(bytes: &[u8]) -> Result<Vec<ScheduleEntry>> {
    use calamine::{Reader, Xlsx, open_workbook_from_rs};
    use std::io::Cursor;

    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e| TimetableError::Import(format!("unreadable workbook: {}", e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| TimetableError::Import("no sheets found in workbook".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| TimetableError::Import(format!("sheet {}: {}", sheet_name, e)))?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    records_from_rows(rows)
}

/// Parses uploaded bytes, choosing the format from the file name.
pub fn records_from_upload(filename: &str, bytes: &[u8]) -> Result<Vec<ScheduleEntry>> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") | Some("txt") => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| TimetableError::Import(format!("CSV is not UTF-8: {}", e)))?;
            records_from_csv(text)
        }
        #[cfg(feature = "web")]
        Some("xlsx") => records_from_xlsx(bytes),
        #[cfg(not(feature = "web"))]
        Some("xlsx") => Err(TimetableError::Import(
            "Excel support requires the 'web' feature".to_string(),
        )),
        Some(ext) => Err(TimetableError::Import(format!(
            "unsupported file extension: {}",
            ext
        ))),
        None => Err(TimetableError::Import("file has no extension".to_string())),
    }
}

/// Loads raw entry records from a CSV or XLSX file on disk.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<ScheduleEntry>> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let filename = path.to_string_lossy();
    let records = records_from_upload(&filename, &bytes)?;
    info!("read {} records from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_parser_handles_quotes_and_newlines() {
        let rows = parse_csv("a,\"b,c\",\"say \"\"hi\"\"\"\r\n\"multi\nline\",x\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["a", "b,c", "say \"hi\""]);
        assert_eq!(rows[1], vec!["multi\nline", "x"]);
    }

    #[test]
    fn header_order_and_case_are_free() {
        let csv = "Course,ROOM,Day,Group,Time,Subject Type,Duration\n\
                   Math,B201,Monday,G1,08:30,Lab,2\n";
        let records = records_from_csv(csv).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.key().to_string(), "G1-Monday-08:30");
        assert_eq!(r.room, "B201");
        assert_eq!(r.subject_type, SubjectType::Lab);
        assert_eq!(r.duration, 2);
    }

    #[test]
    fn optional_columns_default() {
        let records = records_from_csv("group,day,time,course\nG1,Mon,1,Art\n").unwrap();
        assert_eq!(records[0].teacher, "");
        assert_eq!(records[0].subject_type, SubjectType::Lecture);
        assert_eq!(records[0].duration, 1);
    }

    #[test]
    fn bad_durations_fall_back_to_one() {
        assert_eq!(parse_duration("3"), 3);
        assert_eq!(parse_duration("2.0"), 2);
        assert_eq!(parse_duration("two"), 1);
        assert_eq!(parse_duration("0.5"), 1);
        assert_eq!(parse_duration(""), 1);
    }

    #[test]
    fn blank_rows_are_dropped() {
        let records = records_from_csv("group,day,time,course\n,,,\nG1,Mon,1,Art\n\n").unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let err = records_from_csv("group,day,course\nG1,Mon,Art\n").unwrap_err();
        assert!(err.to_string().contains("time"));
        assert!(records_from_csv("").is_err());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(records_from_upload("plan.pdf", b"").is_err());
        assert!(records_from_upload("plan", b"").is_err());
    }
}
