use crate::timetable::Timetable;

#[cfg(feature = "web")]
use crate::error::{Result, TimetableError};

/// Header row shared with the importer, so exports load back unchanged.
pub const CSV_HEADER: [&str; 8] = [
    "group", "day", "time", "course", "teacher", "room", "type", "duration",
];

/// Convert a timetable to CSV format
///
/// Writes one row per entry in group, day, time order under
/// [`CSV_HEADER`]. Fields containing commas, quotes or line breaks are
/// quoted, with embedded quotes doubled.
///
/// # Arguments
/// * `timetable` - Reference to the timetable to convert
///
/// # Returns
/// * `String` - CSV content
pub fn to_csv(timetable: &Timetable) -> String {
    let mut csv_content = CSV_HEADER.join(",");
    csv_content.push('\n');

    for entry in timetable.entries() {
        let duration = entry.duration.to_string();
        let fields = [
            entry.group.as_str(),
            entry.day.as_str(),
            entry.time.as_str(),
            entry.course.as_str(),
            entry.teacher.as_str(),
            entry.room.as_str(),
            entry.subject_type.as_str(),
            duration.as_str(),
        ];
        let row: Vec<String> = fields.iter().map(|f| escape_csv(f)).collect();
        csv_content.push_str(&row.join(","));
        csv_content.push('\n');
    }

    csv_content
}

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Convert a timetable to XLSX format
///
/// Produces one worksheet per group laid out as the grid (days down,
/// time slots across, each cell "course / teacher / room"), with cells that
/// take part in a conflict highlighted, followed by a "Conflicts" sheet
/// listing every conflict.
///
/// # Arguments
/// * `timetable` - Reference to the timetable to convert
///
/// # Returns
/// * `Result<Vec<u8>>` - XLSX file content as bytes or an `Export` error
#[cfg(feature = "web")]
pub fn to_xlsx(timetable: &Timetable) -> Result<Vec<u8>> {
    use crate::conflicts::conflicting_keys;
    use crate::entry::SlotKey;
    use rust_xlsxwriter::{Color, Format, Workbook, Worksheet, XlsxError};

    fn export_err(e: XlsxError) -> TimetableError {
        TimetableError::Export(e.to_string())
    }

    let conflicts = timetable.conflicts();
    let flagged = conflicting_keys(&conflicts);

    let header = Format::new().set_bold();
    let cell = Format::new().set_text_wrap();
    let clash = Format::new()
        .set_text_wrap()
        .set_background_color(Color::RGB(0xFFC7CE));

    let mut workbook = Workbook::new();
    let mut used_names = Vec::new();

    for group in timetable.groups() {
        let mut worksheet = Worksheet::new();
        let name = sheet_name(group, &used_names);
        worksheet.set_name(&name).map_err(export_err)?;
        used_names.push(name);

        worksheet
            .write_string_with_format(0, 0, group, &header)
            .map_err(export_err)?;
        worksheet.set_column_width(0, 14).map_err(export_err)?;
        for (c, time) in timetable.time_slots().iter().enumerate() {
            let col = (c + 1) as u16;
            worksheet
                .write_string_with_format(0, col, time, &header)
                .map_err(export_err)?;
            worksheet.set_column_width(col, 28).map_err(export_err)?;
        }

        for (r, day) in timetable.days().iter().enumerate() {
            let row = (r + 1) as u32;
            worksheet
                .write_string_with_format(row, 0, day, &header)
                .map_err(export_err)?;
            for (c, time) in timetable.time_slots().iter().enumerate() {
                let key = SlotKey::new(group, day, time);
                if let Some(entry) = timetable.get(&key) {
                    let text = [&entry.course, &entry.teacher, &entry.room]
                        .iter()
                        .filter(|s| !s.is_empty())
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(" / ");
                    let format = if flagged.contains(&key) { &clash } else { &cell };
                    worksheet
                        .write_string_with_format(row, (c + 1) as u16, &text, format)
                        .map_err(export_err)?;
                }
            }
        }

        workbook.push_worksheet(worksheet);
    }

    let mut worksheet = Worksheet::new();
    worksheet.set_name("Conflicts").map_err(export_err)?;
    for (c, title) in ["type", "day", "time", "value", "entries"].iter().enumerate() {
        worksheet
            .write_string_with_format(0, c as u16, *title, &header)
            .map_err(export_err)?;
    }
    for (r, conflict) in conflicts.iter().enumerate() {
        let row = (r + 1) as u32;
        let kind = match conflict.kind {
            crate::conflicts::ConflictKind::Teacher => "teacher",
            crate::conflicts::ConflictKind::Room => "room",
        };
        let keys = conflict
            .keys()
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        worksheet.write_string(row, 0, kind).map_err(export_err)?;
        worksheet.write_string(row, 1, &conflict.day).map_err(export_err)?;
        worksheet.write_string(row, 2, &conflict.time).map_err(export_err)?;
        worksheet.write_string(row, 3, &conflict.value).map_err(export_err)?;
        worksheet.write_string(row, 4, &keys).map_err(export_err)?;
    }
    workbook.push_worksheet(worksheet);

    workbook.save_to_buffer().map_err(export_err)
}

/// Excel sheet names: at most 31 chars, none of `[]:*?/\`, unique
/// (case-insensitively), and "Conflicts" is reserved.
#[cfg(feature = "web")]
fn sheet_name(group: &str, used: &[String]) -> String {
    let cleaned: String = group
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim();
    let base: String = if cleaned.is_empty() {
        "Group".to_string()
    } else {
        cleaned.chars().take(31).collect()
    };

    let taken = |name: &str| {
        name.eq_ignore_ascii_case("Conflicts") || used.iter().any(|u| u.eq_ignore_ascii_case(name))
    };
    if !taken(&base) {
        return base;
    }
    (2..)
        .map(|n| {
            let suffix = format!(" ({})", n);
            let stem: String = base.chars().take(31 - suffix.len()).collect();
            format!("{}{}", stem, suffix)
        })
        .find(|candidate| !taken(candidate))
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_fields_are_escaped() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[cfg(feature = "web")]
    #[test]
    fn sheet_names_are_sanitized_and_unique() {
        assert_eq!(sheet_name("CS/1", &[]), "CS_1");
        assert_eq!(sheet_name("conflicts", &[]), "conflicts (2)");
        let used = vec!["G1".to_string()];
        assert_eq!(sheet_name("g1", &used), "g1 (2)");
        let long = "x".repeat(40);
        assert_eq!(sheet_name(&long, &[]).chars().count(), 31);
    }
}
