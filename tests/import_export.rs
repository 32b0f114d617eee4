use timetable::downloader::{CSV_HEADER, to_csv};
use timetable::loader::{records_from_csv, records_from_upload};
use timetable::{EntryFields, ImportMode, SlotKey, SubjectType, Timetable, TimetableConfig};

fn sample() -> Timetable {
    let mut t = Timetable::from_config(&TimetableConfig::default());
    t.upsert(
        SlotKey::new("CS-1", "Monday", "08:30-10:00"),
        EntryFields::course("Algorithms, part 1")
            .teacher("Dr. Ahmad")
            .room("B201"),
    )
    .unwrap();
    t.upsert(
        SlotKey::new("CS-2", "Monday", "08:30-10:00"),
        EntryFields::course("Networks")
            .teacher("Dr.Ahmad B105")
            .room("B105")
            .subject_type(SubjectType::Lab)
            .duration(2),
    )
    .unwrap();
    t.upsert(
        SlotKey::new("CS-1", "Sunday", "10:00-11:30"),
        EntryFields::course("Say \"hello\"").teacher("Ms. Asina"),
    )
    .unwrap();
    t
}

#[test]
fn test_csv_export_header_and_order() {
    let csv = to_csv(&sample());
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some(CSV_HEADER.join(",").as_str()));
    let first = lines.next().unwrap();
    assert!(first.starts_with("CS-1,Sunday,10:00-11:30,"));
    assert!(first.contains("\"Say \"\"hello\"\"\""));
}

#[test]
fn test_csv_export_imports_back() {
    let original = sample();
    let records = records_from_csv(&to_csv(&original)).unwrap();
    assert_eq!(records.len(), 3);

    let mut copy = Timetable::from_config(&TimetableConfig::default());
    let report = copy.import(records, ImportMode::Replace);
    assert!(report.skipped.is_empty());
    assert_eq!(copy.entry_map(), original.entry_map());
    assert_eq!(copy.conflict_count(), original.conflict_count());
}

#[test]
fn test_upload_dispatch_by_extension() {
    let csv = b"group,day,time,course\nG1,Monday,08:30-10:00,Math\n";
    let records = records_from_upload("Plan.CSV", csv).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records_from_upload("plan.docx", csv).is_err());
}

#[cfg(feature = "web")]
#[test]
fn test_xlsx_export_reads_back_grid_sheets() {
    use calamine::{Reader, Xlsx, open_workbook_from_rs};
    use std::io::Cursor;

    let bytes = timetable::downloader::to_xlsx(&sample()).unwrap();
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["CS-1", "CS-2", "Conflicts"]);

    let grid = workbook.worksheet_range("CS-1").unwrap();
    // Row 0 holds time slots, column 0 holds days; Monday is the second day.
    let cell = grid.get_value((2, 1)).unwrap().to_string();
    assert_eq!(cell, "Algorithms, part 1 / Dr. Ahmad / B201");

    let conflicts = workbook.worksheet_range("Conflicts").unwrap();
    assert_eq!(conflicts.height(), 2);
    assert_eq!(conflicts.get_value((1, 0)).unwrap().to_string(), "teacher");
}
