use tempfile::tempdir;
use timetable::saving::{load_timetable, save_timetable, snapshot_from_bytes, snapshot_to_bytes};
use timetable::{EntryFields, SlotKey, Timetable, TimetableConfig};

fn filled() -> Timetable {
    let mut t = Timetable::from_config(&TimetableConfig::default());
    t.add_group("Empty group").unwrap();
    t.upsert(
        SlotKey::new("CS-1", "Monday", "08:30-10:00"),
        EntryFields::course("Math").teacher("Dr. X").room("B201"),
    )
    .unwrap();
    t.upsert(
        SlotKey::new("CS-2", "Thursday", "14:30-16:00"),
        EntryFields::course("Art").duration(3),
    )
    .unwrap();
    t
}

#[test]
fn test_save_and_load_through_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("timetable.bin.gz");

    let original = filled();
    save_timetable(&original, &path).unwrap();
    assert!(path.exists());

    let mut restored = Timetable::from_config(&TimetableConfig::default());
    restored
        .upsert(
            SlotKey::new("Stale", "Sunday", "08:30-10:00"),
            EntryFields::course("Gone"),
        )
        .unwrap();
    load_timetable(&mut restored, &path).unwrap();

    assert_eq!(restored.groups(), original.groups());
    assert_eq!(restored.entry_map(), original.entry_map());
}

#[test]
fn test_snapshot_bytes_are_gzip() {
    let bytes = snapshot_to_bytes(&filled()).unwrap();
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);

    let snapshot = snapshot_from_bytes(&bytes).unwrap();
    assert_eq!(snapshot.groups, vec!["Empty group", "CS-1", "CS-2"]);
    assert_eq!(snapshot.entries.len(), 2);
}

#[test]
fn test_loading_garbage_fails_without_changes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.bin.gz");
    std::fs::write(&path, b"not a snapshot").unwrap();

    let mut t = filled();
    assert!(load_timetable(&mut t, &path).is_err());
    assert_eq!(t.len(), 2);

    assert!(load_timetable(&mut t, dir.path().join("missing.bin.gz")).is_err());
}
