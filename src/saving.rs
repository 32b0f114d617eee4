use bincode::{deserialize_from, serialize_into};
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::{File, create_dir_all};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::entry::ScheduleEntry;
use crate::error::Result;
use crate::timetable::Timetable;

/// On-disk form of a timetable. Grid domains are not stored; they come
/// from configuration when the snapshot is loaded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimetableSnapshot {
    pub saved_at: DateTime<Utc>,
    pub groups: Vec<String>,
    pub entries: Vec<ScheduleEntry>,
}

impl TimetableSnapshot {
    pub fn capture(timetable: &Timetable) -> Self {
        TimetableSnapshot {
            saved_at: Utc::now(),
            groups: timetable.groups().to_vec(),
            entries: timetable.entries().into_iter().cloned().collect(),
        }
    }

    /// Loads the snapshot into `timetable`, replacing its groups and entries.
    pub fn restore_into(self, timetable: &mut Timetable) {
        timetable.restore(self.groups, self.entries);
    }
}

/// Writes a gzip-compressed bincode snapshot to any writer.
pub fn write_snapshot<W: Write>(timetable: &Timetable, writer: W) -> Result<()> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut writer = BufWriter::new(encoder);
    serialize_into(&mut writer, &TimetableSnapshot::capture(timetable))?;
    let encoder = writer.into_inner().map_err(std::io::Error::from)?;
    encoder.finish()?;
    Ok(())
}

/// Reads a snapshot written by [`write_snapshot`].
pub fn read_snapshot<R: Read>(reader: R) -> Result<TimetableSnapshot> {
    let decoder = GzDecoder::new(reader);
    let mut reader = BufReader::new(decoder);
    let snapshot: TimetableSnapshot = deserialize_from(&mut reader)?;
    Ok(snapshot)
}

pub fn save_timetable(timetable: &Timetable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    write_snapshot(timetable, file)?;
    info!("saved {} entries to {}", timetable.len(), path.display());
    Ok(())
}

/// Replaces the contents of `timetable` with the snapshot stored at `path`.
pub fn load_timetable(timetable: &mut Timetable, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let snapshot = read_snapshot(file)?;
    info!(
        "loaded {} entries saved at {} from {}",
        snapshot.entries.len(),
        snapshot.saved_at,
        path.display()
    );
    snapshot.restore_into(timetable);
    Ok(())
}

pub fn snapshot_to_bytes(timetable: &Timetable) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_snapshot(timetable, &mut buffer)?;
    Ok(buffer)
}

pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<TimetableSnapshot> {
    read_snapshot(bytes)
}
