use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::TimetableConfig;
use crate::conflicts::{self, Conflict};
use crate::directory;
use crate::entry::{EntryFields, ScheduleEntry, SlotKey};
use crate::error::{Result, TimetableError};
use crate::normalizer::Normalizer;

/// In-memory timetable: the ordered group list plus the map from
/// `(group, day, time)` to the entry stored there.
///
/// Every stored entry's own `group/day/time` equals the key it is stored
/// under, and every entry's group is a member of the group list.
#[derive(Clone, Debug)]
pub struct Timetable {
    days: Vec<String>,
    time_slots: Vec<String>,
    groups: Vec<String>,
    entries: BTreeMap<SlotKey, ScheduleEntry>,
    normalizer: Normalizer,
}

/// Result of an [`Timetable::upsert`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    pub entry: ScheduleEntry,
    /// The entry that previously occupied the key, if any.
    pub replaced: Option<ScheduleEntry>,
    /// Advisory: conflicts the written entry now takes part in.
    pub conflicts: Vec<Conflict>,
}

/// Result of a [`Timetable::move_entry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Destination was empty; the entry now lives there alone.
    Moved,
    /// Destination was occupied; the two entries traded places.
    Swapped,
    /// Source and destination are the same key.
    Unchanged,
    /// Nothing stored at the source key.
    SourceNotFound,
}

/// How an import treats the existing timetable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Upsert records on top of what is there.
    #[default]
    Merge,
    /// Drop all groups and entries first.
    Replace,
}

/// Per-import summary. Rows are 1-based data rows (header excluded).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<(usize, String)>,
}

impl Timetable {
    /// Empty timetable over the given grid domains.
    pub fn new(days: Vec<String>, time_slots: Vec<String>) -> Self {
        Timetable {
            days,
            time_slots,
            groups: Vec::new(),
            entries: BTreeMap::new(),
            normalizer: Normalizer::default(),
        }
    }

    /// Empty timetable using the configured domains and teacher aliases.
    pub fn from_config(config: &TimetableConfig) -> Self {
        Timetable::new(config.days.clone(), config.time_slots.clone())
            .with_normalizer(config.normalizer())
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn days(&self) -> &[String] {
        &self.days
    }

    pub fn time_slots(&self) -> &[String] {
        &self.time_slots
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &SlotKey) -> Option<&ScheduleEntry> {
        self.entries.get(key)
    }

    /// Stored entries keyed by their composite key.
    pub fn entry_map(&self) -> &BTreeMap<SlotKey, ScheduleEntry> {
        &self.entries
    }

    /// Entries in group-list order, then day order, then time-slot order.
    pub fn entries(&self) -> Vec<&ScheduleEntry> {
        let mut entries: Vec<&ScheduleEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| {
            (
                rank(&self.groups, &e.group),
                rank(&self.days, &e.day),
                rank(&self.time_slots, &e.time),
            )
        });
        entries
    }

    /// Inserts or replaces the entry at `(group, day, time)`.
    ///
    /// Omitted fields default to an empty teacher and room, `lecture` and a
    /// duration of 1. The write always goes through; conflicts it causes are
    /// only reported back.
    ///
    /// # Arguments
    /// * `key` - Target coordinate; day and time must belong to the grid
    /// * `fields` - Entry payload; `course` is required
    ///
    /// # Returns
    /// * `Result<UpsertOutcome>` - The stored entry, the one it replaced and
    ///   advisory conflicts, or a validation error with nothing changed
    pub fn upsert(&mut self, key: SlotKey, fields: EntryFields) -> Result<UpsertOutcome> {
        let key = key.trimmed();
        self.check_key(&key)?;
        if fields.course.trim().is_empty() {
            return Err(TimetableError::MissingField("course"));
        }
        if fields.duration == Some(0) {
            return Err(TimetableError::InvalidDuration);
        }

        self.register_group(&key.group);
        let entry = fields.into_entry(&key);
        let replaced = self.entries.insert(key.clone(), entry.clone());
        debug!("upserted {}", key);

        let conflicts =
            conflicts::conflicts_involving(&self.normalizer, self.entries.values(), &key);
        if !conflicts.is_empty() {
            debug!("{} now takes part in {} conflict(s)", key, conflicts.len());
        }

        Ok(UpsertOutcome {
            entry,
            replaced,
            conflicts,
        })
    }

    /// Removes the entry at `key`. Returns `false` when there was none.
    pub fn delete(&mut self, key: &SlotKey) -> bool {
        let removed = self.entries.remove(&key.trimmed()).is_some();
        if removed {
            debug!("deleted {}", key);
        }
        removed
    }

    /// Moves the entry at `from` to `to`, swapping with whatever sits at `to`.
    ///
    /// Both moved entries have their embedded coordinates rewritten, and the
    /// number of stored entries never changes.
    pub fn move_entry(&mut self, from: &SlotKey, to: &SlotKey) -> Result<MoveOutcome> {
        let from = from.trimmed();
        let to = to.trimmed();
        self.check_key(&to)?;

        if !self.entries.contains_key(&from) {
            debug!("move from {} ignored: source not found", from);
            return Ok(MoveOutcome::SourceNotFound);
        }
        if from == to {
            return Ok(MoveOutcome::Unchanged);
        }

        self.register_group(&to.group);
        let Some(mut moving) = self.entries.remove(&from) else {
            return Ok(MoveOutcome::SourceNotFound);
        };
        moving.relocate(&to);

        let outcome = match self.entries.insert(to.clone(), moving) {
            Some(mut displaced) => {
                displaced.relocate(&from);
                self.entries.insert(from.clone(), displaced);
                MoveOutcome::Swapped
            }
            None => MoveOutcome::Moved,
        };
        debug!("moved {} -> {} ({:?})", from, to, outcome);
        Ok(outcome)
    }

    /// Appends a new group.
    pub fn add_group(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TimetableError::MissingField("group"));
        }
        if self.groups.iter().any(|g| g == name) {
            return Err(TimetableError::DuplicateGroup(name.to_string()));
        }
        self.groups.push(name.to_string());
        Ok(())
    }

    /// Renames a group in place and re-keys all of its entries.
    pub fn rename_group(&mut self, old: &str, new: &str) -> Result<()> {
        let (old, new) = (old.trim(), new.trim());
        if new.is_empty() {
            return Err(TimetableError::MissingField("group"));
        }
        let Some(index) = self.groups.iter().position(|g| g == old) else {
            return Err(TimetableError::UnknownGroup(old.to_string()));
        };
        if old == new {
            return Ok(());
        }
        if self.groups.iter().any(|g| g == new) {
            return Err(TimetableError::DuplicateGroup(new.to_string()));
        }

        self.groups[index] = new.to_string();
        let keys: Vec<SlotKey> = self
            .entries
            .keys()
            .filter(|k| k.group == old)
            .cloned()
            .collect();
        for key in keys {
            if let Some(mut entry) = self.entries.remove(&key) {
                let new_key = SlotKey::new(new, &key.day, &key.time);
                entry.relocate(&new_key);
                self.entries.insert(new_key, entry);
            }
        }
        info!("renamed group {} to {}", old, new);
        Ok(())
    }

    /// Removes `group` and every entry belonging to it.
    ///
    /// Returns the number of entries removed; unknown groups remove nothing.
    pub fn delete_group(&mut self, group: &str) -> usize {
        let group = group.trim();
        self.groups.retain(|g| g != group);
        let before = self.entries.len();
        self.entries.retain(|_, e| e.group != group);
        let removed = before - self.entries.len();
        info!("deleted group {} with {} entries", group, removed);
        removed
    }

    /// Drops every group and entry, keeping the grid and normalizer.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.entries.clear();
    }

    /// Upserts every record independently; bad rows are skipped and reported.
    pub fn import<I>(&mut self, records: I, mode: ImportMode) -> ImportReport
    where
        I: IntoIterator<Item = ScheduleEntry>,
    {
        if mode == ImportMode::Replace {
            self.clear();
        }

        let mut report = ImportReport::default();
        for (index, record) in records.into_iter().enumerate() {
            let row = index + 1;
            let key = record.key();
            match self.upsert(key, EntryFields::from(record)) {
                Ok(_) => report.imported += 1,
                Err(e) => {
                    warn!("import row {} skipped: {}", row, e);
                    report.skipped.push((row, e.to_string()));
                }
            }
        }
        info!(
            "imported {} entries ({} skipped)",
            report.imported,
            report.skipped.len()
        );
        report
    }

    /// Every teacher/room double-booking in the current grid.
    pub fn conflicts(&self) -> Vec<Conflict> {
        conflicts::scan_conflicts_with(
            &self.normalizer,
            self.entries.values(),
            &self.days,
            &self.time_slots,
        )
    }

    /// Same total as `conflicts().len()`, computed without building them.
    pub fn conflict_count(&self) -> usize {
        conflicts::count_conflicts_with(
            &self.normalizer,
            self.entries.values(),
            &self.days,
            &self.time_slots,
        )
    }

    /// Sorted canonical teacher names.
    pub fn teachers(&self) -> Vec<String> {
        directory::build_directory_with(&self.normalizer, self.entries.values())
    }

    /// Entries taught by `teacher`, in grid order.
    pub fn teacher_schedule(&self, teacher: &str) -> Vec<ScheduleEntry> {
        directory::teacher_schedule(
            &self.normalizer,
            self.entries.values(),
            teacher,
            &self.days,
            &self.time_slots,
        )
    }

    /// Restores groups and entries from a snapshot.
    ///
    /// Entries are re-keyed from their own coordinates; entries whose group
    /// is missing from `groups` get it appended.
    pub fn restore(&mut self, groups: Vec<String>, entries: Vec<ScheduleEntry>) {
        self.clear();
        for group in groups {
            if self.add_group(&group).is_err() {
                warn!("snapshot group {:?} ignored", group);
            }
        }
        for entry in entries {
            self.register_group(&entry.group);
            self.entries.insert(entry.key(), entry);
        }
    }

    fn check_key(&self, key: &SlotKey) -> Result<()> {
        if key.group.is_empty() {
            return Err(TimetableError::MissingField("group"));
        }
        if key.day.is_empty() {
            return Err(TimetableError::MissingField("day"));
        }
        if key.time.is_empty() {
            return Err(TimetableError::MissingField("time"));
        }
        if !self.days.iter().any(|d| *d == key.day) {
            return Err(TimetableError::UnknownDay(key.day.clone()));
        }
        if !self.time_slots.iter().any(|t| *t == key.time) {
            return Err(TimetableError::UnknownTimeSlot(key.time.clone()));
        }
        Ok(())
    }

    fn register_group(&mut self, group: &str) {
        if !self.groups.iter().any(|g| g == group) {
            self.groups.push(group.to_string());
        }
    }
}

fn rank(domain: &[String], value: &str) -> usize {
    domain.iter().position(|d| d == value).unwrap_or(domain.len())
}
