//! Double-booking detection.
//!
//! A conflict is two or more entries from different groups that share a
//! `(day, time)` slot and the same teacher or the same room. Teachers are
//! compared by normalized identity, rooms by trimmed lower-case text.
//! Conflicts are derived on demand and never stored.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::entry::{ScheduleEntry, SlotKey};
use crate::normalizer::{Normalizer, default_normalizer};

/// What the clashing entries have in common.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Teacher,
    Room,
}

/// Entries from different groups booked into the same slot with the same
/// teacher or room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub day: String,
    pub time: String,
    /// Canonical teacher name or room as first seen in the slot.
    pub value: String,
    /// At least two entries, one per group, in discovery order.
    pub entries: Vec<ScheduleEntry>,
}

impl Conflict {
    pub fn keys(&self) -> Vec<SlotKey> {
        self.entries.iter().map(ScheduleEntry::key).collect()
    }

    pub fn involves(&self, key: &SlotKey) -> bool {
        self.entries
            .iter()
            .any(|e| e.group == key.group && e.day == key.day && e.time == key.time)
    }
}

/// Comparison key for a room: trimmed, whitespace-collapsed, lower-cased.
fn room_identity(room: &str) -> String {
    room.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Identity and display value of an entry for the given kind. Empty
/// identities never conflict.
fn identity(normalizer: &Normalizer, kind: ConflictKind, entry: &ScheduleEntry) -> (String, String) {
    match kind {
        ConflictKind::Teacher => {
            let name = normalizer.normalize(&entry.teacher);
            (name.to_lowercase(), name)
        }
        ConflictKind::Room => {
            let display = entry.room.split_whitespace().collect::<Vec<_>>().join(" ");
            (room_identity(&entry.room), display)
        }
    }
}

/// Groups the entries by `(day, time)`, preserving input order within a slot.
fn index_by_slot<'a, I>(entries: I) -> HashMap<(&'a str, &'a str), Vec<&'a ScheduleEntry>>
where
    I: IntoIterator<Item = &'a ScheduleEntry>,
{
    let mut slots: HashMap<(&str, &str), Vec<&ScheduleEntry>> = HashMap::new();
    for entry in entries {
        slots
            .entry((entry.day.as_str(), entry.time.as_str()))
            .or_default()
            .push(entry);
    }
    slots
}

/// Finds the conflicts among entries that already sit in one slot.
///
/// Teacher conflicts are reported before room conflicts; within a kind,
/// buckets appear in the order their first entry was seen. A group
/// contributes at most one entry to a bucket.
fn scan_slot(
    normalizer: &Normalizer,
    day: &str,
    time: &str,
    slot: &[&ScheduleEntry],
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    if slot.len() < 2 {
        return conflicts;
    }

    for kind in [ConflictKind::Teacher, ConflictKind::Room] {
        let mut order: Vec<(String, String)> = Vec::new();
        let mut buckets: HashMap<String, Vec<&ScheduleEntry>> = HashMap::new();

        for &entry in slot {
            let (id, display) = identity(normalizer, kind, entry);
            if id.is_empty() {
                continue;
            }
            let bucket = buckets.entry(id.clone()).or_insert_with(|| {
                order.push((id, display));
                Vec::new()
            });
            if !bucket.iter().any(|e| e.group == entry.group) {
                bucket.push(entry);
            }
        }

        for (id, display) in order {
            let bucket = &buckets[&id];
            if bucket.len() >= 2 {
                conflicts.push(Conflict {
                    kind,
                    day: day.to_string(),
                    time: time.to_string(),
                    value: display,
                    entries: bucket.iter().map(|e| (*e).clone()).collect(),
                });
            }
        }
    }

    conflicts
}

/// Scans the whole grid for double-booked teachers and rooms.
///
/// Slots are visited in `days` order, then `time_slots` order. Entries
/// whose day or time lies outside those domains are not examined.
///
/// # Arguments
/// * `entries` - Snapshot of the schedule
/// * `days` - Ordered day domain
/// * `time_slots` - Ordered time-slot domain
///
/// # Returns
/// * `Vec<Conflict>` - Every conflict, in day, time, discovery order
///
/// # Examples
/// ```
/// use timetable::{ScheduleEntry, scan_conflicts};
///
/// let days = vec!["Monday".to_string()];
/// let slots = vec!["08:30".to_string()];
/// let entries = vec![
///     ScheduleEntry::new("A", "Monday", "08:30", "Math").with_teacher("Dr. X"),
///     ScheduleEntry::new("B", "Monday", "08:30", "Physics").with_teacher("Dr. X B110"),
/// ];
/// let conflicts = scan_conflicts(&entries, &days, &slots);
/// assert_eq!(conflicts.len(), 1);
/// assert_eq!(conflicts[0].value, "Dr. X");
/// ```
pub fn scan_conflicts<'a, I>(entries: I, days: &[String], time_slots: &[String]) -> Vec<Conflict>
where
    I: IntoIterator<Item = &'a ScheduleEntry>,
{
    scan_conflicts_with(default_normalizer(), entries, days, time_slots)
}

/// Same as [`scan_conflicts`] with an explicit normalizer.
pub fn scan_conflicts_with<'a, I>(
    normalizer: &Normalizer,
    entries: I,
    days: &[String],
    time_slots: &[String],
) -> Vec<Conflict>
where
    I: IntoIterator<Item = &'a ScheduleEntry>,
{
    let slots = index_by_slot(entries);
    let mut conflicts = Vec::new();

    // A repeated day or slot is scanned once, as the counting pass does.
    for day in distinct(days) {
        for time in distinct(time_slots) {
            if let Some(slot) = slots.get(&(day, time)) {
                conflicts.extend(scan_slot(normalizer, day, time, slot));
            }
        }
    }

    conflicts
}

/// Domain values in order, skipping repeats.
fn distinct(domain: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    domain
        .iter()
        .map(String::as_str)
        .filter(|v| seen.insert(*v))
        .collect()
}

/// Conflicts at the slot of `key` that involve the entry stored under `key`.
pub fn conflicts_involving<'a, I>(
    normalizer: &Normalizer,
    entries: I,
    key: &SlotKey,
) -> Vec<Conflict>
where
    I: IntoIterator<Item = &'a ScheduleEntry>,
{
    let slot: Vec<&ScheduleEntry> = entries
        .into_iter()
        .filter(|e| e.day == key.day && e.time == key.time)
        .collect();

    scan_slot(normalizer, &key.day, &key.time, &slot)
        .into_iter()
        .filter(|c| c.involves(key))
        .collect()
}

/// Number of conflicts, without materializing them.
///
/// Counts distinct `(kind, identity, day, time)` buckets that span two or
/// more groups, so a three-way clash counts once. Always equal to
/// `scan_conflicts(entries, days, time_slots).len()`.
pub fn count_conflicts<'a, I>(entries: I, days: &[String], time_slots: &[String]) -> usize
where
    I: IntoIterator<Item = &'a ScheduleEntry>,
{
    count_conflicts_with(default_normalizer(), entries, days, time_slots)
}

/// Same as [`count_conflicts`] with an explicit normalizer.
pub fn count_conflicts_with<'a, I>(
    normalizer: &Normalizer,
    entries: I,
    days: &[String],
    time_slots: &[String],
) -> usize
where
    I: IntoIterator<Item = &'a ScheduleEntry>,
{
    let days: HashSet<&str> = days.iter().map(String::as_str).collect();
    let time_slots: HashSet<&str> = time_slots.iter().map(String::as_str).collect();
    let mut groups: HashMap<(ConflictKind, String, &str, &str), HashSet<&str>> = HashMap::new();

    for entry in entries {
        if !days.contains(entry.day.as_str()) || !time_slots.contains(entry.time.as_str()) {
            continue;
        }
        for kind in [ConflictKind::Teacher, ConflictKind::Room] {
            let (id, _) = identity(normalizer, kind, entry);
            if id.is_empty() {
                continue;
            }
            groups
                .entry((kind, id, entry.day.as_str(), entry.time.as_str()))
                .or_default()
                .insert(entry.group.as_str());
        }
    }

    groups.values().filter(|g| g.len() >= 2).count()
}

/// Every key that takes part in at least one of `conflicts`. Used to badge cells.
pub fn conflicting_keys(conflicts: &[Conflict]) -> HashSet<SlotKey> {
    conflicts.iter().flat_map(Conflict::keys).collect()
}
