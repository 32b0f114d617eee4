use std::collections::HashSet;

use crate::entry::ScheduleEntry;
use crate::normalizer::{Normalizer, default_normalizer};

/// Builds the sorted list of distinct teachers named across `entries`.
///
/// Names are normalized, blanks are dropped and duplicates are detected
/// case-insensitively. The first spelling seen for a teacher is the one kept.
///
/// # Arguments
/// * `entries` - Any sequence of schedule entries
///
/// # Returns
/// * `Vec<String>` - Canonical teacher names in lexicographic order
///
/// # Examples
/// ```
/// use timetable::{ScheduleEntry, build_directory};
///
/// let entries = vec![
///     ScheduleEntry::new("G1", "Monday", "08:30", "Math").with_teacher("Dr. X B110"),
///     ScheduleEntry::new("G2", "Monday", "08:30", "Physics").with_teacher("dr. x b202"),
/// ];
/// assert_eq!(build_directory(&entries), vec!["Dr. X".to_string()]);
/// ```
pub fn build_directory<'a, I>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a ScheduleEntry>,
{
    build_directory_with(default_normalizer(), entries)
}

/// Same as [`build_directory`] with an explicit normalizer.
pub fn build_directory_with<'a, I>(normalizer: &Normalizer, entries: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a ScheduleEntry>,
{
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for entry in entries {
        let name = normalizer.normalize(&entry.teacher);
        if name.is_empty() {
            continue;
        }
        if seen.insert(name.to_lowercase()) {
            names.push(name);
        }
    }

    names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    names
}

/// Every entry taught by `teacher`, in grid order.
///
/// `teacher` is normalized the same way as the entries, so any spelling
/// that collapses to the same canonical name matches. Entries are ordered
/// by their position in `days`, then in `time_slots`, then by group.
pub fn teacher_schedule<'a, I>(
    normalizer: &Normalizer,
    entries: I,
    teacher: &str,
    days: &[String],
    time_slots: &[String],
) -> Vec<ScheduleEntry>
where
    I: IntoIterator<Item = &'a ScheduleEntry>,
{
    let wanted = normalizer.identity(teacher);
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<ScheduleEntry> = entries
        .into_iter()
        .filter(|e| normalizer.identity(&e.teacher) == wanted)
        .cloned()
        .collect();

    let position = |domain: &[String], value: &str| {
        domain.iter().position(|d| d == value).unwrap_or(domain.len())
    };
    matches.sort_by(|a, b| {
        position(days, &a.day)
            .cmp(&position(days, &b.day))
            .then_with(|| position(time_slots, &a.time).cmp(&position(time_slots, &b.time)))
            .then_with(|| a.group.cmp(&b.group))
    });
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(group: &str, day: &str, time: &str, teacher: &str) -> ScheduleEntry {
        ScheduleEntry::new(group, day, time, "Course").with_teacher(teacher)
    }

    #[test]
    fn collapses_spelling_variants_into_one_name() {
        let entries = vec![
            entry("G1", "Mon", "1", "Dr. X B110"),
            entry("G2", "Mon", "2", "dr. x b202"),
            entry("G3", "Tue", "1", "Dr. X"),
        ];
        assert_eq!(build_directory(&entries), vec!["Dr. X"]);
    }

    #[test]
    fn drops_blank_and_room_only_teachers() {
        let entries = vec![
            entry("G1", "Mon", "1", ""),
            entry("G2", "Mon", "1", "B201"),
            entry("G3", "Mon", "1", "Ms.Asina LAB"),
        ];
        assert_eq!(build_directory(&entries), vec!["Ms. Asina"]);
    }

    #[test]
    fn output_is_sorted() {
        let entries = vec![
            entry("G1", "Mon", "1", "Prof. Zed"),
            entry("G1", "Mon", "2", "Dr. Beta"),
            entry("G1", "Mon", "3", "Dr. alpha"),
        ];
        assert_eq!(
            build_directory(&entries),
            vec!["Dr. alpha", "Dr. Beta", "Prof. Zed"]
        );
    }

    #[test]
    fn teacher_schedule_follows_grid_order() {
        let days: Vec<String> = vec!["Mon".into(), "Tue".into()];
        let slots: Vec<String> = vec!["1".into(), "2".into()];
        let entries = vec![
            entry("G2", "Tue", "1", "Dr. X"),
            entry("G1", "Mon", "2", "dr.x B12"),
            entry("G3", "Mon", "1", "Dr. Y"),
            entry("G1", "Mon", "1", "Dr. X LAB"),
        ];
        let n = Normalizer::default();
        let schedule = teacher_schedule(&n, &entries, "DR X", &days, &slots);
        let keys: Vec<String> = schedule.iter().map(|e| e.key().to_string()).collect();
        assert_eq!(keys, vec!["G1-Mon-1", "G1-Mon-2", "G2-Tue-1"]);
    }

    #[test]
    fn teacher_schedule_for_blank_name_is_empty() {
        let entries = vec![entry("G1", "Mon", "1", "")];
        let n = Normalizer::default();
        assert!(teacher_schedule(&n, &entries, "", &[], &[]).is_empty());
    }
}
