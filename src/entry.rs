use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of class held in a slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    #[default]
    Lecture,
    Lab,
    Seminar,
}

impl SubjectType {
    /// Lenient parse used by importers. Unknown strings fall back to `Lecture`.
    pub fn from_label(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "lab" | "laboratory" | "practical" => SubjectType::Lab,
            "seminar" | "tutorial" => SubjectType::Seminar,
            _ => SubjectType::Lecture,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::Lecture => "lecture",
            SubjectType::Lab => "lab",
            SubjectType::Seminar => "seminar",
        }
    }
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grid coordinate of an entry: `(group, day, time)`.
///
/// Displays as the composite `group-day-time` key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub group: String,
    pub day: String,
    pub time: String,
}

impl SlotKey {
    pub fn new(group: impl Into<String>, day: impl Into<String>, time: impl Into<String>) -> Self {
        SlotKey {
            group: group.into(),
            day: day.into(),
            time: time.into(),
        }
    }

    /// Copy with every coordinate trimmed.
    pub fn trimmed(&self) -> Self {
        SlotKey::new(self.group.trim(), self.day.trim(), self.time.trim())
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.group, self.day, self.time)
    }
}

/// One scheduled class occupying one `(group, day, time)` key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub group: String,
    pub day: String,
    pub time: String,
    pub course: String,
    #[serde(default)]
    pub teacher: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub subject_type: SubjectType,
    #[serde(default = "default_duration")]
    pub duration: u32,
}

pub(crate) fn default_duration() -> u32 {
    1
}

impl ScheduleEntry {
    pub fn new(
        group: impl Into<String>,
        day: impl Into<String>,
        time: impl Into<String>,
        course: impl Into<String>,
    ) -> Self {
        ScheduleEntry {
            group: group.into(),
            day: day.into(),
            time: time.into(),
            course: course.into(),
            teacher: String::new(),
            room: String::new(),
            subject_type: SubjectType::Lecture,
            duration: 1,
        }
    }

    pub fn with_teacher(mut self, teacher: impl Into<String>) -> Self {
        self.teacher = teacher.into();
        self
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = room.into();
        self
    }

    pub fn with_subject_type(mut self, subject_type: SubjectType) -> Self {
        self.subject_type = subject_type;
        self
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Key rebuilt from the entry's own coordinates.
    pub fn key(&self) -> SlotKey {
        SlotKey::new(&self.group, &self.day, &self.time)
    }

    /// Rewrites the embedded coordinates so that `self.key() == *key`.
    pub(crate) fn relocate(&mut self, key: &SlotKey) {
        self.group = key.group.clone();
        self.day = key.day.clone();
        self.time = key.time.clone();
    }
}

/// Field payload for an upsert. Everything except `course` may be omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFields {
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub teacher: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub subject_type: Option<SubjectType>,
    #[serde(default)]
    pub duration: Option<u32>,
}

impl EntryFields {
    pub fn course(course: impl Into<String>) -> Self {
        EntryFields {
            course: course.into(),
            ..Default::default()
        }
    }

    pub fn teacher(mut self, teacher: impl Into<String>) -> Self {
        self.teacher = Some(teacher.into());
        self
    }

    pub fn room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    pub fn subject_type(mut self, subject_type: SubjectType) -> Self {
        self.subject_type = Some(subject_type);
        self
    }

    pub fn duration(mut self, duration: u32) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Builds the stored record for `key`, applying field defaults.
    pub(crate) fn into_entry(self, key: &SlotKey) -> ScheduleEntry {
        ScheduleEntry {
            group: key.group.clone(),
            day: key.day.clone(),
            time: key.time.clone(),
            course: self.course.trim().to_string(),
            teacher: self.teacher.map(|t| t.trim().to_string()).unwrap_or_default(),
            room: self.room.map(|r| r.trim().to_string()).unwrap_or_default(),
            subject_type: self.subject_type.unwrap_or_default(),
            duration: self.duration.unwrap_or_else(default_duration),
        }
    }
}

impl From<ScheduleEntry> for EntryFields {
    fn from(entry: ScheduleEntry) -> Self {
        EntryFields {
            course: entry.course,
            teacher: Some(entry.teacher),
            room: Some(entry.room),
            subject_type: Some(entry.subject_type),
            duration: Some(entry.duration),
        }
    }
}
