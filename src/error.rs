use thiserror::Error;

/// Errors reported by the timetable core and its import/export collaborators.
///
/// Validation variants are raised before any mutation happens, so a failed
/// call never leaves the timetable partially updated.
#[derive(Debug, Error)]
pub enum TimetableError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unknown day `{0}`")]
    UnknownDay(String),

    #[error("unknown time slot `{0}`")]
    UnknownTimeSlot(String),

    #[error("duration must be at least 1")]
    InvalidDuration,

    #[error("group `{0}` already exists")]
    DuplicateGroup(String),

    #[error("group `{0}` not found")]
    UnknownGroup(String),

    #[error("import failed: {0}")]
    Import(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] bincode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl TimetableError {
    /// True for errors caused by bad caller input rather than I/O.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TimetableError::MissingField(_)
                | TimetableError::UnknownDay(_)
                | TimetableError::UnknownTimeSlot(_)
                | TimetableError::InvalidDuration
                | TimetableError::DuplicateGroup(_)
        )
    }
}

pub type Result<T, E = TimetableError> = std::result::Result<T, E>;
