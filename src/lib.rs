/*!
# Timetable

A university timetable service: weekly class schedules per student group,
teacher name cleanup, and detection of teacher and room double-bookings.

## Overview

Schedules arrive from hand-maintained spreadsheets, so the teacher column is
noisy: the same person shows up as `"Dr. Ahmad"`, `"Dr.Ahmad B201"` and
`"dr. ahmed (lab)"`. The crate reduces those spellings to one canonical name,
builds a sorted teacher directory from them, and scans the grid for slots
where one teacher or one room is booked by more than one group.

## Architecture

### Core
- **entry**: `ScheduleEntry`, `SlotKey` and the upsert payload `EntryFields`
- **normalizer**: ordered cleanup rules plus an alias table for known misspellings
- **directory**: deduplicated, sorted list of canonical teacher names
- **conflicts**: per-slot teacher and room conflict detection
- **timetable**: the store (upsert, delete, move/swap, groups, import)

### Collaborators
- **config**: JSON configuration with defaults for the grid and the server
- **loader**: CSV/XLSX import into raw records
- **downloader**: CSV/XLSX export
- **saving**: gzip-compressed bincode snapshots
- **app**: axum REST API (feature `web`)

## Key Features

- Idempotent teacher name normalization
- Conflicts are advisory: writes always succeed and report what they caused
- Moves swap with an occupied destination and never lose an entry
- Import reports skipped rows instead of failing the whole file
- XLSX export with one sheet per group and conflicting cells highlighted

## REST API Endpoints

- `GET /api/timetable` - Grid domains, groups and entries
- `GET|POST /api/groups`, `PUT|DELETE /api/groups/:name` - Group management
- `PUT|DELETE /api/entries`, `POST /api/entries/move` - Entry mutations
- `GET /api/conflicts`, `GET /api/conflicts/count` - Conflict scan
- `GET /api/teachers`, `GET /api/teachers/:name/schedule` - Teacher directory
- `GET /api/export/csv`, `GET /api/export/xlsx` - Downloads
- `POST /api/import?mode=merge|replace` - Upload a CSV or XLSX file
- `POST /api/save`, `POST /api/load` - Snapshot persistence
*/

pub mod config;
pub mod conflicts;
pub mod directory;
pub mod downloader;
pub mod entry;
pub mod error;
pub mod loader;
pub mod normalizer;
pub mod saving;
pub mod timetable;

#[cfg(feature = "web")]
pub mod app;

pub use config::TimetableConfig;
pub use conflicts::{Conflict, ConflictKind, count_conflicts, scan_conflicts};
pub use directory::build_directory;
pub use entry::{EntryFields, ScheduleEntry, SlotKey, SubjectType};
pub use error::{Result, TimetableError};
pub use normalizer::{Normalizer, normalize};
pub use timetable::{ImportMode, ImportReport, MoveOutcome, Timetable, UpsertOutcome};
