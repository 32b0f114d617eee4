//! Teacher-name normalization.
//!
//! Spreadsheet cells carry free text such as `"Dr.Ahmad B202 LAB"` or
//! `"/Ms.Asina (online)"`. The normalizer collapses them into a canonical
//! display name (`"Dr. Ahmad"`, `"Ms. Asina"`) by running an ordered list of
//! rewrite rules followed by an alias lookup for known misspellings.

use lazy_static::lazy_static;
use regex::Regex;
use log::warn;
use std::collections::{HashMap, HashSet};

/// Room identifiers that show up glued to teacher names.
///
/// Covers building/room numbers (`B201`, `A12`), labs (`LAB`, `LAB3`,
/// `LAB2(1)`, `BIGLAB`), online markers (`LINK`, `WEB`) and the same codes
/// typed on a Cyrillic keyboard layout (`В201`, `А12`, `ЛАБ`).
///
/// Codes with digits match in any case. Plain words only match in capitals,
/// so surnames like `Link` or `Web` survive.
const ROOM_TOKEN: &str = r"(?:(?i:[AB]\d+[A-Za-z]?|LAB\d+(?:\(\d+\))?|[АВ]\d+[А-Яа-я]?|ЛАБ\d+)|BIGLAB|LAB(?:\(\d+\))?|LINK|WEB|ЛАБ)";

/// Honorifics recognised at the start of a name, longest first.
const TITLE_TOKEN: &str = r"(prof|mrs|mr|ms|dr)";

lazy_static! {
    static ref LEADING_NOISE: Regex = Regex::new(r"^[\s/]+").unwrap();
    static ref PARENTHETICAL: Regex = Regex::new(r"\s*\([^()]*\)\s*$").unwrap();
    static ref UNTIL_TAIL: Regex = Regex::new(r"(?i)\s*\buntil\b.*$").unwrap();
    static ref DEVICE_TAIL: Regex =
        Regex::new(r"(?i)\s*\b(?:own\s+device|make[\s-]*up)\b.*$").unwrap();
    static ref SLASH_SEGMENT: Regex = Regex::new(r"\s*/[^/]*$").unwrap();
    static ref ROOM_SUFFIX: Regex =
        Regex::new(&format!(r"[\s,.\-]+{}[\s,.;:]*$", ROOM_TOKEN)).unwrap();
    static ref PLUS_TAIL: Regex = Regex::new(r"\s*\+.*$").unwrap();
    static ref COMMA_ROOM: Regex = Regex::new(r"\s*,\s*[^,]*\d[^,]*$").unwrap();
    static ref TRAILING_PUNCT: Regex = Regex::new(r"[\s,;:.\-_]+$").unwrap();
    static ref TITLE: Regex =
        Regex::new(&format!(r"(?i)^{}(?:\s*\.\s*|\s+)(\S.*)$", TITLE_TOKEN)).unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref BARE_ROOM: Regex = Regex::new(&format!(r"^{}$", ROOM_TOKEN)).unwrap();
    static ref BARE_TITLE: Regex = Regex::new(&format!(r"(?i)^{}\.?$", TITLE_TOKEN)).unwrap();
    static ref DEFAULT_NORMALIZER: Normalizer = Normalizer::default();
}

/// Known misspellings and short forms, keyed by their normalized lower-case
/// spelling.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("dr. ahmed", "Dr. Ahmad"),
    ("dr. ahmd", "Dr. Ahmad"),
    ("ms. asena", "Ms. Asina"),
    ("ms. aseena", "Ms. Asina"),
    ("dr. moh", "Dr. Mohammad"),
    ("dr. mohamed", "Dr. Mohammad"),
    ("dr. mohammed", "Dr. Mohammad"),
    ("mr. yousef", "Mr. Yousuf"),
    ("mr. yusuf", "Mr. Yousuf"),
];

/// A single named rewrite step of the normalization pipeline.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&str) -> String,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

const RULES: &[Rule] = &[
    Rule {
        name: "leading_noise",
        apply: strip_leading_noise,
    },
    Rule {
        name: "first_of_many",
        apply: cut_at_first_slash,
    },
    Rule {
        name: "parenthetical",
        apply: strip_parenthetical,
    },
    Rule {
        name: "note_tail",
        apply: strip_note_tail,
    },
    Rule {
        name: "slash_segment",
        apply: strip_slash_segment,
    },
    Rule {
        name: "room_suffixes",
        apply: strip_room_suffixes,
    },
    Rule {
        name: "trailing_junk",
        apply: strip_trailing_junk,
    },
    Rule {
        name: "title",
        apply: canonical_title,
    },
    Rule {
        name: "whitespace",
        apply: collapse_whitespace,
    },
    Rule {
        name: "bare_token",
        apply: drop_bare_token,
    },
];

/// The rewrite rules in application order. The alias lookup runs after them.
pub fn rules() -> &'static [Rule] {
    RULES
}

/// Trims and drops leading slashes: `"/Ms.Asina"` -> `"Ms.Asina"`.
fn strip_leading_noise(s: &str) -> String {
    LEADING_NOISE.replace(s.trim(), "").into_owned()
}

/// Multi-teacher cells keep only the first name.
fn cut_at_first_slash(s: &str) -> String {
    match s.find('/') {
        Some(pos) => s[..pos].to_string(),
        None => s.to_string(),
    }
}

/// Drops stacked trailing notes: `"Dr. X (online) (B2)"` -> `"Dr. X"`.
fn strip_parenthetical(s: &str) -> String {
    let mut current = s.to_string();
    loop {
        let next = PARENTHETICAL.replace(&current, "").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Removes `until <time>`, `own device` and `make up` notes and whatever follows.
fn strip_note_tail(s: &str) -> String {
    let s = UNTIL_TAIL.replace(s, "");
    DEVICE_TAIL.replace(&s, "").into_owned()
}

fn strip_slash_segment(s: &str) -> String {
    SLASH_SEGMENT.replace(s, "").into_owned()
}

/// Peels stacked room codes off the end until none is left.
///
/// A room code standing alone is kept here and dropped by the bare-token rule.
fn strip_room_suffixes(s: &str) -> String {
    let mut current = s.to_string();
    loop {
        let next = ROOM_SUFFIX.replace(&current, "").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Removes `+...` tails, `, <room>` fragments and trailing punctuation.
fn strip_trailing_junk(s: &str) -> String {
    let s = PLUS_TAIL.replace(s, "");
    let s = COMMA_ROOM.replace(&s, "");
    TRAILING_PUNCT.replace(&s, "").into_owned()
}

/// `"dr.ahmad"`, `"DR . Ahmad"` and `"Dr Ahmad"` all become `"Dr. Ahmad"`.
///
/// A title must be followed by a dot or whitespace, so `"Drew"` is left alone.
fn canonical_title(s: &str) -> String {
    match TITLE.captures(s) {
        Some(caps) => {
            let title = match caps[1].to_lowercase().as_str() {
                "prof" => "Prof",
                "mrs" => "Mrs",
                "mr" => "Mr",
                "ms" => "Ms",
                _ => "Dr",
            };
            format!("{}. {}", title, &caps[2])
        }
        None => s.to_string(),
    }
}

fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// A cell that held only a room code or only a title is not a teacher.
fn drop_bare_token(s: &str) -> String {
    if BARE_ROOM.is_match(s) || BARE_TITLE.is_match(s) {
        String::new()
    } else {
        s.to_string()
    }
}

/// Maps raw teacher strings to canonical display names.
///
/// Holds the alias table; the rewrite rules themselves are shared statics.
#[derive(Clone, Debug)]
pub struct Normalizer {
    aliases: HashMap<String, String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        let aliases = BUILTIN_ALIASES
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        Normalizer { aliases }
    }
}

impl Normalizer {
    /// Normalizer with no alias table at all.
    pub fn without_aliases() -> Self {
        Normalizer {
            aliases: HashMap::new(),
        }
    }

    /// Adds extra aliases on top of the current table.
    ///
    /// Both sides are run through the rewrite rules first, so keys may be
    /// given in raw spreadsheet form (`"Dr.Ahmed B201"`).
    pub fn with_aliases<I, K, V>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (from, to) in aliases {
            let key = clean(from.as_ref()).to_lowercase();
            let value = clean(to.as_ref());
            if key.is_empty() || value.is_empty() {
                continue;
            }
            if self.leads_to(&value.to_lowercase(), &key) {
                warn!("alias {:?} -> {:?} would form a cycle, ignored", key, value);
                continue;
            }
            self.aliases.insert(key, value);
        }
        self
    }

    /// True when following aliases from `start` reaches `target`.
    fn leads_to(&self, start: &str, target: &str) -> bool {
        let mut current = start.to_string();
        let mut seen = HashSet::new();
        while let Some(next) = self.aliases.get(&current) {
            let next = next.to_lowercase();
            if !seen.insert(current.clone()) || next == current {
                return false;
            }
            if next == target {
                return true;
            }
            current = next;
        }
        false
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }

    /// Canonical display name for `raw`, or `""` if nothing name-like remains.
    ///
    /// The rule sequence is repeated until the output stops changing, which
    /// makes `normalize(normalize(x)) == normalize(x)`.
    pub fn normalize(&self, raw: &str) -> String {
        fixpoint(raw, |s| self.single_pass(s))
    }

    /// Case-insensitive identity used for deduplication and matching.
    pub fn identity(&self, raw: &str) -> String {
        self.normalize(raw).to_lowercase()
    }

    fn single_pass(&self, raw: &str) -> String {
        let cleaned = apply_rules(raw);
        match self.aliases.get(&cleaned.to_lowercase()) {
            Some(canonical) => canonical.clone(),
            None => cleaned,
        }
    }
}

/// Repeats `step` until the output stops changing.
///
/// Rules never grow a string past its canonical title form, and alias
/// chains are acyclic, so this settles; a repeated state stops it anyway.
fn fixpoint(raw: &str, step: impl Fn(&str) -> String) -> String {
    let mut current = raw.to_string();
    let mut seen = HashSet::new();
    loop {
        let next = step(&current);
        if next == current || !seen.insert(current.clone()) {
            return next;
        }
        current = next;
    }
}

/// The rewrite rules alone, run to a fixpoint.
fn clean(raw: &str) -> String {
    fixpoint(raw, apply_rules)
}

fn apply_rules(raw: &str) -> String {
    RULES
        .iter()
        .fold(raw.to_string(), |acc, rule| (rule.apply)(&acc))
}

/// Normalizes a teacher string with the built-in alias table.
///
/// # Examples
/// ```
/// use timetable::normalizer::normalize;
///
/// assert_eq!(normalize("Dr.Ahmad B202 LAB"), "Dr. Ahmad");
/// assert_eq!(normalize("/Ms.Asina"), "Ms. Asina");
/// assert_eq!(normalize("B201"), "");
/// ```
pub fn normalize(raw: &str) -> String {
    DEFAULT_NORMALIZER.normalize(raw)
}

/// Shared normalizer carrying the built-in aliases.
pub fn default_normalizer() -> &'static Normalizer {
    &DEFAULT_NORMALIZER
}
