//! Column classification and honor label normalization
//!
//! Registration exports carry a handful of fixed metadata columns (names, club,
//! grade, shirt size) followed by one column per honor time slot. Honor columns
//! are recognised purely from their header text, so every heuristic used for
//! that lives in a named table below.

use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;

// ============================================================================
// Heuristic tables
// ============================================================================

/// Headers starting with this (case-insensitive) are meal breaks, not honors.
pub const LUNCH_PREFIX: &str = "lunch";

/// Instructional text the registration form embeds in honor column headers.
pub const BOILERPLATE_PHRASES: &[&str] = &[
    "Click on time to see options for honors",
    "Click on the time to see options for honors",
];

/// Most honors printed for one attendee; later slots by time are dropped.
pub const MAX_SCHEDULE_ITEMS: usize = 9;

/// Headers starting with this prefix hold a Planning Center assignment area,
/// e.g. `Assignment Area: Pathfinders`.
pub const ASSIGNMENT_AREA_PREFIX: &str = "assignment area";

/// Known metadata columns and the header spellings accepted for each.
pub const METADATA_ALIASES: &[(MetaField, &[&str])] = &[
    (MetaField::FirstName, &["first name", "firstname", "first"]),
    (MetaField::LastName, &["last name", "lastname", "last", "surname"]),
    (MetaField::Club, &["club", "club name"]),
    (MetaField::Grade, &["grade", "school grade", "class"]),
    (MetaField::Group, &["group", "group name"]),
    (
        MetaField::ShirtSize,
        &["shirt size", "t-shirt size", "tshirt size", "shirt"],
    ),
];

lazy_static! {
    /// `H:MM` with an optional AM/PM marker (`am`, `PM`, `p.m.`).
    pub static ref TIME_PATTERN: Regex =
        Regex::new(r"(?i)\b(\d{1,2}):(\d{2})(?:\s*([ap])\.?\s*m\b\.?)?").unwrap();

    static ref BOILERPLATE_PATTERNS: Vec<Regex> = BOILERPLATE_PHRASES
        .iter()
        .map(|phrase| Regex::new(&format!("(?i){}", regex::escape(phrase))).unwrap())
        .collect();

    static ref EMPTY_BRACKETS: Regex = Regex::new(r"\(\s*\)|\[\s*\]").unwrap();
}

/// Separator characters trimmed from both ends of a cleaned label.
const LABEL_SEPARATORS: &[char] = &['-', '\u{2013}', '\u{2014}', ':', '|', ',', ';'];

// ============================================================================
// Metadata fields
// ============================================================================

/// A fixed, known column of the registration export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetaField {
    FirstName,
    LastName,
    Club,
    Grade,
    Group,
    ShirtSize,
    AssignmentArea,
}

impl MetaField {
    /// Match a header against the alias table.
    pub fn from_header(header: &str) -> Option<MetaField> {
        let normalized = normalize_header(header);
        if normalized.starts_with(ASSIGNMENT_AREA_PREFIX) {
            return Some(MetaField::AssignmentArea);
        }
        METADATA_ALIASES
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|alias| *alias == normalized))
            .map(|(field, _)| *field)
    }

    pub fn label(self) -> &'static str {
        match self {
            MetaField::FirstName => "First Name",
            MetaField::LastName => "Last Name",
            MetaField::Club => "Club",
            MetaField::Grade => "Grade",
            MetaField::Group => "Group",
            MetaField::ShirtSize => "Shirt Size",
            MetaField::AssignmentArea => "Assignment Area",
        }
    }
}

fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ============================================================================
// Time slots
// ============================================================================

/// A time-of-day token taken from an honor column header.
///
/// `label` is the display text (`9:00 AM`); `minutes` is minutes from midnight,
/// or `None` when the token could not be read as a clock time. Unparsed slots
/// order after every valid one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimeSlot {
    pub label: String,
    pub minutes: Option<u32>,
}

impl TimeSlot {
    /// Ordering key: valid times by minute of day, then unparsed ones.
    pub fn sort_key(&self) -> (bool, u32) {
        (self.minutes.is_none(), self.minutes.unwrap_or(0))
    }
}

impl Ord for TimeSlot {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl PartialOrd for TimeSlot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Minutes from midnight for the first time token in `text`.
///
/// `12 AM` is midnight and `12 PM` is noon. Without a marker the hour is read
/// on a 24-hour clock. Returns `None` for anything out of range.
pub fn time_order(text: &str) -> Option<u32> {
    let caps = TIME_PATTERN.captures(text)?;
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
    if minute > 59 {
        return None;
    }
    let marker = caps
        .get(3)
        .map(|m| m.as_str().to_ascii_lowercase());
    let hour24 = match marker.as_deref() {
        Some("a") if (1..=12).contains(&hour) => hour % 12,
        Some("p") if (1..=12).contains(&hour) => hour % 12 + 12,
        Some(_) => return None,
        None if hour <= 23 => hour,
        None => return None,
    };
    Some(hour24 * 60 + minute)
}

fn time_slot_from_match(caps: &regex::Captures) -> TimeSlot {
    let raw = caps.get(0).map(|m| m.as_str().trim()).unwrap_or("");
    let minutes = time_order(raw);
    let label = match (minutes, caps.get(3)) {
        (Some(_), Some(marker)) => {
            let hour: u32 = caps[1].parse().unwrap_or(0);
            let suffix = if marker.as_str().eq_ignore_ascii_case("a") {
                "AM"
            } else {
                "PM"
            };
            format!("{}:{} {}", hour, &caps[2], suffix)
        }
        (Some(_), None) => {
            let hour: u32 = caps[1].parse().unwrap_or(0);
            format!("{}:{}", hour, &caps[2])
        }
        (None, _) => raw.to_string(),
    };
    TimeSlot { label, minutes }
}

/// Split an honor column header into its time slot and cleaned honor label.
///
/// Returns `None` when the header has no time token at all. The label may be
/// empty when the header carries nothing but a time and boilerplate.
pub fn extract_time_slot(header: &str) -> Option<(TimeSlot, String)> {
    let caps = TIME_PATTERN.captures(header)?;
    let whole = caps.get(0)?;
    let slot = time_slot_from_match(&caps);
    let rest = format!("{} {}", &header[..whole.start()], &header[whole.end()..]);
    Some((slot, clean_column_name(&rest)))
}

/// Strip boilerplate phrases and stray separators from a column label.
pub fn clean_column_name(name: &str) -> String {
    let mut cleaned = name.to_string();
    for pattern in BOILERPLATE_PATTERNS.iter() {
        cleaned = pattern.replace_all(&cleaned, " ").into_owned();
    }
    let cleaned = EMPTY_BRACKETS.replace_all(&cleaned, " ");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || LABEL_SEPARATORS.contains(&c))
        .to_string()
}

// ============================================================================
// Classification
// ============================================================================

/// True for meal-break columns, checked on the raw header and on the label
/// left after removing the time token.
pub fn is_lunch_column(header: &str) -> bool {
    if normalize_header(header).starts_with(LUNCH_PREFIX) {
        return true;
    }
    extract_time_slot(header)
        .map(|(_, label)| label.to_lowercase().starts_with(LUNCH_PREFIX))
        .unwrap_or(false)
}

/// True if the header names an honor time slot.
pub fn is_honor_column(header: &str) -> bool {
    TIME_PATTERN.is_match(header) && !is_lunch_column(header)
}

/// An honor-slot column with its parsed time and label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HonorColumn {
    pub index: usize,
    pub header: String,
    pub time: TimeSlot,
    /// Honor name from the header; empty when the cell value names the honor.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    Metadata(MetaField),
    HonorSlot(HonorColumn),
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedColumn {
    pub header: String,
    pub kind: ColumnKind,
}

/// Classify a single header. Metadata aliases win over the time heuristic.
pub fn classify_column(index: usize, header: &str) -> ColumnKind {
    if let Some(field) = MetaField::from_header(header) {
        return ColumnKind::Metadata(field);
    }
    if !is_honor_column(header) {
        return ColumnKind::Ignored;
    }
    match extract_time_slot(header) {
        Some((time, label)) => ColumnKind::HonorSlot(HonorColumn {
            index,
            header: header.to_string(),
            time,
            label,
        }),
        None => ColumnKind::Ignored,
    }
}

/// Classification of every column of one file, derived once from the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<ClassifiedColumn>,
    metadata: HashMap<MetaField, usize>,
}

impl ColumnLayout {
    pub fn columns(&self) -> &[ClassifiedColumn] {
        &self.columns
    }

    /// Header of the column holding `field`, if the file has one.
    pub fn metadata_header(&self, field: MetaField) -> Option<&str> {
        self.metadata
            .get(&field)
            .map(|&idx| self.columns[idx].header.as_str())
    }

    pub fn honor_columns(&self) -> impl Iterator<Item = &HonorColumn> {
        self.columns.iter().filter_map(|c| match &c.kind {
            ColumnKind::HonorSlot(honor) => Some(honor),
            _ => None,
        })
    }

    pub fn ignored_headers(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Ignored)
            .map(|c| c.header.as_str())
    }

    /// Look up a column by header, exact match first, then case-insensitive.
    pub fn find(&self, header: &str) -> Option<&ClassifiedColumn> {
        let wanted = header.trim();
        self.columns
            .iter()
            .find(|c| c.header == wanted)
            .or_else(|| {
                let wanted = normalize_header(wanted);
                self.columns
                    .iter()
                    .find(|c| normalize_header(&c.header) == wanted)
            })
    }
}

/// Partition a header row into metadata, honor-slot and ignored columns.
///
/// A metadata field that appears twice keeps its first column; later copies
/// are ignored.
pub fn classify_columns(headers: &[String]) -> ColumnLayout {
    let mut layout = ColumnLayout::default();
    for (index, header) in headers.iter().enumerate() {
        let mut kind = classify_column(index, header);
        if let ColumnKind::Metadata(field) = kind {
            if layout.metadata.contains_key(&field) {
                log::debug!("Duplicate {} column '{}' ignored", field.label(), header);
                kind = ColumnKind::Ignored;
            } else {
                layout.metadata.insert(field, index);
            }
        }
        layout.columns.push(ClassifiedColumn {
            header: header.clone(),
            kind,
        });
    }
    log::debug!(
        "Classified {} columns: {} metadata, {} honor slots",
        layout.columns.len(),
        layout.metadata.len(),
        layout.honor_columns().count()
    );
    layout
}
