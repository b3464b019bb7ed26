//! Pipeline functions for programmatic use by the CLI.
//!
//! A [`ReportSession`] holds everything derived from one loaded CSV file. It is
//! never modified: loading another file builds a new session, and
//! [`ReportWorkspace`] swaps it in only once the load has succeeded.

use crate::columns::{ColumnKind, MetaField};
use crate::grouping::{group_entries, Group, GroupOrder};
use crate::render::{
    render_cards, render_sheets, CardOptions, Document, DocumentInfo, SheetOptions,
};
use crate::roster::{build_roster, parse_csv, read_csv_file, Attendee, Roster};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Organization name shown in report headings.
pub const ORGANIZATION: &str = "Pathfinders";

/// Group name for attendees with no value in the grouping column.
pub const UNASSIGNED_GROUP: &str = "Unassigned";

/// Group name used when the file has no grouping column at all.
pub const ALL_ATTENDEES_GROUP: &str = "All Attendees";

pub const DEFAULT_ROWS_PER_PAGE: usize = 25;

// ============================================================================
// Report configuration
// ============================================================================

/// The printable reports that can be generated from one registration export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// One sheet per grade/class with write-in rows
    AttendanceSheets,
    /// One sheet per honor session (time slot + honor)
    HonorDay,
    /// Four schedule cards per page, one per attendee
    StudentCards,
}

impl ReportKind {
    pub fn report_name(self) -> &'static str {
        match self {
            ReportKind::AttendanceSheets => "Attendance Sheets",
            ReportKind::HonorDay => "Honor Day Attendance",
            ReportKind::StudentCards => "Honor Day Student Cards",
        }
    }

    pub fn heading(self) -> String {
        format!("{} - {}", self.report_name(), ORGANIZATION)
    }

    fn default_write_in_rows(self) -> usize {
        match self {
            ReportKind::AttendanceSheets => 5,
            ReportKind::HonorDay => 3,
            ReportKind::StudentCards => 0,
        }
    }
}

/// Configuration for generating one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub kind: ReportKind,
    /// Date printed in footers and embedded in the title
    pub print_date: NaiveDate,
    /// Blank write-in rows after each sheet group
    pub write_in_rows: usize,
    /// Rows per printed sheet page; 0 keeps each group on one page
    pub rows_per_page: usize,
    /// Print the shirt check box on sheets
    pub show_shirt: bool,
    /// Column to group attendance sheets by (default: assignment area, grade, group, club)
    pub group_column: Option<String>,
    /// Start each club's cards on a new page
    pub page_per_club: bool,
}

impl ReportConfig {
    pub fn new(kind: ReportKind, print_date: NaiveDate) -> Self {
        Self {
            kind,
            print_date,
            write_in_rows: kind.default_write_in_rows(),
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
            show_shirt: true,
            group_column: None,
            page_per_club: false,
        }
    }

    /// Config dated today.
    pub fn today(kind: ReportKind) -> Self {
        Self::new(kind, Local::now().date_naive())
    }

    fn document_info(&self) -> DocumentInfo {
        DocumentInfo {
            report_name: self.kind.report_name().to_string(),
            heading: self.kind.heading(),
            print_date: self.print_date,
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// Reject anything but a `.csv` file before reading it.
pub fn ensure_csv_extension(path: &Path) -> Result<()> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if !is_csv {
        bail!("{} is not a .csv file", path.display());
    }
    Ok(())
}

/// Everything derived from one loaded CSV file.
#[derive(Debug, Clone)]
pub struct ReportSession {
    source: PathBuf,
    roster: Roster,
    loaded_at: DateTime<Local>,
}

impl ReportSession {
    /// Read and parse a CSV export.
    pub fn load(path: &Path) -> Result<Self> {
        ensure_csv_extension(path)?;
        let table = read_csv_file(path)?;
        log::info!(
            "Read {} ({} columns, {} rows)",
            path.display(),
            table.headers.len(),
            table.rows.len()
        );
        Ok(Self {
            source: path.to_path_buf(),
            roster: build_roster(&table),
            loaded_at: Local::now(),
        })
    }

    /// Build a session from CSV text already in memory.
    pub fn from_text(source: impl Into<PathBuf>, text: &str) -> Self {
        Self {
            source: source.into(),
            roster: build_roster(&parse_csv(text)),
            loaded_at: Local::now(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn loaded_at(&self) -> DateTime<Local> {
        self.loaded_at
    }

    /// Group, sort and render one report from this session's data.
    pub fn generate(&self, config: &ReportConfig) -> Result<Document> {
        let info = config.document_info();
        match config.kind {
            ReportKind::AttendanceSheets => {
                let groups = attendance_groups(&self.roster, config.group_column.as_deref())?;
                render_sheets(
                    &groups,
                    &SheetOptions {
                        info,
                        write_in_rows: config.write_in_rows,
                        rows_per_page: config.rows_per_page,
                        show_shirt: config.show_shirt,
                        show_club: false,
                    },
                )
            }
            ReportKind::HonorDay => {
                let groups = honor_sessions(&self.roster);
                render_sheets(
                    &groups,
                    &SheetOptions {
                        info,
                        write_in_rows: config.write_in_rows,
                        rows_per_page: config.rows_per_page,
                        show_shirt: config.show_shirt,
                        show_club: true,
                    },
                )
            }
            ReportKind::StudentCards => {
                let groups = club_groups(&self.roster);
                render_cards(
                    &groups,
                    &CardOptions {
                        info,
                        page_per_group: config.page_per_club,
                    },
                )
            }
        }
    }
}

/// Holds the currently loaded session, if any.
#[derive(Debug, Default)]
pub struct ReportWorkspace {
    current: Option<ReportSession>,
}

impl ReportWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a file and make it the current session. On failure the previous
    /// session stays in place.
    pub fn load(&mut self, path: &Path) -> Result<&ReportSession> {
        let session = ReportSession::load(path)?;
        Ok(&*self.current.insert(session))
    }

    pub fn current(&self) -> Option<&ReportSession> {
        self.current.as_ref()
    }

    /// Drop the loaded session.
    pub fn reset(&mut self) {
        if let Some(session) = self.current.take() {
            log::debug!("Discarded session for {}", session.source().display());
        }
    }
}

// ============================================================================
// Grouping per report
// ============================================================================

/// Default grouping columns for attendance sheets, in preference order.
const ATTENDANCE_GROUP_FIELDS: &[MetaField] = &[
    MetaField::AssignmentArea,
    MetaField::Grade,
    MetaField::Group,
    MetaField::Club,
];

/// Attendees grouped by grade/class for attendance sheets.
///
/// With an assignment area column, attendees with no value there are not in
/// the area and are left off. Any other blank group value goes to
/// [`UNASSIGNED_GROUP`].
pub fn attendance_groups<'a>(
    roster: &'a Roster,
    group_column: Option<&str>,
) -> Result<Vec<Group<&'a Attendee>>> {
    let layout = &roster.layout;
    let column = match group_column {
        Some(name) => Some(
            layout
                .find(name)
                .ok_or_else(|| anyhow!("Column '{}' not found in CSV", name))?,
        ),
        None => ATTENDANCE_GROUP_FIELDS
            .iter()
            .find_map(|field| layout.metadata_header(*field))
            .and_then(|header| layout.find(header)),
    };

    let Some(column) = column else {
        log::warn!("No grouping column found; printing everyone as one group");
        let entries = roster
            .attendees
            .iter()
            .map(|a| (ALL_ATTENDEES_GROUP.to_string(), a));
        return Ok(group_entries(entries, GroupOrder::Encounter));
    };

    let (order, skip_blank) = match column.kind {
        ColumnKind::Metadata(MetaField::Club) => (GroupOrder::Encounter, false),
        ColumnKind::Metadata(MetaField::AssignmentArea) => (GroupOrder::Grades, true),
        _ => (GroupOrder::Grades, false),
    };
    log::debug!("Grouping attendance sheets by '{}'", column.header);

    let mut outside = 0usize;
    let mut entries = Vec::with_capacity(roster.attendees.len());
    for attendee in &roster.attendees {
        let value = attendee.column_value(layout, &column.header);
        if value.is_empty() {
            if skip_blank {
                outside += 1;
                continue;
            }
            entries.push((UNASSIGNED_GROUP.to_string(), attendee));
        } else {
            entries.push((value.to_string(), attendee));
        }
    }
    if outside > 0 {
        log::info!("{} attendees have no '{}' value and were left off", outside, column.header);
    }
    Ok(group_entries(entries, order))
}

/// Name of an honor session group, e.g. `9:00 AM - Basic Rescue`.
pub fn session_name(time_label: &str, honor: &str) -> String {
    format!("{} - {}", time_label, honor)
}

/// Attendees grouped by honor session, in time order.
///
/// Sessions at the same time are ordered by honor name.
pub fn honor_sessions(roster: &Roster) -> Vec<Group<&Attendee>> {
    let mut entries: Vec<_> = roster
        .attendees
        .iter()
        .flat_map(|attendee| attendee.schedule.iter().map(move |item| (item, attendee)))
        .collect();
    entries.sort_by(|(a, _), (b, _)| {
        a.time
            .sort_key()
            .cmp(&b.time.sort_key())
            .then_with(|| a.honor.to_lowercase().cmp(&b.honor.to_lowercase()))
            .then_with(|| a.honor.cmp(&b.honor))
    });
    let entries = entries
        .into_iter()
        .map(|(item, attendee)| (session_name(&item.time.label, &item.honor), attendee));
    group_entries(entries, GroupOrder::TimeOfDay)
}

/// Attendees grouped by club, clubs in file order. Attendees with no club
/// come last.
pub fn club_groups(roster: &Roster) -> Vec<Group<&Attendee>> {
    let entries = roster.attendees.iter().map(|a| (a.club.clone(), a));
    group_entries(entries, GroupOrder::Encounter)
}

// ============================================================================
// Output
// ============================================================================

/// `<title>.html` next to the input file.
pub fn default_output_path(input: &Path, title: &str) -> PathBuf {
    input.with_file_name(format!("{}.html", title))
}

pub fn write_document(document: &Document, output: &Path) -> Result<()> {
    std::fs::write(output, &document.html)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    log::info!("Wrote {} ({} pages)", output.display(), document.pages);
    Ok(())
}

#[derive(Debug, Serialize)]
struct RosterExportRow<'a> {
    #[serde(rename = "First Name")]
    first_name: &'a str,
    #[serde(rename = "Last Name")]
    last_name: &'a str,
    #[serde(rename = "Club")]
    club: &'a str,
    #[serde(rename = "Grade")]
    grade: &'a str,
    #[serde(rename = "Shirt Size")]
    shirt_size: &'a str,
    #[serde(rename = "Time")]
    time: &'a str,
    #[serde(rename = "Honor")]
    honor: &'a str,
    #[serde(rename = "Selection")]
    selection: &'a str,
}

/// Write the normalized roster as CSV, one row per schedule item (one row
/// with blank honor fields for attendees without a schedule). Attendees are
/// grouped by club and sorted by name. Returns the number of rows written.
pub fn export_roster(roster: &Roster, output: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(output).context("Failed to create output CSV")?;
    let mut rows = 0usize;
    for group in club_groups(roster) {
        for attendee in group.members {
            let base = RosterExportRow {
                first_name: &attendee.first_name,
                last_name: &attendee.last_name,
                club: &attendee.club,
                grade: &attendee.grade,
                shirt_size: &attendee.shirt_size,
                time: "",
                honor: "",
                selection: "",
            };
            if attendee.schedule.is_empty() {
                writer.serialize(&base)?;
                rows += 1;
                continue;
            }
            for item in &attendee.schedule {
                writer.serialize(RosterExportRow {
                    time: &item.time.label,
                    honor: &item.honor,
                    selection: &item.selection,
                    ..base
                })?;
                rows += 1;
            }
        }
    }
    writer.flush()?;
    Ok(rows)
}

/// Human-readable summary of how a file's columns were classified.
pub fn describe_layout(session: &ReportSession) -> Result<String> {
    let roster = session.roster();
    let mut out = String::new();
    writeln!(out, "File: {}", session.source().display())?;
    writeln!(
        out,
        "Attendees: {} ({} rows without a name skipped)",
        roster.len(),
        roster.skipped_rows
    )?;
    writeln!(out)?;
    writeln!(out, "{:<6} {:<16} Header", "Column", "Kind")?;
    writeln!(out, "{:-<60}", "")?;
    for (idx, column) in roster.layout.columns().iter().enumerate() {
        let kind = match &column.kind {
            ColumnKind::Metadata(field) => field.label().to_string(),
            ColumnKind::HonorSlot(honor) if honor.label.is_empty() => {
                format!("Honor {}", honor.time.label)
            }
            ColumnKind::HonorSlot(honor) => format!("Honor {} ({})", honor.time.label, honor.label),
            ColumnKind::Ignored => "ignored".to_string(),
        };
        writeln!(out, "{:<6} {:<16} {}", idx + 1, kind, column.header)?;
    }

    let sessions = honor_sessions(roster);
    if !sessions.is_empty() {
        writeln!(out)?;
        writeln!(out, "Honor sessions:")?;
        for session in &sessions {
            writeln!(out, "  {:<40} {:>4}", session.name, session.members.len())?;
        }
    }
    Ok(out)
}
