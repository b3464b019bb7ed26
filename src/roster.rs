//! CSV parsing and typed attendee records
//!
//! `parse_csv` turns raw export text into row records keyed by header, and
//! `build_roster` classifies the header once and converts every row into an
//! [`Attendee`] with its honor schedule.

use crate::columns::{classify_columns, ColumnKind, ColumnLayout, MetaField, TimeSlot};
use crate::grouping::limit_schedule;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

// ============================================================================
// CSV Parser
// ============================================================================

/// One data line of the CSV, keyed by (unique, trimmed) header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowRecord {
    /// 1-based line number in the source text where the record starts
    pub line: usize,
    values: BTreeMap<String, String>,
}

impl RowRecord {
    pub fn get(&self, header: &str) -> Option<&str> {
        self.values.get(header).map(|v| v.as_str())
    }

    /// Cell value, or an empty string when the column is missing.
    pub fn value(&self, header: &str) -> &str {
        self.get(header).unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parsed CSV: the header row plus every non-empty data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<RowRecord>,
}

/// Make header names unique: blanks become `Column N`, repeats get ` (2)`, ` (3)`...
fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::new();
    for (idx, header) in raw.enumerate() {
        let base = if header.is_empty() {
            format!("Column {}", idx + 1)
        } else {
            header.to_string()
        };
        let mut name = base.clone();
        let mut n = 2;
        while seen.contains(&name) {
            name = format!("{} ({})", base, n);
            n += 1;
        }
        seen.insert(name.clone());
        headers.push(name);
    }
    headers
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Byte offset of a quote that opens a field and is never closed, if any.
///
/// Follows the reader's quoting rules: a quote only opens a field when it is
/// the field's first byte, and `""` inside a quoted field is a literal quote.
fn unterminated_quote(text: &str) -> Option<usize> {
    let mut state = QuoteState::FieldStart;
    let mut opened_at = 0;
    for (offset, byte) in text.bytes().enumerate() {
        let separator = matches!(byte, b',' | b'\n' | b'\r');
        state = match (state, byte) {
            (QuoteState::FieldStart, b'"') => {
                opened_at = offset;
                QuoteState::Quoted
            }
            (QuoteState::Quoted, b'"') => QuoteState::QuoteInQuoted,
            (QuoteState::Quoted, _) => QuoteState::Quoted,
            (QuoteState::QuoteInQuoted, b'"') => QuoteState::Quoted,
            (_, _) if separator => QuoteState::FieldStart,
            (_, _) => QuoteState::Unquoted,
        };
    }
    (state == QuoteState::Quoted).then_some(opened_at)
}

/// Blank out every line that opens a quote it never closes, so the reader does
/// not fold the rest of the file into one field. Line numbers are preserved.
fn drop_unterminated_quotes(text: &str) -> Cow<'_, str> {
    let mut text = Cow::Borrowed(text);
    while let Some(offset) = unterminated_quote(&text) {
        let start = text[..offset].rfind('\n').map_or(0, |pos| pos + 1);
        let end = text[offset..]
            .find(|c: char| c == '\r' || c == '\n')
            .map_or(text.len(), |pos| offset + pos);
        let line = text[..start].matches('\n').count() + 1;
        log::warn!("Line {}: skipping record with an unterminated quote", line);

        let mut repaired = String::with_capacity(text.len());
        repaired.push_str(&text[..start]);
        repaired.push_str(&text[end..]);
        text = Cow::Owned(repaired);
    }
    text
}

/// Parse CSV text using the first line as the header.
///
/// Quoted fields may contain commas, doubled quotes and newlines. Whitespace
/// around headers and values is trimmed, including padding inside quotes.
/// Blank lines and lines holding only separators are skipped. A row that
/// cannot be decoded, or that opens a quote it never closes, is logged and
/// skipped instead of failing the whole parse.
pub fn parse_csv(text: &str) -> CsvTable {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let text = drop_unterminated_quotes(text);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = match reader.headers() {
        Ok(record) => unique_headers(record.iter()),
        Err(e) => {
            log::warn!("Could not read CSV header: {}", e);
            return CsvTable::default();
        }
    };
    if headers.is_empty() {
        return CsvTable::default();
    }

    let mut rows = Vec::new();
    for (row_num, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Row {}: skipping malformed CSV record: {}", row_num + 1, e);
                continue;
            }
        };
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(row_num + 2);
        let mut values = BTreeMap::new();
        for (idx, header) in headers.iter().enumerate() {
            values.insert(header.clone(), record.get(idx).unwrap_or("").to_string());
        }
        for (idx, field) in record.iter().enumerate().skip(headers.len()) {
            if !field.is_empty() {
                log::debug!("Line {}: extra field {} outside the header", line, idx + 1);
                values.insert(format!("Column {}", idx + 1), field.to_string());
            }
        }
        rows.push(RowRecord { line, values });
    }

    log::debug!("Parsed {} columns, {} rows", headers.len(), rows.len());
    CsvTable { headers, rows }
}

/// Read a whole CSV file into memory and parse it.
pub fn read_csv_file(path: &Path) -> Result<CsvTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(parse_csv(&text))
}

// ============================================================================
// Typed records
// ============================================================================

/// One honor on an attendee's schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleItem {
    pub time: TimeSlot,
    pub honor: String,
    /// Raw cell value the attendee entered for this slot
    pub selection: String,
    /// Column index of the slot in the source header
    pub column: usize,
}

/// A registered attendee built from one data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attendee {
    pub first_name: String,
    pub last_name: String,
    pub club: String,
    pub grade: String,
    pub group: String,
    pub shirt_size: String,
    pub assignment_area: String,
    /// Honor schedule in time order, at most `MAX_SCHEDULE_ITEMS` long
    pub schedule: Vec<ScheduleItem>,
    /// Non-empty values of unclassified columns
    pub extra: BTreeMap<String, String>,
    pub line: usize,
}

impl Attendee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn meta(&self, field: MetaField) -> &str {
        match field {
            MetaField::FirstName => &self.first_name,
            MetaField::LastName => &self.last_name,
            MetaField::Club => &self.club,
            MetaField::Grade => &self.grade,
            MetaField::Group => &self.group,
            MetaField::ShirtSize => &self.shirt_size,
            MetaField::AssignmentArea => &self.assignment_area,
        }
    }

    /// Value of an arbitrary column: typed field for metadata columns, residual
    /// map otherwise. Honor columns are reached through `schedule` instead.
    pub fn column_value(&self, layout: &ColumnLayout, header: &str) -> &str {
        match layout.find(header) {
            Some(column) => match &column.kind {
                ColumnKind::Metadata(field) => self.meta(*field),
                ColumnKind::Ignored => self
                    .extra
                    .get(&column.header)
                    .map(|v| v.as_str())
                    .unwrap_or(""),
                ColumnKind::HonorSlot(_) => "",
            },
            None => "",
        }
    }
}

/// Build an attendee from a row using a precomputed layout.
pub fn attendee_from_row(layout: &ColumnLayout, row: &RowRecord) -> Attendee {
    let meta = |field: MetaField| {
        layout
            .metadata_header(field)
            .map(|header| row.value(header).to_string())
            .unwrap_or_default()
    };

    let mut schedule = Vec::new();
    for column in layout.honor_columns() {
        let selection = row.value(&column.header);
        if selection.is_empty() {
            continue;
        }
        let honor = if column.label.is_empty() {
            selection.to_string()
        } else {
            column.label.clone()
        };
        schedule.push(ScheduleItem {
            time: column.time.clone(),
            honor,
            selection: selection.to_string(),
            column: column.index,
        });
    }
    let populated = schedule.len();
    let schedule = limit_schedule(schedule);
    if schedule.len() < populated {
        log::debug!(
            "Line {}: dropped {} honor slots past the earliest {}",
            row.line,
            populated - schedule.len(),
            schedule.len()
        );
    }

    let mut extra = BTreeMap::new();
    for header in layout.ignored_headers() {
        let value = row.value(header);
        if !value.is_empty() {
            extra.insert(header.to_string(), value.to_string());
        }
    }
    for (header, value) in row.iter() {
        if layout.find(header).is_none() && !value.is_empty() {
            extra.insert(header.to_string(), value.to_string());
        }
    }

    Attendee {
        first_name: meta(MetaField::FirstName),
        last_name: meta(MetaField::LastName),
        club: meta(MetaField::Club),
        grade: meta(MetaField::Grade),
        group: meta(MetaField::Group),
        shirt_size: meta(MetaField::ShirtSize),
        assignment_area: meta(MetaField::AssignmentArea),
        schedule,
        extra,
        line: row.line,
    }
}

/// Every attendee of one loaded file, with the layout used to read them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    pub layout: ColumnLayout,
    pub attendees: Vec<Attendee>,
    /// Rows dropped because they carried no name at all
    pub skipped_rows: usize,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.attendees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attendees.is_empty()
    }
}

/// Classify the table's columns and convert every row into an attendee.
///
/// Rows without a first or last name are skipped; every other missing field
/// is left blank.
pub fn build_roster(table: &CsvTable) -> Roster {
    let layout = classify_columns(&table.headers);
    if layout.metadata_header(MetaField::FirstName).is_none()
        && layout.metadata_header(MetaField::LastName).is_none()
    {
        log::warn!("No First Name or Last Name column found");
    }

    let mut attendees = Vec::with_capacity(table.rows.len());
    let mut skipped_rows = 0;
    for row in &table.rows {
        let attendee = attendee_from_row(&layout, row);
        if attendee.first_name.is_empty() && attendee.last_name.is_empty() {
            log::debug!("Line {}: no name, row skipped", row.line);
            skipped_rows += 1;
            continue;
        }
        attendees.push(attendee);
    }

    log::info!(
        "Loaded {} attendees ({} rows skipped)",
        attendees.len(),
        skipped_rows
    );
    Roster {
        layout,
        attendees,
        skipped_rows,
    }
}
