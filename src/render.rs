//! HTML rendering of grouped attendees
//!
//! Produces one standalone, printable HTML document per report. Sheets put
//! each group on its own page(s) with blank write-in rows at the end; cards
//! lay out four attendees per landscape page. Every page except the last
//! carries a page break so printing never splits a page.

use crate::grouping::Group;
use crate::roster::Attendee;
use anyhow::Result;
use chrono::NaiveDate;
use std::fmt::Write;

/// Cards on one printed page (2x2 grid).
pub const CARDS_PER_PAGE: usize = 4;

const SHIRT_EMOJI: &str = "\u{1F455}";

// ============================================================================
// Document shell
// ============================================================================

/// Title, heading and print date shared by every report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    /// Short report name, used in the `<title>` with the date
    pub report_name: String,
    /// On-screen heading
    pub heading: String,
    pub print_date: NaiveDate,
}

impl DocumentInfo {
    /// `<report name> - yyyy-mm-dd`, so print-to-PDF suggests a dated file name.
    pub fn title(&self) -> String {
        document_title(&self.report_name, self.print_date)
    }
}

pub fn document_title(report_name: &str, date: NaiveDate) -> String {
    format!("{} - {}", report_name, date.format("%Y-%m-%d"))
}

/// Date as printed in page footers, e.g. `January 24, 2026`.
pub fn print_date_label(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// A rendered report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    pub html: String,
    pub pages: usize,
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Class list for a page section; all but the last page break after.
fn page_class(base: &str, page_idx: usize, page_count: usize) -> String {
    if page_idx + 1 < page_count {
        format!("{} page-break", base)
    } else {
        base.to_string()
    }
}

fn wrap_document(info: &DocumentInfo, css: &str, summary: &str, pages: &[String]) -> Result<String> {
    let mut out = String::with_capacity(pages.iter().map(|p| p.len()).sum::<usize>() + 8 * 1024);
    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"UTF-8\">")?;
    writeln!(
        out,
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">"
    )?;
    writeln!(out, "<title>{}</title>", escape_html(&info.title()))?;
    writeln!(out, "<style>\n{}\n{}</style>", BASE_CSS, css)?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(out, "<header class=\"report-header no-print\">")?;
    writeln!(out, "<h1>{}</h1>", escape_html(&info.heading))?;
    writeln!(out, "<p class=\"report-summary\">{}</p>", escape_html(summary))?;
    writeln!(out, "</header>")?;
    writeln!(out, "<main class=\"report\">")?;
    if pages.is_empty() {
        writeln!(
            out,
            "<p class=\"empty-notice\">No attendees found in this file.</p>"
        )?;
    }
    for page in pages {
        out.push_str(page);
    }
    writeln!(out, "</main>")?;
    writeln!(out, "</body>")?;
    writeln!(out, "</html>")?;
    Ok(out)
}

// ============================================================================
// Sheets
// ============================================================================

/// Layout options for attendance sheets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetOptions {
    pub info: DocumentInfo,
    /// Blank rows appended after the last attendee of each group
    pub write_in_rows: usize,
    /// Rows (attendees plus write-ins) per printed page; 0 means unlimited
    pub rows_per_page: usize,
    pub show_shirt: bool,
    pub show_club: bool,
}

/// Row ranges `[start, end)` of one group's pages. Rows past `members` are
/// write-in rows. A group with no members has no pages.
pub fn plan_sheet_pages(
    members: usize,
    write_in_rows: usize,
    rows_per_page: usize,
) -> Vec<(usize, usize)> {
    if members == 0 {
        return Vec::new();
    }
    let total = members + write_in_rows;
    if rows_per_page == 0 {
        return vec![(0, total)];
    }
    (0..total)
        .step_by(rows_per_page)
        .map(|start| (start, (start + rows_per_page).min(total)))
        .collect()
}

fn sheet_columns(opts: &SheetOptions) -> usize {
    3 + usize::from(opts.show_shirt) + usize::from(opts.show_club)
}

fn write_sheet_row(
    out: &mut String,
    opts: &SheetOptions,
    number: usize,
    attendee: Option<&Attendee>,
) -> Result<()> {
    let row_class = if attendee.is_some() {
        "attendee-row"
    } else {
        "write-in-row"
    };
    writeln!(out, "<tr class=\"{}\">", row_class)?;
    writeln!(out, "<td class=\"row-number\">{}</td>", number)?;
    writeln!(out, "<td><span class=\"checkbox\"></span></td>")?;
    if opts.show_shirt {
        let size = attendee.map(|a| a.shirt_size.as_str()).unwrap_or("");
        write!(
            out,
            "<td class=\"shirt-cell\"><span class=\"shirt-checkbox\"></span><span class=\"shirt-emoji\">{}</span>",
            SHIRT_EMOJI
        )?;
        if !size.is_empty() {
            write!(out, " <span class=\"shirt-size\">{}</span>", escape_html(size))?;
        }
        writeln!(out, "</td>")?;
    }
    match attendee {
        Some(a) => {
            writeln!(
                out,
                "<td class=\"attendee-name\">{}</td>",
                escape_html(&a.full_name())
            )?;
            if opts.show_club {
                writeln!(out, "<td class=\"attendee-club\">{}</td>", escape_html(&a.club))?;
            }
        }
        None => {
            writeln!(
                out,
                "<td class=\"attendee-name\"><span class=\"write-in-line\"></span></td>"
            )?;
            if opts.show_club {
                writeln!(
                    out,
                    "<td class=\"attendee-club\"><span class=\"write-in-line\"></span></td>"
                )?;
            }
        }
    }
    writeln!(out, "</tr>")?;
    Ok(())
}

struct SheetPage<'g, 'a> {
    group: &'g Group<&'a Attendee>,
    rows: (usize, usize),
    continued: bool,
}

/// Render one sheet page per group (more when a group overflows a page).
pub fn render_sheets(groups: &[Group<&Attendee>], opts: &SheetOptions) -> Result<Document> {
    let mut plan = Vec::new();
    for group in groups.iter().filter(|g| !g.members.is_empty()) {
        for (i, rows) in plan_sheet_pages(group.members.len(), opts.write_in_rows, opts.rows_per_page)
            .into_iter()
            .enumerate()
        {
            plan.push(SheetPage {
                group,
                rows,
                continued: i > 0,
            });
        }
    }

    let page_count = plan.len();
    let printed = print_date_label(opts.info.print_date);
    let mut pages = Vec::with_capacity(page_count);
    for (page_idx, page) in plan.iter().enumerate() {
        let mut out = String::new();
        writeln!(
            out,
            "<section class=\"{}\">",
            page_class("attendance-page", page_idx, page_count)
        )?;
        writeln!(out, "<table class=\"attendance-table\">")?;
        writeln!(out, "<thead>")?;
        let mut header = escape_html(&page.group.name);
        if page.continued {
            header.push_str(" (cont.)");
        }
        writeln!(
            out,
            "<tr><th class=\"group-header\" colspan=\"{}\">{}</th></tr>",
            sheet_columns(opts),
            header
        )?;
        write!(out, "<tr class=\"column-labels\"><th>#</th><th>Here</th>")?;
        if opts.show_shirt {
            write!(out, "<th>Shirt</th>")?;
        }
        write!(out, "<th>Name</th>")?;
        if opts.show_club {
            write!(out, "<th>Club</th>")?;
        }
        writeln!(out, "</tr>")?;
        writeln!(out, "</thead>")?;
        writeln!(out, "<tbody>")?;
        for row in page.rows.0..page.rows.1 {
            let attendee = page.group.members.get(row).copied();
            write_sheet_row(&mut out, opts, row + 1, attendee)?;
        }
        writeln!(out, "</tbody>")?;
        writeln!(out, "</table>")?;
        writeln!(
            out,
            "<div class=\"page-footer\"><span class=\"print-date\">Printed: {}</span><span class=\"page-number\">Page {} of {}</span></div>",
            printed,
            page_idx + 1,
            page_count
        )?;
        writeln!(out, "</section>")?;
        pages.push(out);
    }

    let attendees: usize = groups.iter().map(|g| g.members.len()).sum();
    let rendered_groups = groups.iter().filter(|g| !g.members.is_empty()).count();
    let summary = format!(
        "{} attendees in {} groups, {} pages",
        attendees, rendered_groups, page_count
    );
    log::info!("Rendered {} sheet pages for {} groups", page_count, rendered_groups);

    Ok(Document {
        title: opts.info.title(),
        html: wrap_document(&opts.info, SHEET_CSS, &summary, &pages)?,
        pages: page_count,
    })
}

// ============================================================================
// Cards
// ============================================================================

/// Layout options for student cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardOptions {
    pub info: DocumentInfo,
    /// Start every group on a fresh page
    pub page_per_group: bool,
}

/// Lay attendees out in pages of exactly [`CARDS_PER_PAGE`] slots; `None`
/// slots print as empty placeholders.
pub fn plan_card_pages<'a>(
    groups: &[Group<&'a Attendee>],
    page_per_group: bool,
) -> Vec<Vec<Option<&'a Attendee>>> {
    fn pad(slots: &mut Vec<Option<&Attendee>>) {
        while slots.len() % CARDS_PER_PAGE != 0 {
            slots.push(None);
        }
    }

    let mut slots: Vec<Option<&'a Attendee>> = Vec::new();
    for group in groups {
        slots.extend(group.members.iter().map(|a| Some(*a)));
        if page_per_group {
            pad(&mut slots);
        }
    }
    pad(&mut slots);
    slots
        .chunks(CARDS_PER_PAGE)
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Markup for one student card.
pub fn create_card_html(attendee: &Attendee) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "<div class=\"student-card\">")?;
    writeln!(out, "<div class=\"card-header\">Honor Day Schedule</div>")?;
    writeln!(
        out,
        "<div class=\"card-attendee-name\">{}</div>",
        escape_html(&attendee.full_name())
    )?;
    writeln!(
        out,
        "<div class=\"card-club-name\">{}</div>",
        escape_html(&attendee.club)
    )?;
    writeln!(out, "<div class=\"card-schedule\">")?;
    for item in &attendee.schedule {
        writeln!(
            out,
            "<div class=\"schedule-item\"><span class=\"schedule-time\">{}</span><span class=\"schedule-honor\">{}</span><span class=\"schedule-initial\"></span></div>",
            escape_html(&item.time.label),
            escape_html(&item.honor)
        )?;
    }
    if attendee.schedule.is_empty() {
        writeln!(out, "<div class=\"schedule-empty\">No honors selected</div>")?;
    }
    writeln!(out, "</div>")?;
    writeln!(out, "</div>")?;
    Ok(out)
}

/// Render student cards, four to a page.
pub fn render_cards(groups: &[Group<&Attendee>], opts: &CardOptions) -> Result<Document> {
    let attendees: usize = groups.iter().map(|g| g.members.len()).sum();
    let plan = if attendees == 0 {
        Vec::new()
    } else {
        plan_card_pages(groups, opts.page_per_group)
    };

    let page_count = plan.len();
    let mut pages = Vec::with_capacity(page_count);
    for (page_idx, slots) in plan.iter().enumerate() {
        let mut out = String::new();
        writeln!(
            out,
            "<section class=\"{}\">",
            page_class("card-page", page_idx, page_count)
        )?;
        for slot in slots {
            match slot {
                Some(attendee) => out.push_str(&create_card_html(attendee)?),
                None => writeln!(out, "<div class=\"student-card empty\"></div>")?,
            }
        }
        writeln!(out, "</section>")?;
        pages.push(out);
    }

    let summary = format!("{} students, {} pages", attendees, page_count);
    log::info!("Rendered {} card pages for {} students", page_count, attendees);

    Ok(Document {
        title: opts.info.title(),
        html: wrap_document(&opts.info, CARD_CSS, &summary, &pages)?,
        pages: page_count,
    })
}

// ============================================================================
// Stylesheets
// ============================================================================

const BASE_CSS: &str = r#"* { box-sizing: border-box; }
body { font-family: Arial, Helvetica, sans-serif; margin: 0; padding: 20px; color: #222; }
.report-header h1 { margin: 0 0 4px 0; font-size: 22px; }
.report-summary { margin: 0 0 16px 0; color: #666; }
.empty-notice { font-style: italic; color: #666; }
.page-break { page-break-after: always; break-after: page; }
@media print {
    body { padding: 0; }
    nav, .no-print, .print-controls { display: none; }
}
"#;

const SHEET_CSS: &str = r#"@page { size: letter portrait; margin: 0.5in; }
.attendance-page { position: relative; margin-bottom: 24px; }
.attendance-table { width: 100%; border-collapse: collapse; }
.attendance-table th, .attendance-table td { border: 1px solid #999; padding: 4px 6px; text-align: left; }
.group-header { font-size: 18px; background: #eee; }
.column-labels th { font-size: 11px; text-transform: uppercase; color: #555; }
.row-number { width: 32px; text-align: right; color: #555; }
.checkbox, .shirt-checkbox { display: inline-block; width: 14px; height: 14px; border: 1px solid #333; vertical-align: middle; }
.shirt-cell { width: 90px; white-space: nowrap; }
.shirt-emoji { margin-left: 4px; }
.shirt-size { font-size: 11px; color: #555; }
.attendee-name { font-size: 14px; }
.write-in-line { display: block; height: 1.1em; border-bottom: 1px solid #333; }
.page-footer { display: flex; justify-content: space-between; margin-top: 8px; font-size: 11px; color: #555; }
@media print {
    .attendance-page { margin-bottom: 0; }
}
"#;

const CARD_CSS: &str = r#"@page { size: letter landscape; margin: 0.4in; }
.card-page { display: grid; grid-template-columns: 1fr 1fr; grid-template-rows: 1fr 1fr; gap: 0.3in; height: 7.6in; margin-bottom: 24px; }
.student-card { border: 2px solid #333; border-radius: 8px; padding: 12px 16px; overflow: hidden; }
.student-card.empty { border: 1px dashed #ccc; }
.card-header { font-size: 13px; font-weight: bold; text-transform: uppercase; letter-spacing: 1px; text-align: center; border-bottom: 1px solid #333; padding-bottom: 4px; }
.card-attendee-name { font-size: 20px; font-weight: bold; margin-top: 8px; }
.card-club-name { font-size: 13px; color: #555; margin-bottom: 8px; }
.card-schedule { display: flex; flex-direction: column; gap: 4px; }
.schedule-item { display: flex; align-items: baseline; gap: 8px; font-size: 13px; }
.schedule-time { width: 72px; font-weight: bold; white-space: nowrap; }
.schedule-honor { flex: 1; }
.schedule-initial { width: 60px; border-bottom: 1px solid #333; height: 1em; }
.schedule-empty { font-style: italic; color: #888; }
@media print {
    .card-page { margin-bottom: 0; }
    .student-card.empty { border: none; }
}
"#;
