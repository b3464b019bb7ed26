//! Integration tests for report generation from registration exports
//!
//! These tests write CSV exports to disk, load them through a workspace the
//! same way the CLI does, and check the rendered HTML documents.

use chrono::NaiveDate;
use pathfinder_reports::pipeline::{default_output_path, write_document};
use pathfinder_reports::roster::{build_roster, parse_csv};
use pathfinder_reports::{ReportConfig, ReportKind, ReportSession, ReportWorkspace};
use std::fs;

fn print_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 24).unwrap()
}

/// Build an export with `slots` honor columns (listed latest first) and one
/// attendee signed up for all of them.
fn export_with_slots(slots: usize) -> String {
    let headers: Vec<String> = (0..slots)
        .rev()
        .map(|i| format!("{}:{:02} Honor {}", 8 + i / 2, (i % 2) * 30, i))
        .collect();
    let values = vec!["yes"; slots].join(",");
    format!(
        "First Name,Last Name,Club,{}\nJane,Doe,Eagles,{}\n",
        headers.join(","),
        values
    )
}

#[test]
fn test_example_export_yields_one_attendee() {
    let table = parse_csv(
        "First Name,Last Name,Club,9:00 AM Honor A,12:00 PM Lunch\nJane,Doe,Eagles,Bravery,\n",
    );
    let roster = build_roster(&table);

    assert_eq!(roster.attendees.len(), 1);
    let jane = &roster.attendees[0];
    assert_eq!(
        (jane.first_name.as_str(), jane.last_name.as_str(), jane.club.as_str()),
        ("Jane", "Doe", "Eagles")
    );
    let schedule: Vec<_> = jane
        .schedule
        .iter()
        .map(|item| (item.time.label.as_str(), item.honor.as_str()))
        .collect();
    assert_eq!(schedule, vec![("9:00 AM", "Honor A")]);
}

#[test]
fn test_row_count_matches_non_empty_lines() {
    let text = "First Name,Last Name,Notes\n\
                Amy,Zee,\"Likes knots, birds\"\n\
                \n\
                Bo,Cole,\"Said \"\"hi\"\"\"\n\
                Cy,Dunn,\"two\nlines\"\n\
                \n";
    let table = parse_csv(text);
    assert_eq!(table.rows.len(), 3);
    assert_eq!(table.rows[0].value("Notes"), "Likes knots, birds");
    assert_eq!(table.rows[0].len(), 3);
    assert_eq!(table.rows[1].value("Notes"), "Said \"hi\"");
}

#[test]
fn test_cards_cap_schedule_at_nine_by_time() {
    let session = ReportSession::from_text("export.csv", &export_with_slots(12));
    let jane = &session.roster().attendees[0];
    assert_eq!(jane.schedule.len(), 9);
    assert_eq!(jane.schedule[0].time.label, "8:00");
    assert_eq!(jane.schedule[8].time.label, "12:00");

    let cards = session
        .generate(&ReportConfig::new(ReportKind::StudentCards, print_date()))
        .unwrap();
    assert_eq!(cards.html.matches("class=\"schedule-item\"").count(), 9);
    assert!(cards.html.contains("Honor 0"));
    assert!(!cards.html.contains("Honor 9<"));
}

#[test]
fn test_members_sorted_by_first_then_last_name() {
    let session = ReportSession::from_text(
        "export.csv",
        "First Name,Last Name,Grade\nAmy,Zee,Friend\nAmy,Abel,Friend\nadam,Young,Friend\n",
    );
    let doc = session
        .generate(&ReportConfig::new(ReportKind::AttendanceSheets, print_date()))
        .unwrap();
    let adam = doc.html.find("adam Young").unwrap();
    let abel = doc.html.find("Amy Abel").unwrap();
    let zee = doc.html.find("Amy Zee").unwrap();
    assert!(adam < abel && abel < zee);
}

#[test]
fn test_groups_follow_grade_order_and_skip_empty() {
    let session = ReportSession::from_text(
        "export.csv",
        "First Name,Last Name,Assignment Area: Pathfinders\n\
         Gus,Hale,Guide\n\
         Amy,Zee,Friend\n\
         Ola,Park,\n\
         Ned,Ives,Mystery Class\n\
         Bo,Cole,Companion\n",
    );
    let doc = session
        .generate(&ReportConfig::new(ReportKind::AttendanceSheets, print_date()))
        .unwrap();

    let headers: Vec<usize> = ["Friend", "Companion", "Guide", "Mystery Class"]
        .iter()
        .map(|name| {
            doc.html
                .find(&format!(">{}</th>", name))
                .unwrap_or_else(|| panic!("missing group {}", name))
        })
        .collect();
    assert!(headers.windows(2).all(|w| w[0] < w[1]));
    assert!(!doc.html.contains("Ola Park"));
    assert!(!doc.html.contains(">Unassigned</th>"));
    assert_eq!(doc.pages, 4);
}

#[test]
fn test_card_pages_keep_the_grid() {
    let session = ReportSession::from_text(
        "export.csv",
        "First Name,Last Name,Club\nA,One,Eagles\nB,Two,Eagles\nC,Three,Eagles\nD,Four,Hawks\nE,Five,Hawks\n",
    );
    let mut config = ReportConfig::new(ReportKind::StudentCards, print_date());
    let doc = session.generate(&config).unwrap();
    assert_eq!(doc.pages, 2);
    assert_eq!(doc.html.matches("class=\"student-card\"").count(), 5);
    assert_eq!(doc.html.matches("class=\"student-card empty\"").count(), 3);

    config.page_per_club = true;
    let doc = session.generate(&config).unwrap();
    assert_eq!(doc.pages, 2);
    assert_eq!(doc.html.matches("class=\"student-card empty\"").count(), 3);
    assert_eq!(doc.html.matches("class=\"card-page page-break\"").count(), 1);
}

#[test]
fn test_malformed_times_do_not_break_rendering() {
    let session = ReportSession::from_text(
        "export.csv",
        "First Name,Last Name,Club,29:00 Stargazing,10:00 AM Knots\nAmy,Zee,Eagles,yes,yes\n",
    );
    let jane = &session.roster().attendees[0];
    assert_eq!(jane.schedule[0].honor, "Knots");
    assert_eq!(jane.schedule[1].honor, "Stargazing");

    let doc = session
        .generate(&ReportConfig::new(ReportKind::HonorDay, print_date()))
        .unwrap();
    let knots = doc.html.find("10:00 AM - Knots").unwrap();
    let stars = doc.html.find("29:00 - Stargazing").unwrap();
    assert!(knots < stars);
}

#[test]
fn test_workspace_writes_report_next_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("registrations.csv");
    fs::write(
        &input,
        "First Name,Last Name,Club,Shirt Size,9:00 AM Honor A\nJane,Doe,Eagles,M,yes\n",
    )
    .unwrap();

    let mut workspace = ReportWorkspace::new();
    let session = workspace.load(&input).unwrap();
    let doc = session
        .generate(&ReportConfig::new(ReportKind::HonorDay, print_date()))
        .unwrap();
    let output = default_output_path(&input, &doc.title);
    write_document(&doc, &output).unwrap();

    assert_eq!(
        output.file_name().unwrap().to_str().unwrap(),
        "Honor Day Attendance - 2026-01-24.html"
    );
    let html = fs::read_to_string(&output).unwrap();
    assert!(html.contains("<title>Honor Day Attendance - 2026-01-24</title>"));
    assert!(html.contains("<span class=\"shirt-size\">M</span>"));
    assert!(html.contains("Printed: January 24, 2026"));
    assert_eq!(html.matches("class=\"write-in-row\"").count(), 3);
}

#[test]
fn test_workspace_rejects_non_csv() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("registrations.txt");
    fs::write(&input, "First Name,Last Name\nJane,Doe\n").unwrap();

    let mut workspace = ReportWorkspace::new();
    assert!(workspace.load(&input).is_err());
    assert!(workspace.current().is_none());
}

#[test]
fn test_accented_names_sort_with_their_base_letter() {
    let session = ReportSession::from_text(
        "export.csv",
        "First Name,Last Name,Club\nZoe,Abel,Eagles\nÉmile,Brun,Eagles\nAdam,Cole,Eagles\n",
    );
    let doc = session
        .generate(&ReportConfig::new(ReportKind::StudentCards, print_date()))
        .unwrap();
    let adam = doc.html.find("Adam Cole").unwrap();
    let emile = doc.html.find("Émile Brun").unwrap();
    let zoe = doc.html.find("Zoe Abel").unwrap();
    assert!(adam < emile && emile < zoe);
}

#[test]
fn test_unterminated_quote_keeps_later_attendees() {
    let session = ReportSession::from_text(
        "export.csv",
        "First Name,Last Name,Club\nAmy,\"Zee,Eagles\nBo,Cole,Eagles\nCy,Dunn,Eagles\n",
    );
    let names: Vec<String> = session
        .roster()
        .attendees
        .iter()
        .map(|a| a.full_name())
        .collect();
    assert_eq!(names, vec!["Bo Cole", "Cy Dunn"]);
}
