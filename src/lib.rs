//! Pathfinder Reports
//!
//! Printable reports generated from a Planning Center registration CSV export.
//!
//! This library provides:
//! - `roster`: CSV parsing and typed attendee records
//! - `columns`: Header classification (metadata, honor slots, ignored) and label cleanup
//! - `grouping`: Group ranking and name ordering
//! - `render`: HTML sheets and student cards
//! - `pipeline`: Report sessions tying the steps together
//!
//! Binaries:
//! - `pathfinder-reports`: Attendance sheets, honor day sheets and student cards from the command line

pub mod columns;
pub mod grouping;
pub mod pipeline;
pub mod render;
pub mod roster;

pub use pipeline::{ReportConfig, ReportKind, ReportSession, ReportWorkspace};
pub use render::Document;
pub use roster::{Attendee, Roster, ScheduleItem};
