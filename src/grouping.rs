//! Grouping and ordering of attendees
//!
//! Groups are ranked through a fixed order table (grades, time of day) with
//! unknown names after the known ones; members sort by first name, then last
//! name, ignoring case and accents. The same input always yields the same order.

use crate::columns::{time_order, MAX_SCHEDULE_ITEMS};
use crate::roster::{Attendee, ScheduleItem};
use std::cmp::Ordering;
use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Grade and Pathfinder class names in printing order. Each entry lists the
/// spellings (lowercase) that map to it.
pub const GRADE_ORDER: &[(&str, &[&str])] = &[
    ("Friend", &["friend", "friends", "5", "5th", "5th grade", "grade 5"]),
    ("Companion", &["companion", "companions", "6", "6th", "6th grade", "grade 6"]),
    ("Explorer", &["explorer", "explorers", "7", "7th", "7th grade", "grade 7"]),
    ("Ranger", &["ranger", "rangers", "8", "8th", "8th grade", "grade 8"]),
    ("Voyager", &["voyager", "voyagers", "9", "9th", "9th grade", "grade 9"]),
    ("Guide", &["guide", "guides", "10", "10th", "10th grade", "grade 10"]),
    (
        "TLT",
        &["tlt", "teen leadership training", "11", "11th", "11th grade", "12", "12th", "12th grade"],
    ),
    ("Staff", &["staff", "counselor", "counselors", "adult", "adults"]),
];

/// `alias` matches `name` exactly or as a prefix followed by a non-alphanumeric
/// character, so `friend (5th grade)` matches `friend` but `5th` does not match `5`.
fn matches_alias(name: &str, alias: &str) -> bool {
    match name.strip_prefix(alias) {
        Some("") => true,
        Some(rest) => !rest.starts_with(|c: char| c.is_alphanumeric()),
        None => false,
    }
}

/// Position of a grade or class name in [`GRADE_ORDER`].
pub fn grade_rank(name: &str) -> Option<u32> {
    let normalized = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    GRADE_ORDER
        .iter()
        .position(|(_, aliases)| aliases.iter().any(|alias| matches_alias(&normalized, alias)))
        .map(|pos| pos as u32)
}

/// How groups are ranked against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOrder {
    /// Grade/class order table
    Grades,
    /// Time slot embedded in the group name
    TimeOfDay,
    /// First encounter in the file
    Encounter,
}

impl GroupOrder {
    /// Rank of a group name; `None` sorts after every ranked name.
    pub fn rank(self, name: &str) -> Option<u32> {
        match self {
            GroupOrder::Grades => grade_rank(name),
            GroupOrder::TimeOfDay => time_order(name),
            GroupOrder::Encounter => Some(0),
        }
    }
}

/// Anything that sorts by first name, then last name.
pub trait SortName {
    fn first_name(&self) -> &str;
    fn last_name(&self) -> &str;
}

impl SortName for Attendee {
    fn first_name(&self) -> &str {
        &self.first_name
    }
    fn last_name(&self) -> &str {
        &self.last_name
    }
}

impl<T: SortName + ?Sized> SortName for &T {
    fn first_name(&self) -> &str {
        (**self).first_name()
    }
    fn last_name(&self) -> &str {
        (**self).last_name()
    }
}

/// Primary collation key: decomposed, accents dropped, lowercased, so
/// `Émile` files between `Adam` and `Zoe`.
pub fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Case- and accent-insensitive (first name, last name) order. Names that
/// differ only by accent or case are then ordered by their lowercase text, and
/// finally by exact text, so `amy` and `Amy` still land in a fixed order.
pub fn compare_names<T: SortName>(a: &T, b: &T) -> Ordering {
    let (a_first, a_last) = (a.first_name(), a.last_name());
    let (b_first, b_last) = (b.first_name(), b.last_name());
    collation_key(a_first)
        .cmp(&collation_key(b_first))
        .then_with(|| collation_key(a_last).cmp(&collation_key(b_last)))
        .then_with(|| a_first.to_lowercase().cmp(&b_first.to_lowercase()))
        .then_with(|| a_last.to_lowercase().cmp(&b_last.to_lowercase()))
        .then_with(|| a_first.cmp(b_first))
        .then_with(|| a_last.cmp(b_last))
}

/// A named group of members in print order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<T> {
    pub name: String,
    pub members: Vec<T>,
}

/// Partition `(key, member)` pairs into ordered groups.
///
/// Groups are ranked by `order`; unranked names come after ranked ones, the
/// blank name comes last, and equal ranks keep first-encounter order. Members
/// are sorted with [`compare_names`]; full ties keep input order. No group in
/// the result is empty.
pub fn group_entries<T: SortName>(
    entries: impl IntoIterator<Item = (String, T)>,
    order: GroupOrder,
) -> Vec<Group<T>> {
    let mut groups: Vec<Group<T>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (key, member) in entries {
        let key = key.trim().to_string();
        let idx = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(Group {
                name: key,
                members: Vec::new(),
            });
            groups.len() - 1
        });
        groups[idx].members.push(member);
    }

    groups.retain(|g| !g.members.is_empty());
    for group in &mut groups {
        group.members.sort_by(compare_names);
    }

    // Encounter order is the current position; a stable sort keeps it for ties.
    groups.sort_by_key(|g| {
        let rank = order.rank(&g.name);
        (g.name.is_empty(), rank.is_none(), rank.unwrap_or(0))
    });
    groups
}

/// Keep the earliest `MAX_SCHEDULE_ITEMS` items by time, ties by column order.
pub fn limit_schedule(mut items: Vec<ScheduleItem>) -> Vec<ScheduleItem> {
    items.sort_by(|a, b| {
        a.time
            .sort_key()
            .cmp(&b.time.sort_key())
            .then_with(|| a.column.cmp(&b.column))
    });
    items.truncate(MAX_SCHEDULE_ITEMS);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::TimeSlot;

    #[derive(Debug, Clone, PartialEq)]
    struct Name(&'static str, &'static str);

    impl SortName for Name {
        fn first_name(&self) -> &str {
            self.0
        }
        fn last_name(&self) -> &str {
            self.1
        }
    }

    fn names(group: &Group<Name>) -> Vec<String> {
        group
            .members
            .iter()
            .map(|n| format!("{} {}", n.0, n.1))
            .collect()
    }

    #[test]
    fn test_compare_names() {
        assert_eq!(
            compare_names(&Name("Adam", "Zane"), &Name("Beth", "Adam")),
            Ordering::Less
        );
        assert_eq!(
            compare_names(&Name("beth", "Adam"), &Name("Beth", "Zane")),
            Ordering::Less
        );
        assert_eq!(
            compare_names(&Name("Amy", "Zee"), &Name("Amy", "Abel")),
            Ordering::Greater
        );
        assert_eq!(
            compare_names(&Name("amy", "abel"), &Name("AMY", "ABEL")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_compare_names_folds_accents() {
        assert_eq!(collation_key("Émile"), "emile");
        assert_eq!(
            compare_names(&Name("Émile", "Brun"), &Name("Zoe", "Abel")),
            Ordering::Less
        );
        assert_eq!(
            compare_names(&Name("Emile", "Brun"), &Name("Émile", "Brun")),
            Ordering::Less
        );

        let entries = vec![
            ("Eagles".to_string(), Name("Zoe", "Abel")),
            ("Eagles".to_string(), Name("Émile", "Brun")),
            ("Eagles".to_string(), Name("Adam", "Cole")),
        ];
        let groups = group_entries(entries, GroupOrder::Encounter);
        assert_eq!(names(&groups[0]), vec!["Adam Cole", "Émile Brun", "Zoe Abel"]);
    }

    #[test]
    fn test_grade_rank() {
        assert_eq!(grade_rank("Friend"), Some(0));
        assert_eq!(grade_rank("5th Grade"), Some(0));
        assert_eq!(grade_rank("Friend (5th grade)"), Some(0));
        assert_eq!(grade_rank("GUIDE"), Some(5));
        assert_eq!(grade_rank("12th"), Some(6));
        assert_eq!(grade_rank("Staff"), Some(7));
        assert_eq!(grade_rank("Friendship"), None);
        assert_eq!(grade_rank("Adventurers"), None);
        assert_eq!(grade_rank(""), None);
    }

    #[test]
    fn test_group_entries_by_grade() {
        let entries = vec![
            ("Ranger".to_string(), Name("Amy", "Zee")),
            ("Mystery".to_string(), Name("Cal", "Ray")),
            ("Friend".to_string(), Name("Bo", "Abel")),
            ("Ranger".to_string(), Name("Amy", "Abel")),
            ("Other".to_string(), Name("Dee", "Fox")),
        ];
        let groups = group_entries(entries, GroupOrder::Grades);
        let order: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(order, vec!["Friend", "Ranger", "Mystery", "Other"]);
        assert_eq!(names(&groups[1]), vec!["Amy Abel", "Amy Zee"]);
    }

    #[test]
    fn test_group_entries_blank_name_last() {
        let entries = vec![
            ("".to_string(), Name("Amy", "Zee")),
            ("Eagles".to_string(), Name("Bo", "Abel")),
            ("  Hawks ".to_string(), Name("Cal", "Ray")),
        ];
        let groups = group_entries(entries, GroupOrder::Encounter);
        let order: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(order, vec!["Eagles", "Hawks", ""]);
    }

    #[test]
    fn test_group_entries_by_time() {
        let entries = vec![
            ("1:00 PM - Knots".to_string(), Name("Amy", "Zee")),
            ("TBD - Stars".to_string(), Name("Bo", "Abel")),
            ("9:00 AM - Birds".to_string(), Name("Cal", "Ray")),
        ];
        let groups = group_entries(entries, GroupOrder::TimeOfDay);
        let order: Vec<_> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(order, vec!["9:00 AM - Birds", "1:00 PM - Knots", "TBD - Stars"]);
    }

    #[test]
    fn test_group_entries_empty() {
        let groups = group_entries(Vec::<(String, Name)>::new(), GroupOrder::Grades);
        assert!(groups.is_empty());
    }

    fn item(label: &str, minutes: Option<u32>, column: usize) -> ScheduleItem {
        ScheduleItem {
            time: TimeSlot {
                label: label.to_string(),
                minutes,
            },
            honor: format!("Honor {}", column),
            selection: "x".to_string(),
            column,
        }
    }

    #[test]
    fn test_limit_schedule_keeps_earliest() {
        let mut items: Vec<ScheduleItem> = (0..12)
            .map(|i| item(&format!("{}:00", 20 - i), Some((20 - i) * 60), i as usize))
            .collect();
        items.push(item("TBD", None, 99));
        let kept = limit_schedule(items);
        assert_eq!(kept.len(), MAX_SCHEDULE_ITEMS);
        assert_eq!(kept[0].time.label, "9:00");
        assert_eq!(kept[8].time.label, "17:00");
        assert!(kept.iter().all(|i| i.column != 99));
    }

    #[test]
    fn test_limit_schedule_ties_by_column() {
        let kept = limit_schedule(vec![item("9:00", Some(540), 5), item("9:00", Some(540), 2)]);
        assert_eq!(kept[0].column, 2);
        assert_eq!(kept[1].column, 5);
    }
}
