use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::role::RoleAssignment;

pub const UNLISTED_MARKER: &str = "NOT IN MYRIAD";
// Hand-typed markers have typos past this point.
const UNLISTED_PREFIX: &str = "not in myr";

/// Whether a track is part of the external broadcast catalog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogStatus {
    #[default]
    Listed,
    Unlisted,
    Noted(String),
}

impl CatalogStatus {
    /// Reads a playlist `Episode` field.
    pub fn from_marker(marker: Option<&str>) -> Self {
        let marker = match marker.map(str::trim) {
            Some(value) if !value.is_empty() => value,
            _ => return CatalogStatus::Listed,
        };
        if marker.to_lowercase().starts_with(UNLISTED_PREFIX) {
            CatalogStatus::Unlisted
        } else if marker.eq_ignore_ascii_case("yes") {
            CatalogStatus::Listed
        } else {
            CatalogStatus::Noted(marker.to_string())
        }
    }

    pub fn marker(&self) -> &str {
        match self {
            CatalogStatus::Listed => "",
            CatalogStatus::Unlisted => UNLISTED_MARKER,
            CatalogStatus::Noted(text) => text,
        }
    }
}

/// Everything learned about one imported track. Built once by a source
/// adapter and handed on to the index unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: String,
    pub original_file: PathBuf,
    pub filename: PathBuf,
    pub title: String,
    pub album: String,
    pub duration_ms: u32,
    pub roles: Vec<RoleAssignment>,
    pub artist: String,
    pub composer: String,
    pub label: String,
    pub year: Option<i32>,
    pub catalog: CatalogStatus,
    pub date_added: String,
}

/// Current UTC time as `YYYY-MM-DD HH:MM`.
pub fn capture_timestamp() -> String {
    format_timestamp(OffsetDateTime::now_utc())
}

pub fn format_timestamp(at: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    at.format(&format).unwrap_or_default()
}

/// `YYYY-MM-DD HH:MM` to the ISO-8601 form property lists use for dates.
pub fn timestamp_to_iso8601(stamp: &str) -> Option<String> {
    let (date, clock) = stamp.trim().split_once(' ')?;
    if date.len() != 10 || clock.len() != 5 {
        return None;
    }
    Some(format!("{}T{}:00Z", date, clock))
}

// A leading year wins; otherwise the greedy prefix picks the last standalone run.
static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:^|.*[^0-9])([0-9]{4})(?:[^0-9]|$)").unwrap());

/// Year out of a free-form date field, e.g. `2008` from `2008-04-23`.
pub fn year_from_date(text: &str) -> Option<i32> {
    YEAR_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|year| year.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::{format_timestamp, timestamp_to_iso8601, year_from_date, CatalogStatus};

    #[test]
    fn catalog_marker_parsing() {
        assert_eq!(CatalogStatus::from_marker(None), CatalogStatus::Listed);
        assert_eq!(CatalogStatus::from_marker(Some("Yes")), CatalogStatus::Listed);
        assert_eq!(CatalogStatus::from_marker(Some("")), CatalogStatus::Listed);
        assert_eq!(
            CatalogStatus::from_marker(Some("NOT IN MYRIAD")),
            CatalogStatus::Unlisted
        );
        assert_eq!(
            CatalogStatus::from_marker(Some("Not in myraid")),
            CatalogStatus::Unlisted
        );
        assert_eq!(
            CatalogStatus::from_marker(Some("pending")),
            CatalogStatus::Noted("pending".to_string())
        );
    }

    #[test]
    fn catalog_marker_round_trips() {
        for status in [
            CatalogStatus::Listed,
            CatalogStatus::Unlisted,
            CatalogStatus::Noted("pending".to_string()),
        ] {
            assert_eq!(CatalogStatus::from_marker(Some(status.marker())), status);
        }
    }

    #[test]
    fn timestamp_format() {
        let at = datetime!(2024-03-09 07:05:59 UTC);
        assert_eq!(format_timestamp(at), "2024-03-09 07:05");
        assert_eq!(
            timestamp_to_iso8601("2024-03-09 07:05").as_deref(),
            Some("2024-03-09T07:05:00Z")
        );
        assert_eq!(timestamp_to_iso8601("yesterday"), None);
    }

    #[test]
    fn year_extraction() {
        assert_eq!(year_from_date("2008-04-23"), Some(2008));
        assert_eq!(year_from_date("released 1999"), Some(1999));
        assert_eq!(year_from_date("20081"), None);
        assert_eq!(year_from_date("1999 remaster 2010"), Some(1999));
        assert_eq!(year_from_date("released 1999, remastered 2010-03"), Some(2010));
        assert_eq!(year_from_date("12345 and 2004"), Some(2004));
        assert_eq!(year_from_date(""), None);
    }
}
