//! Dates from file names and modification times.
//!
//! Two patterns are recognised at the start of a file stem:
//!
//! - **YMD**, permissive: `YYYY-MM-DD` with month `00`–`12` and day `00`–`31`.
//!   Calendar validity is not checked, so `2020-02-31` matches. Only the year
//!   group is ever used.
//! - **YMDHMS**, strict: `YYYY-MM-DD HH.MM.SS` with a real month, day `01`–`31`
//!   and a valid 24-hour time. Used to spot names that are already in the
//!   timestamp form.

use chrono::{DateTime, Local};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::FileError;

/// `strftime` format for timestamp-named stems.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H.%M.%S";
/// `strftime` format for date prefixes.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static YMD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<year>[0-9]{4})-(0[0-9]|1[0-2]|00)-(0[0-9]|[12][0-9]|3[01]|00)")
        .expect("YMD pattern is valid")
});

static YMDHMS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01]) ([01][0-9]|2[0-3])\.[0-5][0-9]\.[0-5][0-9]",
    )
    .expect("YMDHMS pattern is valid")
});

/// Returns the year group when `stem` starts with a YMD date.
///
/// ```
/// use datedir::date_extractor::ymd_year;
///
/// assert_eq!(ymd_year("2020-02-31-notes"), Some("2020"));
/// assert_eq!(ymd_year("notes-2020-02-01"), None);
/// ```
pub fn ymd_year(stem: &str) -> Option<&str> {
    YMD_PATTERN
        .captures(stem)
        .and_then(|caps| caps.name("year"))
        .map(|year| year.as_str())
}

/// True when `stem` starts with a YMD date.
pub fn matches_ymd(stem: &str) -> bool {
    YMD_PATTERN.is_match(stem)
}

/// True when `stem` starts with a valid `YYYY-MM-DD HH.MM.SS` timestamp.
///
/// ```
/// use datedir::date_extractor::matches_ymdhms;
///
/// assert!(matches_ymdhms("2021-03-04 10.00.00"));
/// assert!(matches_ymdhms("2021-03-04 10.00.00-1"));
/// assert!(!matches_ymdhms("2021-03-04 24.00.00"));
/// ```
pub fn matches_ymdhms(stem: &str) -> bool {
    YMDHMS_PATTERN.is_match(stem)
}

/// Reads the modification time of `path` in local time.
///
/// Follows symlinks, so a dangling link reports `SourceMissing` like a
/// vanished file.
pub fn modified_at(path: &Path) -> Result<DateTime<Local>, FileError> {
    let metadata = fs::metadata(path).map_err(|e| FileError::metadata(path, e))?;
    let modified = metadata.modified().map_err(|e| FileError::metadata(path, e))?;
    Ok(DateTime::<Local>::from(modified))
}

/// The directory year for a file: the embedded YMD year if present,
/// otherwise the modification year.
pub fn year(stem: &str, modified_at: &DateTime<Local>) -> String {
    match ymd_year(stem) {
        Some(year) => year.to_string(),
        None => modified_at.format("%Y").to_string(),
    }
}

/// `YYYY-MM-DD HH.MM.SS` for the given time.
pub fn timestamp_stem(modified_at: &DateTime<Local>) -> String {
    modified_at.format(DATETIME_FORMAT).to_string()
}

/// `YYYY-MM-DD` for the given time.
pub fn date_prefix(modified_at: &DateTime<Local>) -> String {
    modified_at.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs::File;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_ymd_is_permissive() {
        assert_eq!(ymd_year("2020-02-31-notes"), Some("2020"));
        assert_eq!(ymd_year("1999-00-00 scan"), Some("1999"));
        assert_eq!(ymd_year("2021-12-31"), Some("2021"));
        assert!(matches_ymd("2020-02-31-notes"));
    }

    #[test]
    fn test_ymd_rejects_out_of_range() {
        assert_eq!(ymd_year("2020-13-01"), None);
        assert_eq!(ymd_year("2020-01-32"), None);
        assert_eq!(ymd_year("20-01-01"), None);
        assert_eq!(ymd_year("IMG_2020-01-01"), None);
    }

    #[test]
    fn test_ymdhms_is_strict() {
        assert!(matches_ymdhms("2021-03-04 10.00.00"));
        assert!(matches_ymdhms("1987-12-31 23.59.01"));
        assert!(!matches_ymdhms("2021-00-04 10.00.00"));
        assert!(!matches_ymdhms("2021-03-00 10.00.00"));
        assert!(!matches_ymdhms("2021-03-04 10.60.00"));
        assert!(!matches_ymdhms("2021-03-04 10:00:00"));
        assert!(!matches_ymdhms("2021-03-04-holiday"));
    }

    #[test]
    fn test_year_prefers_embedded_date() {
        let modified = local(2023, 6, 1, 12, 0, 0);
        assert_eq!(year("2020-02-31-notes", &modified), "2020");
        assert_eq!(year("notes", &modified), "2023");
    }

    #[test]
    fn test_formats_are_zero_padded() {
        let modified = local(2021, 3, 4, 9, 5, 7);
        assert_eq!(timestamp_stem(&modified), "2021-03-04 09.05.07");
        assert_eq!(date_prefix(&modified), "2021-03-04");
    }

    #[test]
    fn test_modified_at_reads_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("IMG.jpg");
        let file = File::create(&path).unwrap();
        let when = local(2021, 3, 4, 10, 0, 0);
        file.set_modified(SystemTime::from(when)).unwrap();

        assert_eq!(modified_at(&path).unwrap(), when);
    }

    #[test]
    fn test_modified_at_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = modified_at(&temp_dir.path().join("gone.jpg"));
        assert!(matches!(result, Err(FileError::SourceMissing { .. })));
    }
}
