//! Destination stems per naming regime.

use chrono::{DateTime, Local};
use std::collections::BTreeSet;

use crate::date_extractor;
use crate::file_category::Category;

/// How a category's files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingRegime {
    /// `YYYY-MM-DD HH.MM.SS` from the modification time.
    Timestamp,
    /// `YYYY-MM-DD-{original stem}` from the modification date.
    DatePrefixed,
}

/// Builds candidate stems. Which categories use [`NamingRegime::Timestamp`]
/// comes from configuration; every other category is date-prefixed.
#[derive(Debug, Clone)]
pub struct NameComposer {
    timestamp_categories: BTreeSet<String>,
}

impl NameComposer {
    pub fn new<I, S>(timestamp_categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            timestamp_categories: timestamp_categories.into_iter().map(Into::into).collect(),
        }
    }

    pub fn regime(&self, category: &Category) -> NamingRegime {
        if self.timestamp_categories.contains(category.label()) {
            NamingRegime::Timestamp
        } else {
            NamingRegime::DatePrefixed
        }
    }

    /// Candidate stem for a file, not yet checked for collisions.
    ///
    /// Stems already in the target form are returned unchanged, so running
    /// twice over an organized tree renames nothing.
    ///
    /// ```
    /// use chrono::{Local, TimeZone};
    /// use datedir::file_category::Category;
    /// use datedir::name_composer::NameComposer;
    ///
    /// let composer = NameComposer::new(["photos", "videos"]);
    /// let modified = Local.with_ymd_and_hms(2021, 3, 4, 10, 0, 0).unwrap();
    ///
    /// let photos = Category::new("photos");
    /// assert_eq!(composer.compose(&photos, "IMG", &modified, false), "2021-03-04 10.00.00");
    ///
    /// let documents = Category::new("documents");
    /// assert_eq!(composer.compose(&documents, "notes", &modified, false), "2021-03-04-notes");
    /// ```
    pub fn compose(
        &self,
        category: &Category,
        original_stem: &str,
        modified_at: &DateTime<Local>,
        ymd_matched: bool,
    ) -> String {
        match self.regime(category) {
            NamingRegime::Timestamp if date_extractor::matches_ymdhms(original_stem) => {
                original_stem.to_string()
            }
            NamingRegime::Timestamp => date_extractor::timestamp_stem(modified_at),
            NamingRegime::DatePrefixed if ymd_matched => original_stem.to_string(),
            NamingRegime::DatePrefixed => format!(
                "{}-{}",
                date_extractor::date_prefix(modified_at),
                original_stem
            ),
        }
    }
}

impl Default for NameComposer {
    fn default() -> Self {
        Self::new(["photos", "videos"])
    }
}
