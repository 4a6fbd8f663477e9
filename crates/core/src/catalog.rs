//! Catalog query engine: filter and order a fetched tutorial list.
//!
//! `CatalogQuery::apply` is a pure function of its inputs and can be re-run on
//! every keystroke. All predicates are ANDed; ordering is applied after
//! filtering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Category, Difficulty, ProgressIndex, ProgressStatus, Tutorial};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("unknown sort key: {0}")]
    UnknownSortKey(String),
}

//
// ─── SORT ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Keep backend order.
    #[default]
    None,
    DurationAsc,
    DurationDesc,
    CreatedAsc,
    CreatedDesc,
}

impl SortKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::DurationAsc => "duration-asc",
            Self::DurationDesc => "duration-desc",
            Self::CreatedAsc => "created-asc",
            Self::CreatedDesc => "created-desc",
        }
    }

    /// Stable in-place ordering.
    pub fn sort(self, tutorials: &mut [Tutorial]) {
        match self {
            Self::None => {}
            Self::DurationAsc => tutorials.sort_by_key(|t| t.duration),
            Self::DurationDesc => tutorials.sort_by(|a, b| b.duration.cmp(&a.duration)),
            Self::CreatedAsc => tutorials.sort_by_key(Tutorial::created_or_epoch),
            Self::CreatedDesc => {
                tutorials.sort_by(|a, b| b.created_or_epoch().cmp(&a.created_or_epoch()));
            }
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "none" => Ok(Self::None),
            "duration-asc" => Ok(Self::DurationAsc),
            "duration-desc" => Ok(Self::DurationDesc),
            "created-asc" => Ok(Self::CreatedAsc),
            "created-desc" => Ok(Self::CreatedDesc),
            other => Err(CatalogError::UnknownSortKey(other.to_owned())),
        }
    }
}

//
// ─── SERVER FILTER ─────────────────────────────────────────────────────────────
//

/// Filter the backend applies before the list reaches the client
/// (`GET /tutorials?category=&difficulty=`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TutorialFilter {
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
}

impl TutorialFilter {
    /// Query pairs for the request URL; absent filters are omitted.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(category) = self.category.as_ref().filter(|c| !c.is_all()) {
            pairs.push(("category", category.as_str().to_owned()));
        }
        if let Some(difficulty) = self.difficulty {
            pairs.push(("difficulty", difficulty.as_str().to_owned()));
        }
        pairs
    }

    #[must_use]
    pub fn matches(&self, tutorial: &Tutorial) -> bool {
        let category_ok = self
            .category
            .as_ref()
            .is_none_or(|c| c.is_all() || *c == tutorial.category);
        let difficulty_ok = self.difficulty.is_none_or(|d| d == tutorial.difficulty);
        category_ok && difficulty_ok
    }
}

//
// ─── QUERY ─────────────────────────────────────────────────────────────────────
//

/// The viewer's current catalog selections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub search: String,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
    /// Only evaluated when the viewer's progress is supplied.
    pub status: Option<ProgressStatus>,
    pub sort: SortKey,
}

impl CatalogQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: Option<Category>) -> Self {
        self.category = category.filter(|c| !c.is_all());
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Option<Difficulty>) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: Option<ProgressStatus>) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    /// Part of the query the backend can evaluate.
    #[must_use]
    pub fn server_filter(&self) -> TutorialFilter {
        TutorialFilter {
            category: self.category.clone(),
            difficulty: self.difficulty,
        }
    }

    fn matches_text(&self, needle: &str, tutorial: &Tutorial) -> bool {
        needle.is_empty()
            || tutorial.title.to_lowercase().contains(needle)
            || tutorial.description.to_lowercase().contains(needle)
    }

    fn matches_status(&self, progress: Option<&ProgressIndex>, tutorial: &Tutorial) -> bool {
        match (self.status, progress) {
            (Some(wanted), Some(index)) => index.status_of(&tutorial.id) == wanted,
            _ => true,
        }
    }

    /// Filter then sort. `progress` is `Some` only for a signed-in viewer.
    #[must_use]
    pub fn apply(&self, tutorials: &[Tutorial], progress: Option<&ProgressIndex>) -> Vec<Tutorial> {
        let needle = self.search.trim().to_lowercase();
        let filter = self.server_filter();
        let mut view: Vec<Tutorial> = tutorials
            .iter()
            .filter(|t| {
                self.matches_text(&needle, t)
                    && filter.matches(t)
                    && self.matches_status(progress, t)
            })
            .cloned()
            .collect();
        self.sort.sort(&mut view);
        view
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Progress, TutorialId, TutorialRef};
    use crate::time::fixed_now;
    use chrono::{Duration, TimeZone, Utc};

    fn tutorial(id: &str, title: &str, duration: u32) -> Tutorial {
        Tutorial {
            id: TutorialId::new(id),
            title: title.to_owned(),
            description: format!("Belajar {title}"),
            category: Category::new("Listrik"),
            difficulty: Difficulty::Pemula,
            duration,
            image_url: String::new(),
            video_url: None,
            author: "Admin".into(),
            created_at: None,
            steps: Vec::new(),
            materials: Vec::new(),
            is_active: true,
            version: 0,
        }
    }

    fn ids(list: &[Tutorial]) -> Vec<&str> {
        list.iter().map(|t| t.id.as_str()).collect()
    }

    fn progress(id: &str, steps: &[u32], step_count: u32) -> Progress {
        let mut p = Progress::new(TutorialRef::Id(TutorialId::new(id)));
        for step in steps {
            p.record_step(*step, step_count, fixed_now()).unwrap();
        }
        p
    }

    #[test]
    fn sorts_by_duration_both_ways() {
        let list = vec![
            tutorial("a", "A", 30),
            tutorial("b", "B", 10),
            tutorial("c", "C", 20),
        ];
        let asc = CatalogQuery::new().with_sort(SortKey::DurationAsc).apply(&list, None);
        assert_eq!(asc.iter().map(|t| t.duration).collect::<Vec<_>>(), vec![10, 20, 30]);

        let desc = CatalogQuery::new().with_sort(SortKey::DurationDesc).apply(&list, None);
        assert_eq!(desc.iter().map(|t| t.duration).collect::<Vec<_>>(), vec![30, 20, 10]);
    }

    #[test]
    fn none_sort_keeps_backend_order() {
        let list = vec![tutorial("z", "Z", 5), tutorial("a", "A", 1)];
        assert_eq!(ids(&CatalogQuery::new().apply(&list, None)), vec!["z", "a"]);
    }

    #[test]
    fn created_sort_treats_missing_timestamp_as_epoch() {
        let mut old = tutorial("old", "Old", 1);
        old.created_at = Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        let mut new = tutorial("new", "New", 1);
        new.created_at = Some(old.created_at.unwrap() + Duration::days(30));
        let undated = tutorial("undated", "Undated", 1);
        let list = vec![new, undated, old];

        let asc = CatalogQuery::new().with_sort(SortKey::CreatedAsc).apply(&list, None);
        assert_eq!(ids(&asc), vec!["undated", "old", "new"]);

        let desc = CatalogQuery::new().with_sort(SortKey::CreatedDesc).apply(&list, None);
        assert_eq!(ids(&desc), vec!["new", "old", "undated"]);
    }

    #[test]
    fn search_matches_title_or_description_case_insensitively() {
        let mut wiring = tutorial("w", "Kabel Lampu", 10);
        wiring.description = "Memasang FITTING".into();
        let list = vec![wiring, tutorial("p", "Pipa Bocor", 10)];

        let by_title = CatalogQuery::new().with_search("kabel").apply(&list, None);
        assert_eq!(ids(&by_title), vec!["w"]);

        let by_description = CatalogQuery::new().with_search(" fitting ").apply(&list, None);
        assert_eq!(ids(&by_description), vec!["w"]);

        let none = CatalogQuery::new().with_search("genteng").apply(&list, None);
        assert!(none.is_empty());
    }

    #[test]
    fn category_and_difficulty_are_reapplied() {
        let mut paint = tutorial("p", "Cat", 10);
        paint.category = Category::new("Pengecatan");
        paint.difficulty = Difficulty::Lanjutan;
        let list = vec![tutorial("l", "Listrik", 10), paint];

        let painting = CatalogQuery::new()
            .with_category(Some(Category::new("Pengecatan")))
            .apply(&list, None);
        assert_eq!(ids(&painting), vec!["p"]);

        let beginner = CatalogQuery::new()
            .with_difficulty(Some(Difficulty::Pemula))
            .apply(&list, None);
        assert_eq!(ids(&beginner), vec!["l"]);

        let everything = CatalogQuery::new()
            .with_category(Some(Category::new(Category::ALL_LABEL)))
            .apply(&list, None);
        assert_eq!(everything.len(), 2);
    }

    #[test]
    fn completed_filter_returns_only_completed() {
        let list = vec![tutorial("A", "A", 1), tutorial("B", "B", 1), tutorial("C", "C", 1)];
        let index = ProgressIndex::from_records([
            progress("A", &[1, 2], 2),
            progress("B", &[1], 2),
        ]);

        let completed = CatalogQuery::new()
            .with_status(Some(ProgressStatus::Completed))
            .apply(&list, Some(&index));
        assert_eq!(ids(&completed), vec!["A"]);

        let in_progress = CatalogQuery::new()
            .with_status(Some(ProgressStatus::InProgress))
            .apply(&list, Some(&index));
        assert_eq!(ids(&in_progress), vec!["B"]);

        let not_started = CatalogQuery::new()
            .with_status(Some(ProgressStatus::NotStarted))
            .apply(&list, Some(&index));
        assert_eq!(ids(&not_started), vec!["C"]);
    }

    #[test]
    fn empty_record_counts_as_not_started() {
        let list = vec![tutorial("A", "A", 1)];
        let index = ProgressIndex::from_records([progress("A", &[], 3)]);
        let not_started = CatalogQuery::new()
            .with_status(Some(ProgressStatus::NotStarted))
            .apply(&list, Some(&index));
        assert_eq!(ids(&not_started), vec!["A"]);
    }

    #[test]
    fn status_filter_is_ignored_without_a_session() {
        let list = vec![tutorial("A", "A", 1), tutorial("B", "B", 1)];
        let view = CatalogQuery::new()
            .with_status(Some(ProgressStatus::Completed))
            .apply(&list, None);
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn filtering_is_idempotent() {
        let list = vec![
            tutorial("a", "Kabel", 30),
            tutorial("b", "Pipa", 10),
            tutorial("c", "Kabel Tanah", 20),
        ];
        let index = ProgressIndex::from_records([progress("c", &[1], 3)]);
        let query = CatalogQuery::new()
            .with_search("kabel")
            .with_status(Some(ProgressStatus::NotStarted))
            .with_sort(SortKey::DurationAsc);

        let once = query.apply(&list, Some(&index));
        let twice = query.apply(&once, Some(&index));
        assert_eq!(once, twice);
        assert_eq!(ids(&once), vec!["a"]);
    }

    #[test]
    fn server_filter_query_pairs() {
        let query = CatalogQuery::new()
            .with_category(Some(Category::new("Plambing")))
            .with_difficulty(Some(Difficulty::Menengah));
        assert_eq!(
            query.server_filter().query_pairs(),
            vec![
                ("category", "Plambing".to_owned()),
                ("difficulty", "Menengah".to_owned())
            ]
        );
        assert!(TutorialFilter::default().query_pairs().is_empty());
    }

    #[test]
    fn sort_key_round_trips_wire_strings() {
        for key in [
            SortKey::None,
            SortKey::DurationAsc,
            SortKey::DurationDesc,
            SortKey::CreatedAsc,
            SortKey::CreatedDesc,
        ] {
            assert_eq!(key.as_str().parse::<SortKey>().unwrap(), key);
        }
        assert!("title-asc".parse::<SortKey>().is_err());
    }
}
