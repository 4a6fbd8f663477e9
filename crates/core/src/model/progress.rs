use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::TutorialId;
use crate::model::tutorial::Tutorial;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("step number must be >= 1")]
    ZeroStep,
    #[error("step {step} is beyond the tutorial's {step_count} steps")]
    StepOutOfRange { step: u32, step_count: u32 },
    #[error("unknown progress status: {0}")]
    UnknownStatus(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Where a viewer stands on one tutorial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    /// Status of a tutorial given the viewer's record for it, if any.
    #[must_use]
    pub fn of(progress: Option<&Progress>) -> Self {
        progress.map_or(Self::NotStarted, Progress::status)
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressStatus {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "not-started" => Ok(Self::NotStarted),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(ProgressError::UnknownStatus(other.to_owned())),
        }
    }
}

//
// ─── TUTORIAL REFERENCE ────────────────────────────────────────────────────────
//

/// The backend returns either a bare id or the populated tutorial, and
/// `null` once the tutorial has been deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TutorialRef {
    #[default]
    Missing,
    Embedded(Box<Tutorial>),
    Id(TutorialId),
}

impl TutorialRef {
    /// `None` for a deleted tutorial.
    #[must_use]
    pub fn id(&self) -> Option<&TutorialId> {
        match self {
            Self::Missing => None,
            Self::Embedded(tutorial) => Some(&tutorial.id),
            Self::Id(id) => Some(id),
        }
    }

    #[must_use]
    pub fn tutorial(&self) -> Option<&Tutorial> {
        match self {
            Self::Embedded(tutorial) => Some(tutorial),
            Self::Missing | Self::Id(_) => None,
        }
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// One user's completion record against one tutorial.
///
/// `is_completed` holds iff the number of completed steps reached the
/// tutorial's step count when the record was last written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default)]
    pub tutorial: TutorialRef,
    #[serde(default)]
    pub completed_steps: BTreeSet<u32>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Progress {
    /// Fresh record with nothing completed.
    #[must_use]
    pub fn new(tutorial: TutorialRef) -> Self {
        Self {
            tutorial,
            completed_steps: BTreeSet::new(),
            is_completed: false,
            updated_at: None,
        }
    }

    /// `None` when the tutorial no longer exists.
    #[must_use]
    pub fn tutorial_id(&self) -> Option<&TutorialId> {
        self.tutorial.id()
    }

    #[must_use]
    pub fn completed_count(&self) -> u32 {
        u32::try_from(self.completed_steps.len()).unwrap_or(u32::MAX)
    }

    /// Highest completed step number, the resume point.
    #[must_use]
    pub fn furthest_step(&self) -> Option<u32> {
        self.completed_steps.last().copied()
    }

    #[must_use]
    pub fn status(&self) -> ProgressStatus {
        if self.is_completed {
            ProgressStatus::Completed
        } else if self.completed_steps.is_empty() {
            ProgressStatus::NotStarted
        } else {
            ProgressStatus::InProgress
        }
    }

    /// Record a completed step and re-derive `is_completed`.
    ///
    /// A record whose step count is zero is complete as soon as it is written.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` when `step` is 0 or beyond `step_count`.
    pub fn record_step(
        &mut self,
        step: u32,
        step_count: u32,
        now: DateTime<Utc>,
    ) -> Result<(), ProgressError> {
        if step == 0 {
            return Err(ProgressError::ZeroStep);
        }
        if step > step_count {
            return Err(ProgressError::StepOutOfRange { step, step_count });
        }
        self.completed_steps.insert(step);
        self.is_completed = self.completed_count() >= step_count;
        self.updated_at = Some(now);
        Ok(())
    }

    /// Completed/total ratio in percent for the learning overview.
    ///
    /// A tutorial without steps counts as one step so the ratio stays defined.
    #[must_use]
    pub fn percent_of(&self, step_count: u32) -> f64 {
        let total = f64::from(step_count.max(1));
        let done = f64::from(self.completed_count().min(step_count.max(1)));
        done / total * 100.0
    }
}

//
// ─── INDEX ─────────────────────────────────────────────────────────────────────
//

/// A viewer's progress records keyed by tutorial.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressIndex {
    by_tutorial: HashMap<TutorialId, Progress>,
}

impl ProgressIndex {
    /// Later duplicates replace earlier ones. Records of deleted tutorials
    /// are dropped.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = Progress>) -> Self {
        let by_tutorial = records
            .into_iter()
            .filter_map(|p| p.tutorial_id().cloned().map(|id| (id, p)))
            .collect();
        Self { by_tutorial }
    }

    #[must_use]
    pub fn get(&self, id: &TutorialId) -> Option<&Progress> {
        self.by_tutorial.get(id)
    }

    #[must_use]
    pub fn status_of(&self, id: &TutorialId) -> ProgressStatus {
        ProgressStatus::of(self.get(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_tutorial.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_tutorial.is_empty()
    }

    /// Records of deleted tutorials are ignored.
    pub fn upsert(&mut self, progress: Progress) {
        if let Some(id) = progress.tutorial_id().cloned() {
            self.by_tutorial.insert(id, progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn record(id: &str) -> Progress {
        Progress::new(TutorialRef::Id(TutorialId::new(id)))
    }

    #[test]
    fn status_follows_completed_steps() {
        let mut progress = record("t1");
        assert_eq!(progress.status(), ProgressStatus::NotStarted);

        progress.record_step(1, 3, fixed_now()).unwrap();
        assert_eq!(progress.status(), ProgressStatus::InProgress);

        progress.record_step(2, 3, fixed_now()).unwrap();
        progress.record_step(3, 3, fixed_now()).unwrap();
        assert!(progress.is_completed);
        assert_eq!(progress.status(), ProgressStatus::Completed);
        assert_eq!(progress.updated_at, Some(fixed_now()));
    }

    #[test]
    fn recording_the_same_step_twice_is_idempotent() {
        let mut progress = record("t1");
        progress.record_step(2, 3, fixed_now()).unwrap();
        progress.record_step(2, 3, fixed_now()).unwrap();
        assert_eq!(progress.completed_count(), 1);
        assert!(!progress.is_completed);
    }

    #[test]
    fn record_step_rejects_out_of_range() {
        let mut progress = record("t1");
        assert_eq!(
            progress.record_step(0, 3, fixed_now()),
            Err(ProgressError::ZeroStep)
        );
        assert_eq!(
            progress.record_step(4, 3, fixed_now()),
            Err(ProgressError::StepOutOfRange { step: 4, step_count: 3 })
        );
        assert!(progress.completed_steps.is_empty());
    }

    #[test]
    fn missing_record_is_not_started() {
        let index = ProgressIndex::default();
        assert_eq!(index.status_of(&TutorialId::new("x")), ProgressStatus::NotStarted);
    }

    #[test]
    fn deserializes_progress_with_id_or_embedded_tutorial() {
        let bare: Progress = serde_json::from_str(
            r#"{"tutorial":"t9","completedSteps":[2,1],"isCompleted":false,"updatedAt":"2024-02-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(bare.tutorial_id(), Some(&TutorialId::new("t9")));
        assert_eq!(bare.furthest_step(), Some(2));

        let embedded: Progress = serde_json::from_str(
            r#"{"tutorial":{"_id":"t7","title":"x","category":"Listrik","difficulty":"Pemula",
                "steps":[{"stepNumber":1,"title":"a"}]},
               "completedSteps":[1],"isCompleted":true}"#,
        )
        .unwrap();
        assert_eq!(embedded.tutorial_id(), Some(&TutorialId::new("t7")));
        assert_eq!(embedded.tutorial.tutorial().map(Tutorial::step_count), Some(1));
        assert_eq!(embedded.status(), ProgressStatus::Completed);
    }

    #[test]
    fn deleted_tutorial_does_not_spoil_the_list() {
        let records: Vec<Progress> = serde_json::from_str(
            r#"[{"tutorial":null,"completedSteps":[1],"isCompleted":false},
                {"completedSteps":[],"isCompleted":false},
                {"tutorial":"t2","completedSteps":[1,2],"isCompleted":true}]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 3);
        assert!(records[0].tutorial.is_missing());
        assert!(records[1].tutorial.is_missing());
        assert_eq!(records[0].tutorial_id(), None);

        let index = ProgressIndex::from_records(records);
        assert_eq!(index.len(), 1);
        assert_eq!(index.status_of(&TutorialId::new("t2")), ProgressStatus::Completed);
    }

    #[test]
    fn upsert_ignores_records_without_a_tutorial() {
        let mut index = ProgressIndex::default();
        index.upsert(Progress::new(TutorialRef::Missing));
        assert!(index.is_empty());
        index.upsert(record("t1"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn percent_of_handles_zero_steps() {
        let mut progress = record("t1");
        assert!((progress.percent_of(0) - 0.0).abs() < f64::EPSILON);
        progress.record_step(1, 4, fixed_now()).unwrap();
        assert!((progress.percent_of(4) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn status_parses_wire_strings() {
        assert_eq!("in-progress".parse::<ProgressStatus>().unwrap(), ProgressStatus::InProgress);
        assert!("done".parse::<ProgressStatus>().is_err());
    }
}
