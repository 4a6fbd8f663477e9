//! Local editing of a tutorial's step list.
//!
//! Edits happen on a copy taken from one tutorial snapshot; the whole list is
//! written back in one request carrying the snapshot's version so a concurrent
//! edit is detected instead of silently overwritten.

use thiserror::Error;

use crate::model::{Step, Tutorial, TutorialId, ValidationErrors};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepError {
    #[error("no step at index {index} (list has {len})")]
    OutOfRange { index: usize, len: usize },
    #[error("step is already first")]
    AtTop,
    #[error("step is already last")]
    AtBottom,
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
}

/// Raw step form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepDraft {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub video_url: String,
    pub safety_note: String,
}

fn optional(value: &str) -> Option<String> {
    Some(value.trim().to_owned()).filter(|v| !v.is_empty())
}

impl StepDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Prefill a form from an existing step.
    #[must_use]
    pub fn from_step(step: &Step) -> Self {
        Self {
            title: step.title.clone(),
            description: step.description.clone(),
            image_url: step.image_url.clone().unwrap_or_default(),
            video_url: step.video_url.clone().unwrap_or_default(),
            safety_note: step.safety_note.clone().unwrap_or_default(),
        }
    }

    fn into_step(self, step_number: u32) -> Result<Step, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            errors.insert("title", "Judul langkah wajib diisi");
        }
        let description = self.description.trim().to_owned();
        if description.is_empty() {
            errors.insert("description", "Deskripsi langkah wajib diisi");
        }
        errors.into_result(Step {
            step_number,
            title,
            description,
            image_url: optional(&self.image_url),
            video_url: optional(&self.video_url),
            safety_note: optional(&self.safety_note),
        })
    }
}

/// Editable copy of one tutorial's steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepList {
    tutorial_id: TutorialId,
    version: u64,
    steps: Vec<Step>,
    dirty: bool,
}

impl StepList {
    #[must_use]
    pub fn from_tutorial(tutorial: &Tutorial) -> Self {
        let mut list = Self {
            tutorial_id: tutorial.id.clone(),
            version: tutorial.version,
            steps: tutorial.steps.clone(),
            dirty: false,
        };
        list.renumber();
        list
    }

    #[must_use]
    pub fn tutorial_id(&self) -> &TutorialId {
        &self.tutorial_id
    }

    /// Version of the snapshot this list was taken from.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Append a step; returns its step number.
    ///
    /// # Errors
    ///
    /// `StepError::Invalid` when title or description is blank.
    pub fn add(&mut self, draft: StepDraft) -> Result<u32, StepError> {
        let number = u32::try_from(self.steps.len() + 1).unwrap_or(u32::MAX);
        let step = draft.into_step(number)?;
        self.steps.push(step);
        self.touch();
        Ok(number)
    }

    /// Replace the step at `index`.
    ///
    /// # Errors
    ///
    /// `OutOfRange` for a bad index, `Invalid` for a blank title or description.
    pub fn edit(&mut self, index: usize, draft: StepDraft) -> Result<(), StepError> {
        self.check(index)?;
        let step = draft.into_step(self.steps[index].step_number)?;
        self.steps[index] = step;
        self.touch();
        Ok(())
    }

    /// # Errors
    ///
    /// `OutOfRange` for a bad index.
    pub fn remove(&mut self, index: usize) -> Result<Step, StepError> {
        self.check(index)?;
        let removed = self.steps.remove(index);
        self.touch();
        Ok(removed)
    }

    /// # Errors
    ///
    /// `AtTop` for the first step, `OutOfRange` for a bad index.
    pub fn move_up(&mut self, index: usize) -> Result<(), StepError> {
        self.check(index)?;
        if index == 0 {
            return Err(StepError::AtTop);
        }
        self.steps.swap(index - 1, index);
        self.touch();
        Ok(())
    }

    /// # Errors
    ///
    /// `AtBottom` for the last step, `OutOfRange` for a bad index.
    pub fn move_down(&mut self, index: usize) -> Result<(), StepError> {
        self.check(index)?;
        if index + 1 == self.steps.len() {
            return Err(StepError::AtBottom);
        }
        self.steps.swap(index, index + 1);
        self.touch();
        Ok(())
    }

    /// Take the list after a successful save so later edits target the new version.
    pub fn rebase(&mut self, saved: &Tutorial) {
        *self = Self::from_tutorial(saved);
    }

    #[must_use]
    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    fn check(&self, index: usize) -> Result<(), StepError> {
        if index < self.steps.len() {
            Ok(())
        } else {
            Err(StepError::OutOfRange {
                index,
                len: self.steps.len(),
            })
        }
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.renumber();
    }

    fn renumber(&mut self) {
        for (number, step) in (1u32..).zip(self.steps.iter_mut()) {
            step.step_number = number;
        }
    }
}
