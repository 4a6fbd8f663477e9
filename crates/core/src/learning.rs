use chrono::{DateTime, Utc};

use crate::model::{Category, Progress, TutorialId};

/// One tutorial card on the learning overview.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningItem {
    pub tutorial_id: TutorialId,
    pub title: String,
    pub category: Category,
    pub image_url: String,
    pub completed_steps: u32,
    /// Step count, at least 1.
    pub total_steps: u32,
    pub percent: f64,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_completed: bool,
}

/// A user's progress split into unfinished and finished tutorials.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LearningOverview {
    pub in_progress: Vec<LearningItem>,
    pub completed: Vec<LearningItem>,
}

impl LearningOverview {
    /// Records whose tutorial was deleted or not embedded are skipped. Input order is kept within each list.
    #[must_use]
    pub fn from_records(records: &[Progress]) -> Self {
        let mut overview = Self::default();
        for record in records {
            let Some(tutorial) = record.tutorial.tutorial() else {
                continue;
            };
            let step_count = tutorial.step_count();
            let item = LearningItem {
                tutorial_id: tutorial.id.clone(),
                title: tutorial.title.clone(),
                category: tutorial.category.clone(),
                image_url: tutorial.image_url.clone(),
                completed_steps: record.completed_count(),
                total_steps: step_count.max(1),
                percent: record.percent_of(step_count),
                updated_at: record.updated_at,
                is_completed: record.is_completed,
            };
            if record.is_completed {
                overview.completed.push(item);
            } else {
                overview.in_progress.push(item);
            }
        }
        overview
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.in_progress.is_empty() && self.completed.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.in_progress.len() + self.completed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, Step, Tutorial, TutorialRef};
    use crate::time::fixed_now;

    fn embedded(id: &str, steps: u32) -> TutorialRef {
        TutorialRef::Embedded(Box::new(Tutorial {
            id: TutorialId::new(id),
            title: format!("Tutorial {id}"),
            description: String::new(),
            category: Category::new("Listrik"),
            difficulty: Difficulty::Pemula,
            duration: 15,
            image_url: String::new(),
            video_url: None,
            author: "Admin".into(),
            created_at: None,
            steps: (1..=steps)
                .map(|n| Step {
                    step_number: n,
                    title: format!("s{n}"),
                    description: String::new(),
                    image_url: None,
                    video_url: None,
                    safety_note: None,
                })
                .collect(),
            materials: Vec::new(),
            is_active: true,
            version: 0,
        }))
    }

    fn record(tutorial: TutorialRef, steps: &[u32], count: u32) -> Progress {
        let mut progress = Progress::new(tutorial);
        for step in steps {
            progress.record_step(*step, count, fixed_now()).unwrap();
        }
        progress
    }

    #[test]
    fn splits_by_completion() {
        let records = vec![
            record(embedded("a", 4), &[1], 4),
            record(embedded("b", 2), &[1, 2], 2),
            record(TutorialRef::Id(TutorialId::new("unpopulated")), &[1], 1),
            Progress::new(TutorialRef::Missing),
        ];
        let overview = LearningOverview::from_records(&records);
        assert_eq!(overview.total(), 2);
        assert_eq!(overview.in_progress[0].tutorial_id, TutorialId::new("a"));
        assert!((overview.in_progress[0].percent - 25.0).abs() < f64::EPSILON);
        assert_eq!(overview.completed[0].completed_steps, 2);
        assert_eq!(overview.completed[0].updated_at, Some(fixed_now()));
    }

    #[test]
    fn stepless_tutorial_counts_one_step() {
        let mut progress = Progress::new(embedded("z", 0));
        progress.is_completed = false;
        let overview = LearningOverview::from_records(&[progress]);
        assert_eq!(overview.in_progress[0].total_steps, 1);
        assert!(overview.in_progress[0].percent.abs() < f64::EPSILON);
    }
}
