use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::TutorialId;
use crate::model::validation::ValidationErrors;
use crate::model::wire::{blank_as_none, default_true, null_as_empty};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TutorialError {
    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Difficulty tier of a tutorial, using the backend's wire labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Pemula,
    Menengah,
    Lanjutan,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Pemula, Self::Menengah, Self::Lanjutan];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pemula => "Pemula",
            Self::Menengah => "Menengah",
            Self::Lanjutan => "Lanjutan",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = TutorialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TutorialError::UnknownDifficulty(s.to_owned()))
    }
}

//
// ─── CATEGORY ──────────────────────────────────────────────────────────────────
//

/// Tutorial category.
///
/// The backend treats categories as free strings; the catalog ships a known
/// set. `Semua` ("all") is a UI pseudo-category and never filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub const ALL_LABEL: &'static str = "Semua";
    pub const KNOWN: [&'static str; 5] = [
        "Pertukangan Kayu",
        "Pengecatan",
        "Listrik",
        "Plambing",
        "Perawatan",
    ];

    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_owned())
    }

    /// Parses a category selection; blank or `Semua` means "no filter".
    #[must_use]
    pub fn selection(raw: &str) -> Option<Self> {
        let category = Self::new(raw);
        if category.is_all() { None } else { Some(category) }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_all(&self) -> bool {
        self.0.is_empty() || self.0 == Self::ALL_LABEL
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        Self::KNOWN.contains(&self.0.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── STEP / MATERIAL ───────────────────────────────────────────────────────────
//

/// One instructional unit of a tutorial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// 1-based position; contiguous across a tutorial.
    pub step_number: u32,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub safety_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub quantity: String,
}

//
// ─── TUTORIAL ──────────────────────────────────────────────────────────────────
//

/// Immutable snapshot of a tutorial as returned by one backend fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tutorial {
    #[serde(rename = "_id")]
    pub id: TutorialId,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub category: Category,
    pub difficulty: Difficulty,
    /// Minutes.
    #[serde(default)]
    pub duration: u32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image_url: String,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Optimistic-concurrency token for step-list replacement.
    #[serde(default)]
    pub version: u64,
}

impl Tutorial {
    #[must_use]
    pub fn step_count(&self) -> u32 {
        u32::try_from(self.steps.len()).unwrap_or(u32::MAX)
    }

    /// Creation time, with a missing timestamp treated as the epoch.
    #[must_use]
    pub fn created_or_epoch(&self) -> DateTime<Utc> {
        self.created_at.unwrap_or_default()
    }

    #[must_use]
    pub fn duration_label(&self) -> String {
        format!("{} menit", self.duration)
    }

    /// Step at a 0-based position.
    #[must_use]
    pub fn step_at(&self, index: u32) -> Option<&Step> {
        self.steps.get(usize::try_from(index).ok()?)
    }
}

//
// ─── ADMIN DRAFTS ──────────────────────────────────────────────────────────────
//

/// Raw tutorial form input, validated into a `NewTutorial`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TutorialDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: String,
    pub duration: String,
    pub image_url: String,
    pub video_url: String,
    pub author: String,
}

/// Create payload for `POST /tutorials`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTutorial {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub duration: u32,
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub author: String,
    pub steps: Vec<Step>,
    pub materials: Vec<Material>,
}

impl TutorialDraft {
    pub const DEFAULT_DESCRIPTION: &'static str = "Tutorial baru";
    pub const DEFAULT_AUTHOR: &'static str = "Admin";

    /// Validate the form. Title, category, difficulty and a positive duration
    /// are required; description and author fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns field-keyed `ValidationErrors` for every missing or malformed field.
    pub fn validate(self) -> Result<NewTutorial, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = self.title.trim().to_owned();
        if title.is_empty() {
            errors.insert("title", "Judul wajib diisi");
        }

        let category = Category::selection(&self.category);
        if category.is_none() {
            errors.insert("category", "Kategori wajib diisi");
        }

        let difficulty = if self.difficulty.trim().is_empty() {
            errors.insert("difficulty", "Tingkat kesulitan wajib diisi");
            None
        } else {
            match self.difficulty.parse::<Difficulty>() {
                Ok(d) => Some(d),
                Err(_) => {
                    errors.insert("difficulty", "Tingkat kesulitan tidak valid");
                    None
                }
            }
        };

        let duration = match self.duration.trim().parse::<u32>() {
            Ok(minutes) if minutes > 0 => Some(minutes),
            _ => {
                errors.insert("duration", "Durasi wajib diisi");
                None
            }
        };

        let (Some(category), Some(difficulty), Some(duration)) = (category, difficulty, duration)
        else {
            return Err(errors);
        };

        let description = match self.description.trim() {
            "" => Self::DEFAULT_DESCRIPTION.to_owned(),
            text => text.to_owned(),
        };
        let author = match self.author.trim() {
            "" => Self::DEFAULT_AUTHOR.to_owned(),
            name => name.to_owned(),
        };
        let video_url = Some(self.video_url.trim().to_owned()).filter(|v| !v.is_empty());

        errors.into_result(NewTutorial {
            title,
            description,
            category,
            difficulty,
            duration,
            image_url: self.image_url.trim().to_owned(),
            video_url,
            author,
            steps: Vec::new(),
            materials: Vec::new(),
        })
    }
}

/// Partial update payload for `PUT /tutorials/:id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorialPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl TutorialPatch {
    /// Patch that flips only the active flag.
    #[must_use]
    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }

    /// Patch carrying every field of a validated form.
    #[must_use]
    pub fn from_new(new: NewTutorial) -> Self {
        Self {
            title: Some(new.title),
            description: Some(new.description),
            category: Some(new.category),
            difficulty: Some(new.difficulty),
            duration: Some(new.duration),
            image_url: Some(new.image_url),
            video_url: new.video_url,
            author: Some(new.author),
            is_active: None,
        }
    }

    /// Apply the patch to a snapshot.
    pub fn apply_to(&self, tutorial: &mut Tutorial) {
        if let Some(title) = &self.title {
            tutorial.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            tutorial.description.clone_from(description);
        }
        if let Some(category) = &self.category {
            tutorial.category = category.clone();
        }
        if let Some(difficulty) = self.difficulty {
            tutorial.difficulty = difficulty;
        }
        if let Some(duration) = self.duration {
            tutorial.duration = duration;
        }
        if let Some(image_url) = &self.image_url {
            tutorial.image_url.clone_from(image_url);
        }
        if let Some(video_url) = &self.video_url {
            tutorial.video_url = Some(video_url.clone()).filter(|v| !v.is_empty());
        }
        if let Some(author) = &self.author {
            tutorial.author.clone_from(author);
        }
        if let Some(is_active) = self.is_active {
            tutorial.is_active = is_active;
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
