use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use tutorial_core::Clock;
use tutorial_core::catalog::TutorialFilter;
use tutorial_core::media::{MediaHost, MediaKind};
use tutorial_core::model::{
    Address, AuthToken, Category, Credentials, Difficulty, Material, NewTutorial, Progress,
    Registration, Role, Session, Step, Tutorial, TutorialId, TutorialPatch, TutorialRef, User,
    UserId, UserPatch, UserProfile, ValidationErrors,
};

use super::{Backend, UploadedMedia};
use crate::error::ApiError;

struct Account {
    user: User,
    password: String,
}

#[derive(Default)]
struct State {
    tutorials: Vec<Tutorial>,
    accounts: Vec<Account>,
    tokens: HashMap<String, UserId>,
    progress: BTreeMap<(UserId, TutorialId), Progress>,
    media: HashMap<String, MediaKind>,
    failures: HashMap<&'static str, u32>,
    keep_orphaned_progress: bool,
    next_id: u64,
}

fn forbidden() -> ApiError {
    ApiError::Rejected {
        status: 403,
        message: "Akses ditolak".into(),
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::Rejected {
        status: 400,
        message: message.into(),
    }
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn take_failure(&mut self, op: &'static str) -> Result<(), ApiError> {
        match self.failures.get_mut(op) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(ApiError::Network(format!("injected failure in {op}")))
            }
            _ => Ok(()),
        }
    }

    fn user_for(&self, token: &AuthToken) -> Result<&User, ApiError> {
        let id = self
            .tokens
            .get(token.as_str())
            .ok_or(ApiError::Unauthorized)?;
        self.accounts
            .iter()
            .map(|a| &a.user)
            .find(|u| &u.id == id)
            .ok_or(ApiError::Unauthorized)
    }

    fn require_admin(&self, token: &AuthToken) -> Result<(), ApiError> {
        if self.user_for(token)?.is_admin() {
            Ok(())
        } else {
            Err(forbidden())
        }
    }

    fn tutorial_mut(&mut self, id: &TutorialId) -> Result<&mut Tutorial, ApiError> {
        self.tutorials
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or(ApiError::NotFound)
    }

    fn account_mut(&mut self, id: &UserId) -> Result<&mut Account, ApiError> {
        self.accounts
            .iter_mut()
            .find(|a| &a.user.id == id)
            .ok_or(ApiError::NotFound)
    }
}

/// In-process implementation of the backend contract.
///
/// Enforces the rules the client relies on: bearer tokens, admin-only
/// operations, unique email and username, progress completion, and the
/// version check on step-list replacement.
#[derive(Clone)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
    clock: Clock,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(Clock::default())
    }
}

impl InMemoryBackend {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, ApiError> {
        self.state
            .lock()
            .map_err(|e| ApiError::Network(e.to_string()))
    }

    /// Add or replace a tutorial.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the state lock is poisoned.
    pub fn put_tutorial(&self, tutorial: Tutorial) -> Result<(), ApiError> {
        let mut state = self.lock()?;
        state.tutorials.retain(|t| t.id != tutorial.id);
        state.tutorials.push(tutorial);
        Ok(())
    }

    /// Add an account with a plain password.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the state lock is poisoned.
    pub fn put_account(&self, user: User, password: &str) -> Result<(), ApiError> {
        let mut state = self.lock()?;
        state.accounts.retain(|a| a.user.id != user.id);
        state.accounts.push(Account {
            user,
            password: password.to_owned(),
        });
        Ok(())
    }

    /// Issue a token for an existing account without going through login.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown user.
    pub fn issue_token(&self, user_id: &UserId) -> Result<AuthToken, ApiError> {
        let mut state = self.lock()?;
        if !state.accounts.iter().any(|a| &a.user.id == user_id) {
            return Err(ApiError::NotFound);
        }
        let token = state.next_id("token-");
        state.tokens.insert(token.clone(), user_id.clone());
        Ok(AuthToken::new(token))
    }

    /// Make the next `times` calls of operation `op` fail with a network error.
    /// `op` is the `Backend` method name.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the state lock is poisoned.
    pub fn fail_next(&self, op: &'static str, times: u32) -> Result<(), ApiError> {
        self.lock()?.failures.insert(op, times);
        Ok(())
    }

    /// Keep progress records when their tutorial is deleted. Listing them
    /// then yields a record without a tutorial, as the real backend does.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the state lock is poisoned.
    pub fn keep_orphaned_progress(&self, keep: bool) -> Result<(), ApiError> {
        self.lock()?.keep_orphaned_progress = keep;
        Ok(())
    }

    /// Stored record, for inspection.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the state lock is poisoned.
    pub fn stored_progress(
        &self,
        user_id: &UserId,
        tutorial_id: &TutorialId,
    ) -> Result<Option<Progress>, ApiError> {
        let state = self.lock()?;
        Ok(state
            .progress
            .get(&(user_id.clone(), tutorial_id.clone()))
            .cloned())
    }

    /// A small catalog with one admin (`admin@example.com` / `admin123`) and
    /// one member (`budi@example.com` / `rahasia`).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network` if the state lock is poisoned.
    pub fn demo(clock: Clock) -> Result<Self, ApiError> {
        let backend = Self::new(clock);
        let now = clock.now();
        let step = |n: u32, title: &str, description: &str, safety: Option<&str>| Step {
            step_number: n,
            title: title.to_owned(),
            description: description.to_owned(),
            image_url: None,
            video_url: None,
            safety_note: safety.map(str::to_owned),
        };
        let tutorial = |id: &str,
                        title: &str,
                        category: &str,
                        difficulty: Difficulty,
                        duration: u32,
                        steps: Vec<Step>| Tutorial {
            id: TutorialId::new(id),
            title: title.to_owned(),
            description: format!("Panduan langkah demi langkah: {}", title.to_lowercase()),
            category: Category::new(category),
            difficulty,
            duration,
            image_url: String::new(),
            video_url: None,
            author: "Admin".into(),
            created_at: Some(now),
            steps,
            materials: vec![Material {
                name: "Sarung tangan".into(),
                quantity: "1 pasang".into(),
            }],
            is_active: true,
            version: 0,
        };

        backend.put_tutorial(tutorial(
            "keran-bocor",
            "Memperbaiki Keran Bocor",
            "Plambing",
            Difficulty::Pemula,
            30,
            vec![
                step(1, "Tutup katup air", "Matikan aliran air utama.", None),
                step(2, "Lepas kepala keran", "Buka mur pengikat dengan kunci inggris.", None),
                step(3, "Ganti karet seal", "Pasang karet baru lalu rakit kembali.", None),
            ],
        ))?;
        backend.put_tutorial(tutorial(
            "stop-kontak",
            "Memasang Stop Kontak",
            "Listrik",
            Difficulty::Menengah,
            45,
            vec![
                step(
                    1,
                    "Matikan MCB",
                    "Putus aliran listrik ke jalur yang dikerjakan.",
                    Some("Pastikan tidak ada tegangan dengan test pen."),
                ),
                step(2, "Pasang kotak", "Tanam inbow dus di dinding.", None),
                step(3, "Sambung kabel", "Fasa, netral dan ground ke terminal yang sesuai.", None),
                step(4, "Uji", "Nyalakan MCB dan uji dengan test pen.", None),
            ],
        ))?;
        backend.put_tutorial(tutorial(
            "cat-pagar",
            "Mengecat Pagar Kayu",
            "Pengecatan",
            Difficulty::Pemula,
            60,
            vec![
                step(1, "Amplas permukaan", "Haluskan kayu dan bersihkan debu.", None),
                step(2, "Cat dua lapis", "Beri jeda kering di antara lapisan.", None),
            ],
        ))?;

        let member = |id: &str, name: &str, email: &str, role: Role| User {
            id: UserId::new(id),
            name: name.to_owned(),
            username: id.to_owned(),
            email: email.to_owned(),
            role,
            profile: UserProfile {
                karang_taruna_name: "KT Mawar".into(),
                address: Address {
                    provinsi: "DI Yogyakarta".into(),
                    kabupaten_kota: "Bantul".into(),
                    kecamatan: "Sewon".into(),
                    jalan: "Jl. Parangtritis".into(),
                },
                ..UserProfile::default()
            },
            created_at: Some(now),
        };
        backend.put_account(member("admin", "Admin", "admin@example.com", Role::Admin), "admin123")?;
        backend.put_account(member("budi", "Budi Santoso", "budi@example.com", Role::User), "rahasia")?;
        Ok(backend)
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn list_tutorials(&self, filter: &TutorialFilter) -> Result<Vec<Tutorial>, ApiError> {
        let mut state = self.lock()?;
        state.take_failure("list_tutorials")?;
        Ok(state
            .tutorials
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn get_tutorial(&self, id: &TutorialId) -> Result<Tutorial, ApiError> {
        let mut state = self.lock()?;
        state.take_failure("get_tutorial")?;
        state.tutorial_mut(id).map(|t| t.clone())
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let mut state = self.lock()?;
        state.take_failure("login")?;
        let email = credentials.email.trim();
        let user = state
            .accounts
            .iter()
            .find(|a| a.user.email.eq_ignore_ascii_case(email) && a.password == credentials.password)
            .map(|a| a.user.clone())
            .ok_or_else(|| ApiError::Rejected {
                status: 401,
                message: "Email atau password salah".into(),
            })?;
        let token = state.next_id("token-");
        state.tokens.insert(token.clone(), user.id.clone());
        Ok(Session::new(user, AuthToken::new(token)))
    }

    async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let mut state = self.lock()?;
        state.take_failure("register")?;
        if state
            .accounts
            .iter()
            .any(|a| a.user.email.eq_ignore_ascii_case(&registration.email))
        {
            return Err(ValidationErrors::single("email", "Email sudah terdaftar").into());
        }
        if state
            .accounts
            .iter()
            .any(|a| a.user.username.eq_ignore_ascii_case(&registration.username))
        {
            return Err(ValidationErrors::single("username", "Username sudah digunakan").into());
        }
        let id = UserId::new(state.next_id("user-"));
        let user = User {
            id,
            name: registration.name.clone(),
            username: registration.username.clone(),
            email: registration.email.clone(),
            role: Role::User,
            profile: UserProfile {
                karang_taruna_name: registration.karang_taruna_name.clone(),
                address: Address {
                    provinsi: registration.provinsi.clone(),
                    kabupaten_kota: registration.kabupaten_kota.clone(),
                    kecamatan: registration.kecamatan.clone(),
                    jalan: registration.jalan.clone(),
                },
                phone: registration.phone.clone(),
                interests: registration.interests.clone(),
                skill_level: registration.skill_level,
                peran_anggota: registration.peran_anggota.clone(),
            },
            created_at: Some(self.clock.now()),
        };
        state.accounts.push(Account {
            user,
            password: registration.password.clone(),
        });
        Ok(())
    }

    async fn current_user(&self, token: &AuthToken) -> Result<User, ApiError> {
        let mut state = self.lock()?;
        state.take_failure("current_user")?;
        state.user_for(token).cloned()
    }

    async fn record_step_progress(
        &self,
        token: &AuthToken,
        tutorial_id: &TutorialId,
        step_number: u32,
        completed: bool,
    ) -> Result<Progress, ApiError> {
        let mut state = self.lock()?;
        state.take_failure("record_step_progress")?;
        let user_id = state.user_for(token)?.id.clone();
        let step_count = state.tutorial_mut(tutorial_id)?.step_count();
        let now = self.clock.now();

        let record = state
            .progress
            .entry((user_id, tutorial_id.clone()))
            .or_insert_with(|| Progress::new(TutorialRef::Id(tutorial_id.clone())));
        if completed {
            record
                .record_step(step_number, step_count, now)
                .map_err(|e| bad_request(e.to_string()))?;
        } else {
            record.completed_steps.remove(&step_number);
            record.is_completed = record.completed_count() >= step_count;
            record.updated_at = Some(now);
        }
        Ok(record.clone())
    }

    async fn get_progress(
        &self,
        token: &AuthToken,
        tutorial_id: &TutorialId,
    ) -> Result<Option<Progress>, ApiError> {
        let mut state = self.lock()?;
        state.take_failure("get_progress")?;
        let user_id = state.user_for(token)?.id.clone();
        Ok(state.progress.get(&(user_id, tutorial_id.clone())).cloned())
    }

    async fn list_user_progress(&self, token: &AuthToken) -> Result<Vec<Progress>, ApiError> {
        let mut state = self.lock()?;
        state.take_failure("list_user_progress")?;
        let user_id = state.user_for(token)?.id.clone();
        let records = state
            .progress
            .iter()
            .filter(|((owner, _), _)| owner == &user_id)
            .map(|((_, tutorial_id), record)| {
                let mut record = record.clone();
                record.tutorial = state
                    .tutorials
                    .iter()
                    .find(|t| &t.id == tutorial_id)
                    .map_or(TutorialRef::Missing, |tutorial| {
                        TutorialRef::Embedded(Box::new(tutorial.clone()))
                    });
                record
            })
            .collect();
        Ok(records)
    }

    async fn list_users(&self, token: &AuthToken) -> Result<Vec<User>, ApiError> {
        let mut state = self.lock()?;
        state.take_failure("list_users")?;
        state.require_admin(token)?;
        Ok(state.accounts.iter().map(|a| a.user.clone()).collect())
    }

    async fn update_user(
        &self,
        token: &AuthToken,
        id: &UserId,
        patch: &UserPatch,
    ) -> Result<User, ApiError> {
        let mut state = self.lock()?;
        state.take_failure("update_user")?;
        state.require_admin(token)?;
        if let Some(email) = &patch.email {
            if state
                .accounts
                .iter()
                .any(|a| &a.user.id != id && a.user.email.eq_ignore_ascii_case(email))
            {
                return Err(ValidationErrors::single("email", "Email sudah terdaftar").into());
            }
        }
        let account = state.account_mut(id)?;
        patch.apply_to(&mut account.user);
        if let Some(password) = patch.password.as_ref().filter(|p| !p.is_empty()) {
            account.password.clone_from(password);
        }
        Ok(account.user.clone())
    }

    async fn delete_user(&self, token: &AuthToken, id: &UserId) -> Result<(), ApiError> {
        let mut state = self.lock()?;
        state.take_failure("delete_user")?;
        state.require_admin(token)?;
        state.account_mut(id)?;
        state.accounts.retain(|a| &a.user.id != id);
        state.tokens.retain(|_, owner| owner != id);
        state.progress.retain(|(owner, _), _| owner != id);
        Ok(())
    }

    async fn create_tutorial(
        &self,
        token: &AuthToken,
        tutorial: &NewTutorial,
    ) -> Result<Tutorial, ApiError> {
        let mut state = self.lock()?;
        state.take_failure("create_tutorial")?;
        state.require_admin(token)?;
        let created = Tutorial {
            id: TutorialId::new(state.next_id("tutorial-")),
            title: tutorial.title.clone(),
            description: tutorial.description.clone(),
            category: tutorial.category.clone(),
            difficulty: tutorial.difficulty,
            duration: tutorial.duration,
            image_url: tutorial.image_url.clone(),
            video_url: tutorial.video_url.clone(),
            author: tutorial.author.clone(),
            created_at: Some(self.clock.now()),
            steps: tutorial.steps.clone(),
            materials: tutorial.materials.clone(),
            is_active: true,
            version: 0,
        };
        state.tutorials.push(created.clone());
        Ok(created)
    }

    async fn update_tutorial(
        &self,
        token: &AuthToken,
        id: &TutorialId,
        patch: &TutorialPatch,
    ) -> Result<Tutorial, ApiError> {
        let mut state = self.lock()?;
        state.take_failure("update_tutorial")?;
        state.require_admin(token)?;
        let tutorial = state.tutorial_mut(id)?;
        patch.apply_to(tutorial);
        tutorial.version += 1;
        Ok(tutorial.clone())
    }

    async fn delete_tutorial(&self, token: &AuthToken, id: &TutorialId) -> Result<(), ApiError> {
        let mut state = self.lock()?;
        state.take_failure("delete_tutorial")?;
        state.require_admin(token)?;
        state.tutorial_mut(id)?;
        state.tutorials.retain(|t| &t.id != id);
        if !state.keep_orphaned_progress {
            state.progress.retain(|(_, tutorial_id), _| tutorial_id != id);
        }
        Ok(())
    }

    async fn replace_steps(
        &self,
        token: &AuthToken,
        id: &TutorialId,
        expected_version: u64,
        steps: &[Step],
    ) -> Result<Tutorial, ApiError> {
        let mut state = self.lock()?;
        state.take_failure("replace_steps")?;
        state.require_admin(token)?;
        let tutorial = state.tutorial_mut(id)?;
        if tutorial.version != expected_version {
            return Err(ApiError::Conflict {
                message: format!(
                    "Tutorial sudah diubah (versi {}, diharapkan {expected_version})",
                    tutorial.version
                ),
            });
        }
        tutorial.steps = steps.to_vec();
        tutorial.version += 1;
        Ok(tutorial.clone())
    }

    async fn upload_media(
        &self,
        token: &AuthToken,
        kind: MediaKind,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedMedia, ApiError> {
        let mut state = self.lock()?;
        state.take_failure("upload_media")?;
        state.require_admin(token)?;
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        kind.check_upload(file_name, size)
            .map_err(|e| bad_request(e.to_string()))?;

        let stem = file_name
            .rsplit_once('.')
            .map_or(file_name, |(stem, _)| stem);
        let public_id = format!("tutorials/{stem}-{}", state.next_id(""));
        let host = MediaHost::new("memory").map_err(|e| bad_request(e.to_string()))?;
        let url = match kind {
            MediaKind::Image => host.image_url(&public_id, None, None),
            MediaKind::Video => host.video_url(&public_id),
        };
        state.media.insert(public_id.clone(), kind);
        Ok(UploadedMedia {
            url,
            public_id,
            duration: None,
        })
    }

    async fn delete_media(
        &self,
        token: &AuthToken,
        public_id: &str,
        kind: MediaKind,
    ) -> Result<(), ApiError> {
        let mut state = self.lock()?;
        state.take_failure("delete_media")?;
        state.require_admin(token)?;
        match state.media.get(public_id) {
            Some(stored) if *stored == kind => {
                state.media.remove(public_id);
                Ok(())
            }
            _ => Err(ApiError::NotFound),
        }
    }
}
