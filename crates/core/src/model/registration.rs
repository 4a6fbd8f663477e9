//! Account forms: registration, admin-created accounts and login.
//!
//! One ruleset applies everywhere: personal data, password and the
//! organization address are required; phone, interests, skill level and
//! member role are optional.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::user::SkillLevel;
use crate::model::validation::ValidationErrors;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Raw sign-up form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub karang_taruna_name: String,
    pub provinsi: String,
    pub kabupaten_kota: String,
    pub kecamatan: String,
    pub jalan: String,
    pub phone: String,
    pub interests: BTreeSet<String>,
    pub skill_level: String,
    pub peran_anggota: String,
}

/// Validated `POST /auth/register` payload.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub karang_taruna_name: String,
    pub provinsi: String,
    pub kabupaten_kota: String,
    pub kecamatan: String,
    pub jalan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub interests: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_level: Option<SkillLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peran_anggota: Option<String>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

fn required(errors: &mut ValidationErrors, field: &str, value: &str, message: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.insert(field, message);
    }
    trimmed.to_owned()
}

fn optional(value: &str) -> Option<String> {
    Some(value.trim().to_owned()).filter(|v| !v.is_empty())
}

/// Loose address shape check: something, `@`, something, `.`, something.
#[must_use]
pub fn looks_like_email(raw: &str) -> bool {
    raw.char_indices().any(|(at, c)| {
        if c != '@' {
            return false;
        }
        let before_ok = raw[..at]
            .chars()
            .next_back()
            .is_some_and(|prev| !prev.is_whitespace());
        let domain = raw[at + 1..].split(char::is_whitespace).next().unwrap_or("");
        let dot_ok = domain
            .char_indices()
            .any(|(i, d)| d == '.' && i > 0 && i + 1 < domain.len());
        before_ok && dot_ok
    })
}

impl RegistrationForm {
    /// Validate every field in one pass.
    ///
    /// # Errors
    ///
    /// Returns field-keyed `ValidationErrors` listing every failing field.
    pub fn validate(self) -> Result<Registration, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = required(&mut errors, "name", &self.name, "Nama lengkap wajib diisi");
        let username = required(&mut errors, "username", &self.username, "Username wajib diisi");
        let email = required(&mut errors, "email", &self.email, "Email wajib diisi");
        if !email.is_empty() && !looks_like_email(&email) {
            errors.insert("email", "Format email tidak valid");
        }

        if self.password.is_empty() {
            errors.insert("password", "Password wajib diisi");
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert("password", "Password minimal 6 karakter");
        }
        if self.password != self.confirm_password {
            errors.insert("confirmPassword", "Password tidak sama");
        }

        let karang_taruna_name = required(
            &mut errors,
            "karangTarunaName",
            &self.karang_taruna_name,
            "Nama karang taruna wajib diisi",
        );
        let provinsi = required(&mut errors, "provinsi", &self.provinsi, "Provinsi wajib diisi");
        let kabupaten_kota = required(
            &mut errors,
            "kabupatenKota",
            &self.kabupaten_kota,
            "Kabupaten/Kota wajib diisi",
        );
        let kecamatan = required(&mut errors, "kecamatan", &self.kecamatan, "Kecamatan wajib diisi");
        let jalan = required(&mut errors, "jalan", &self.jalan, "Jalan wajib diisi");

        let skill_level = match optional(&self.skill_level) {
            None => None,
            Some(raw) => match raw.parse::<SkillLevel>() {
                Ok(level) => Some(level),
                Err(_) => {
                    errors.insert("skillLevel", "Tingkat keahlian tidak valid");
                    None
                }
            },
        };

        let interests = self
            .interests
            .into_iter()
            .map(|i| i.trim().to_owned())
            .filter(|i| !i.is_empty())
            .collect();

        errors.into_result(Registration {
            name,
            username,
            email,
            password: self.password,
            karang_taruna_name,
            provinsi,
            kabupaten_kota,
            kecamatan,
            jalan,
            phone: optional(&self.phone),
            interests,
            skill_level,
            peran_anggota: optional(&self.peran_anggota),
        })
    }
}

/// `POST /auth/login` payload.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Both fields are required; nothing else is checked client side.
    ///
    /// # Errors
    ///
    /// Returns field-keyed `ValidationErrors` for missing email or password.
    pub fn validate(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.email.trim().is_empty() {
            errors.insert("email", "Email wajib diisi");
        }
        if self.password.is_empty() {
            errors.insert("password", "Password wajib diisi");
        }
        errors.into_result(Self {
            email: self.email.trim().to_owned(),
            password: self.password,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RegistrationForm {
        RegistrationForm {
            name: "Budi Santoso".into(),
            username: "budi".into(),
            email: "budi@example.com".into(),
            password: "rahasia".into(),
            confirm_password: "rahasia".into(),
            karang_taruna_name: "KT Mawar".into(),
            provinsi: "DIY".into(),
            kabupaten_kota: "Bantul".into(),
            kecamatan: "Sewon".into(),
            jalan: "Jl. Parangtritis".into(),
            ..RegistrationForm::default()
        }
    }

    #[test]
    fn accepts_form_without_optional_fields() {
        let registration = valid_form().validate().unwrap();
        assert_eq!(registration.phone, None);
        assert!(registration.interests.is_empty());
        assert_eq!(registration.skill_level, None);
    }

    #[test]
    fn reports_every_missing_required_field() {
        let errors = RegistrationForm::default().validate().unwrap_err();
        for field in [
            "name",
            "username",
            "email",
            "password",
            "karangTarunaName",
            "provinsi",
            "kabupatenKota",
            "kecamatan",
            "jalan",
        ] {
            assert!(errors.contains(field), "missing error for {field}");
        }
        assert!(!errors.contains("phone"));
        assert!(!errors.contains("confirmPassword"));
    }

    #[test]
    fn rejects_short_and_mismatched_passwords() {
        let mut form = valid_form();
        form.password = "abc".into();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("password"), Some("Password minimal 6 karakter"));
        assert_eq!(errors.get("confirmPassword"), Some("Password tidak sama"));
    }

    #[test]
    fn rejects_malformed_email() {
        let mut form = valid_form();
        form.email = "budi@example".into();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("email"), Some("Format email tidak valid"));
    }

    #[test]
    fn email_shape_check() {
        assert!(looks_like_email("a@b.c"));
        assert!(looks_like_email("first.last@sub.domain.id"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.c"));
        assert!(!looks_like_email("a@.c"));
        assert!(!looks_like_email("a@b."));
    }

    #[test]
    fn parses_optional_skill_level() {
        let mut form = valid_form();
        form.skill_level = "mahir".into();
        form.phone = " 0812 ".into();
        let registration = form.validate().unwrap();
        assert_eq!(registration.skill_level, Some(SkillLevel::Mahir));
        assert_eq!(registration.phone.as_deref(), Some("0812"));
    }

    #[test]
    fn registration_payload_uses_wire_names() {
        let json = serde_json::to_value(valid_form().validate().unwrap()).unwrap();
        assert_eq!(json["karangTarunaName"], "KT Mawar");
        assert_eq!(json["kabupatenKota"], "Bantul");
        assert!(json.get("phone").is_none());
    }

    #[test]
    fn credentials_require_both_fields() {
        let errors = Credentials::new(" ", "").validate().unwrap_err();
        assert!(errors.contains("email"));
        assert!(errors.contains("password"));
        let ok = Credentials::new(" a@b.c ", "pw").validate().unwrap();
        assert_eq!(ok.email, "a@b.c");
    }
}
