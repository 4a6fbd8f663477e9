use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;
use crate::model::wire::{blank_as_none, null_as_empty};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("unknown skill level: {0}")]
    UnknownSkillLevel(String),
}

//
// ─── ROLE ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
    Superadmin,
}

impl Role {
    /// Admin dashboard access.
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::Superadmin)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Superadmin => "superadmin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "superadmin" => Ok(Self::Superadmin),
            _ => Err(UserError::UnknownRole(s.to_owned())),
        }
    }
}

//
// ─── SKILL LEVEL ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillLevel {
    Pemula,
    Menengah,
    Mahir,
}

impl SkillLevel {
    pub const ALL: [SkillLevel; 3] = [Self::Pemula, Self::Menengah, Self::Mahir];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pemula => "Pemula",
            Self::Menengah => "Menengah",
            Self::Mahir => "Mahir",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UserError::UnknownSkillLevel(s.to_owned()))
    }
}

fn blank_skill_level<'de, D>(deserializer: D) -> Result<Option<SkillLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    blank_as_none(deserializer)?
        .map(|raw| raw.parse().map_err(serde::de::Error::custom))
        .transpose()
}

//
// ─── PROFILE ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub provinsi: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub kabupaten_kota: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub kecamatan: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub jalan: String,
}

impl Address {
    /// Single-line postal rendering, skipping blank parts.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            self.jalan.as_str(),
            self.kecamatan.as_str(),
            self.kabupaten_kota.as_str(),
            self.provinsi.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// Community-organization profile carried by every account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub karang_taruna_name: String,
    #[serde(flatten)]
    pub address: Address,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub interests: BTreeSet<String>,
    #[serde(default, deserialize_with = "blank_skill_level", skip_serializing_if = "Option::is_none")]
    pub skill_level: Option<SkillLevel>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub peran_anggota: Option<String>,
}

//
// ─── USER ──────────────────────────────────────────────────────────────────────
//

/// An account as seen by the client. Never carries a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: UserId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(flatten)]
    pub profile: UserProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name used in greetings; falls back to the username.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.username
        } else {
            &self.name
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Partial update payload for `PUT /users/:id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub karang_taruna_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provinsi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kabupaten_kota: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kecamatan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jalan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_level: Option<SkillLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peran_anggota: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UserPatch {
    #[must_use]
    pub fn role(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the patch to a local copy.
    pub fn apply_to(&self, user: &mut User) {
        fn set(target: &mut String, value: Option<&String>) {
            if let Some(value) = value {
                target.clone_from(value);
            }
        }

        set(&mut user.name, self.name.as_ref());
        set(&mut user.username, self.username.as_ref());
        set(&mut user.email, self.email.as_ref());
        set(&mut user.profile.karang_taruna_name, self.karang_taruna_name.as_ref());
        set(&mut user.profile.address.provinsi, self.provinsi.as_ref());
        set(&mut user.profile.address.kabupaten_kota, self.kabupaten_kota.as_ref());
        set(&mut user.profile.address.kecamatan, self.kecamatan.as_ref());
        set(&mut user.profile.address.jalan, self.jalan.as_ref());
        if let Some(phone) = &self.phone {
            user.profile.phone = Some(phone.clone()).filter(|p| !p.trim().is_empty());
        }
        if let Some(interests) = &self.interests {
            user.profile.interests.clone_from(interests);
        }
        if let Some(level) = self.skill_level {
            user.profile.skill_level = Some(level);
        }
        if let Some(peran) = &self.peran_anggota {
            user.profile.peran_anggota = Some(peran.clone()).filter(|p| !p.trim().is_empty());
        }
        if let Some(role) = self.role {
            user.role = role;
        }
    }
}
