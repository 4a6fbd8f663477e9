use crate::model::{Role, SkillLevel, User};

/// Admin user-list filter: free-text search plus skill level and role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    search: String,
    skill_level: Option<SkillLevel>,
    role: Option<Role>,
}

impl UserQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into().trim().to_lowercase();
        self
    }

    #[must_use]
    pub fn with_skill_level(mut self, level: Option<SkillLevel>) -> Self {
        self.skill_level = level;
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: Option<Role>) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && self.skill_level.is_none() && self.role.is_none()
    }

    /// Case-insensitive substring match on name, email, username and
    /// organization name.
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        let text_ok = self.search.is_empty()
            || [
                user.name.as_str(),
                user.email.as_str(),
                user.username.as_str(),
                user.profile.karang_taruna_name.as_str(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&self.search));
        let skill_ok = self
            .skill_level
            .is_none_or(|level| user.profile.skill_level == Some(level));
        let role_ok = self.role.is_none_or(|role| user.role == role);
        text_ok && skill_ok && role_ok
    }

    /// Matching users in input order.
    #[must_use]
    pub fn apply<'a>(&self, users: &'a [User]) -> Vec<&'a User> {
        users.iter().filter(|u| self.matches(u)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{UserId, UserProfile};

    fn user(id: &str, name: &str, org: &str, level: Option<SkillLevel>) -> User {
        User {
            id: UserId::new(id),
            name: name.into(),
            username: id.into(),
            email: format!("{id}@example.com"),
            role: Role::User,
            profile: UserProfile {
                karang_taruna_name: org.into(),
                skill_level: level,
                ..UserProfile::default()
            },
            created_at: None,
        }
    }

    fn ids(users: &[&User]) -> Vec<String> {
        users.iter().map(|u| u.id.to_string()).collect()
    }

    #[test]
    fn empty_query_keeps_everyone() {
        let users = vec![user("a", "Ani", "KT Melati", None)];
        assert!(UserQuery::new().is_empty());
        assert_eq!(UserQuery::new().apply(&users).len(), 1);
    }

    #[test]
    fn search_covers_all_text_fields() {
        let users = vec![
            user("ani", "Ani Lestari", "KT Melati", None),
            user("budi", "Budi", "KT Mawar", None),
        ];
        assert_eq!(ids(&UserQuery::new().with_search("LESTARI").apply(&users)), ["ani"]);
        assert_eq!(ids(&UserQuery::new().with_search("mawar").apply(&users)), ["budi"]);
        assert_eq!(ids(&UserQuery::new().with_search("budi@").apply(&users)), ["budi"]);
        assert_eq!(UserQuery::new().with_search("kt ").apply(&users).len(), 2);
    }

    #[test]
    fn skill_level_and_role_filters() {
        let mut admin = user("c", "Citra", "KT Mawar", Some(SkillLevel::Mahir));
        admin.role = Role::Admin;
        let users = vec![
            user("a", "Ani", "KT Melati", Some(SkillLevel::Pemula)),
            user("b", "Budi", "KT Mawar", None),
            admin,
        ];
        let pemula = UserQuery::new().with_skill_level(Some(SkillLevel::Pemula));
        assert_eq!(ids(&pemula.apply(&users)), ["a"]);

        let admins = UserQuery::new()
            .with_search("mawar")
            .with_role(Some(Role::Admin));
        assert_eq!(ids(&admins.apply(&users)), ["c"]);
    }
}
