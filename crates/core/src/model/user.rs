use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::UserId;

/// Cohort assigned when the profile does not carry one.
pub const DEFAULT_COHORT: &str = "default";

/// Access role attached to a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Intern,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Intern => "intern",
            Role::Admin => "admin",
        }
    }

    /// Lenient mapping used for backend values: anything that is not
    /// `admin` is treated as an intern.
    #[must_use]
    pub fn from_backend(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::Intern,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed-in person, merged from the auth session and the profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub cohort: String,
    pub resume_url: Option<String>,
}

impl User {
    #[must_use]
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            full_name: None,
            role: Role::Intern,
            cohort: DEFAULT_COHORT.to_string(),
            resume_url: None,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    #[must_use]
    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Full name when known, otherwise the email address.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}
