use std::collections::BTreeMap;
use std::fmt;

use hub_core::model::Category;
use thiserror::Error;

pub const ROOT: &str = "/";
pub const LOGIN: &str = "/login";
/// Where signed-in users land, and where non-admins are sent from admin pages.
pub const DEFAULT_AUTHENTICATED: &str = "/dashboard";
pub const NOT_FOUND: &str = "/404";
pub const ADMIN: &str = "/admin";

/// Every kind of page the hub can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Landing,
    Login,
    Dashboard,
    Curriculum(Category),
    Admin,
    NotFound,
}

impl Page {
    /// Name used for page telemetry and logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Page::Landing => "landing",
            Page::Login => "login",
            Page::Dashboard => "dashboard",
            Page::Curriculum(category) => category.slug(),
            Page::Admin => "admin",
            Page::NotFound => "not_found",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEntry {
    pub page: Page,
    pub requires_auth: bool,
    pub admin_only: bool,
}

impl RouteEntry {
    #[must_use]
    pub fn public(page: Page) -> Self {
        Self {
            page,
            requires_auth: false,
            admin_only: false,
        }
    }

    #[must_use]
    pub fn protected(page: Page) -> Self {
        Self {
            page,
            requires_auth: true,
            admin_only: false,
        }
    }

    #[must_use]
    pub fn admin(page: Page) -> Self {
        Self {
            page,
            requires_auth: true,
            admin_only: true,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RouteTableError {
    #[error("route table has no entry for {0}")]
    Missing(&'static str),

    #[error("{0} must be reachable without signing in")]
    ProtectedLogin(&'static str),

    #[error("{0} must not be admin-only")]
    AdminOnlyDefault(&'static str),

    #[error("duplicate route {0}")]
    Duplicate(String),
}

/// Immutable map from normalized paths to page descriptors.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: BTreeMap<String, RouteEntry>,
}

impl RouteTable {
    /// Build a table, rejecting shapes that could redirect forever: the login
    /// route must be public and the default signed-in route must not require
    /// the admin role.
    ///
    /// # Errors
    ///
    /// Returns `RouteTableError` for duplicate paths, a missing root, login or
    /// default route, a protected login route or an admin-only default route.
    pub fn new(
        routes: impl IntoIterator<Item = (String, RouteEntry)>,
    ) -> Result<Self, RouteTableError> {
        let mut entries = BTreeMap::new();
        for (path, entry) in routes {
            if entries.contains_key(&path) {
                return Err(RouteTableError::Duplicate(path));
            }
            entries.insert(path, entry);
        }

        if !entries.contains_key(ROOT) {
            return Err(RouteTableError::Missing(ROOT));
        }
        let login = entries
            .get(LOGIN)
            .ok_or(RouteTableError::Missing(LOGIN))?;
        if login.requires_auth || login.admin_only {
            return Err(RouteTableError::ProtectedLogin(LOGIN));
        }
        let default = entries
            .get(DEFAULT_AUTHENTICATED)
            .ok_or(RouteTableError::Missing(DEFAULT_AUTHENTICATED))?;
        if default.admin_only {
            return Err(RouteTableError::AdminOnlyDefault(DEFAULT_AUTHENTICATED));
        }
        Ok(Self { entries })
    }

    /// The hub's routes.
    #[must_use]
    pub fn standard() -> Self {
        let mut entries = vec![
            (ROOT.to_string(), RouteEntry::public(Page::Landing)),
            (LOGIN.to_string(), RouteEntry::public(Page::Login)),
            (
                DEFAULT_AUTHENTICATED.to_string(),
                RouteEntry::protected(Page::Dashboard),
            ),
            (ADMIN.to_string(), RouteEntry::admin(Page::Admin)),
            (NOT_FOUND.to_string(), RouteEntry::public(Page::NotFound)),
        ];
        entries.extend(Category::ALL.iter().map(|category| {
            (
                category.route_path().to_string(),
                RouteEntry::protected(Page::Curriculum(*category)),
            )
        }));
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Look up a normalized path: exact key, then without the trailing
    /// slash, then the not-found route, then the root route.
    #[must_use]
    pub fn resolve(&self, path: &str) -> (&str, RouteEntry) {
        let trimmed = path.strip_suffix('/').filter(|p| !p.is_empty());
        [Some(path), trimmed, Some(NOT_FOUND)]
            .into_iter()
            .flatten()
            .find_map(|key| self.entries.get_key_value(key))
            .or_else(|| self.entries.get_key_value(ROOT))
            .map_or((ROOT, RouteEntry::public(Page::Landing)), |(key, entry)| {
                (key.as_str(), *entry)
            })
    }

    /// Path of the first route rendering `page`.
    #[must_use]
    pub fn path_of(&self, page: Page) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.page == page)
            .map(|(path, _)| path.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RouteEntry)> {
        self.entries.iter().map(|(path, entry)| (path.as_str(), entry))
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}
