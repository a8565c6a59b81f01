//! Session context and role based route gating.
//!
//! A [`Session`] is hydrated once from a [`SessionStore`] when a command
//! starts, handed explicitly to whatever needs identity, and cleared on logout.
use crate::core::model::User;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Viewer,
    Investor,
    Operator,
    Admin,
    Superadmin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Viewer => "Viewer",
            Role::Investor => "Investor",
            Role::Operator => "Operator",
            Role::Admin => "Admin",
            Role::Superadmin => "Superadmin",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '_', '-'], "").as_str() {
            "viewer" => Ok(Role::Viewer),
            "investor" => Ok(Role::Investor),
            "operator" => Ok(Role::Operator),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::Superadmin),
            _ => Err(anyhow::anyhow!("Unknown role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    pub access: String,
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<User>,
    pub tokens: Option<Tokens>,
}

impl Session {
    pub fn new(user: Option<User>, tokens: Tokens) -> Self {
        Self {
            user,
            tokens: Some(tokens),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_some()
    }

    /// Unknown or missing roles get the least privilege.
    pub fn role(&self) -> Role {
        self.user
            .as_ref()
            .and_then(|u| u.role.as_deref())
            .and_then(|r| r.parse().ok())
            .unwrap_or(Role::Viewer)
    }

    pub fn clear(&mut self) {
        self.user = None;
        self.tokens = None;
    }
}

/// Durable home for the session between command invocations.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>>;
    fn save(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

pub const LOGIN_ROUTE: &str = "/login";
pub const DASHBOARD_ROUTE: &str = "/dashboard";
const PUBLIC_ROUTES: &[&str] = &[LOGIN_ROUTE, "/register"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToLogin,
    RedirectToDashboard,
}

fn is_under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub fn authorize(path: &str, session: &Session) -> RouteDecision {
    if PUBLIC_ROUTES.iter().any(|p| is_under(path, p)) {
        return RouteDecision::Allow;
    }
    if !session.is_authenticated() {
        return RouteDecision::RedirectToLogin;
    }
    if is_under(path, "/admin") && !session.role().is_admin() {
        return RouteDecision::RedirectToDashboard;
    }
    RouteDecision::Allow
}
