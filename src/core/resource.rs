//! Resource collections exposed by the backend and where they live.
use crate::core::model::Id;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Asset,
    Investor,
    FundingSource,
    Funding,
    Ownership,
    Project,
    Expense,
    Production,
    Sale,
    ProfitDistribution,
    Settings,
    User,
    Role,
}

pub const ALL_RESOURCES: [Resource; 13] = [
    Resource::Asset,
    Resource::Investor,
    Resource::FundingSource,
    Resource::Funding,
    Resource::Ownership,
    Resource::Project,
    Resource::Expense,
    Resource::Production,
    Resource::Sale,
    Resource::ProfitDistribution,
    Resource::Settings,
    Resource::User,
    Resource::Role,
];

impl Resource {
    /// Command-line name and cache key.
    pub fn name(&self) -> &'static str {
        match self {
            Resource::Asset => "assets",
            Resource::Investor => "investors",
            Resource::FundingSource => "funding-sources",
            Resource::Funding => "fundings",
            Resource::Ownership => "ownerships",
            Resource::Project => "projects",
            Resource::Expense => "expenses",
            Resource::Production => "productions",
            Resource::Sale => "sales",
            Resource::ProfitDistribution => "distributions",
            Resource::Settings => "settings",
            Resource::User => "users",
            Resource::Role => "roles",
        }
    }

    pub fn list_path(&self) -> &'static str {
        match self {
            Resource::Asset => "/api/asset/aset/",
            Resource::Investor => "/investor/investors/",
            Resource::FundingSource => "/fundingsource/fundingsources/",
            Resource::Funding => "/api/funding/",
            Resource::Ownership => "/api/ownership/ownerships/",
            Resource::Project => "/projects/",
            Resource::Expense => "/api/expense/",
            Resource::Production => "/api/production/productions/",
            Resource::Sale => "/api/sales/sales/",
            Resource::ProfitDistribution => "/api/profit-distribution/",
            Resource::Settings => "/api/settings/",
            Resource::User => "/api/auth/users/",
            Resource::Role => "/api/auth/roles/",
        }
    }

    /// Projects are created through their own endpoint.
    pub fn create_path(&self) -> &'static str {
        match self {
            Resource::Project => "/projectss/tambah/",
            other => other.list_path(),
        }
    }

    pub fn item_path(&self, id: Id) -> String {
        match self {
            Resource::Project => format!("/projectsss/{id}"),
            other => format!("{}{id}/", other.list_path()),
        }
    }

    /// Settings is a singleton, roles are read-only.
    pub fn has_items(&self) -> bool {
        !matches!(self, Resource::Settings | Resource::Role)
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, Resource::Role)
    }

    /// Distributions are immutable once created.
    pub fn is_updatable(&self) -> bool {
        !matches!(
            self,
            Resource::Role | Resource::ProfitDistribution | Resource::Settings
        )
    }

    /// Collections whose server-derived fields change when this one is mutated.
    pub fn dependents(&self) -> &'static [Resource] {
        match self {
            Resource::Funding => &[Resource::Investor, Resource::FundingSource],
            Resource::FundingSource => &[Resource::Funding],
            Resource::Ownership => &[Resource::Investor, Resource::Funding],
            Resource::Expense => &[Resource::Funding],
            Resource::Sale | Resource::Production => &[Resource::ProfitDistribution],
            Resource::Investor => &[Resource::Ownership],
            _ => &[],
        }
    }

    /// Console route gated by role checks.
    pub fn route(&self) -> &'static str {
        match self {
            Resource::Settings => "/admin/settings",
            Resource::User => "/admin/users",
            Resource::Role => "/admin/roles",
            Resource::Asset => "/dashboard/assets",
            Resource::Investor => "/dashboard/investors",
            Resource::FundingSource => "/dashboard/funding-sources",
            Resource::Funding => "/dashboard/fundings",
            Resource::Ownership => "/dashboard/ownerships",
            Resource::Project => "/dashboard/projects",
            Resource::Expense => "/dashboard/expenses",
            Resource::Production => "/dashboard/productions",
            Resource::Sale => "/dashboard/sales",
            Resource::ProfitDistribution => "/dashboard/distributions",
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Resource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        ALL_RESOURCES
            .iter()
            .copied()
            .find(|r| {
                r.name() == normalized || r.name().trim_end_matches('s') == normalized
            })
            .ok_or_else(|| anyhow::anyhow!("Unknown resource: {}", s))
    }
}

pub fn report_path(name: &str) -> String {
    format!("/api/reporting/{}/", name.trim_matches('/'))
}

pub const LOGIN_PATH: &str = "/login/";
pub const REGISTER_PATH: &str = "/register/";
pub const LOGOUT_PATH: &str = "/logout/";
pub const REFRESH_PATH: &str = "/api/auth/refresh/";
pub const DISTRIBUTION_PREVIEW_PATH: &str = "/api/profit-distribution/preview/";
