pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::distribution::DistributionCommand;
use crate::cli::expense::ExpenseCommand;
use crate::cli::funding::FundingCommand;
use crate::cli::ownership::OwnershipCommand;
use crate::cli::records::RecordsCommand;
use crate::cli::settings::SettingsCommand;
use crate::core::ApiError;
use crate::core::cache::{Cache, QueryKey};
use crate::core::config::AppConfig;
use crate::core::model::Id;
use crate::core::resource::Resource;
use crate::core::session::{LOGIN_ROUTE, RouteDecision, Session, SessionStore, authorize};
use crate::providers::{ApiClient, Repository};
use crate::store::memory::MemoryCache;
use anyhow::{Result, bail};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Login {
        username: String,
        password: Option<String>,
    },
    Register {
        username: String,
        email: String,
        password: Option<String>,
    },
    Logout,
    Whoami,
    Stock {
        funding: Option<Id>,
    },
    Funding(FundingCommand),
    Ownership(OwnershipCommand),
    Expense(ExpenseCommand),
    Distribution(DistributionCommand),
    Settings(SettingsCommand),
    Records(RecordsCommand),
    Report {
        name: String,
    },
}

impl AppCommand {
    /// Console route the command stands for, checked before it runs.
    pub fn route(&self) -> &'static str {
        match self {
            AppCommand::Login { .. } | AppCommand::Logout => LOGIN_ROUTE,
            AppCommand::Register { .. } => "/register",
            AppCommand::Whoami => "/dashboard",
            AppCommand::Stock { .. } | AppCommand::Funding(_) => Resource::Funding.route(),
            AppCommand::Ownership(_) => Resource::Ownership.route(),
            AppCommand::Expense(_) => Resource::Expense.route(),
            AppCommand::Distribution(_) => Resource::ProfitDistribution.route(),
            AppCommand::Settings(_) => Resource::Settings.route(),
            AppCommand::Records(cmd) => cmd.resource().route(),
            AppCommand::Report { .. } => "/dashboard/reports",
        }
    }

    fn manages_session(&self) -> bool {
        matches!(self, AppCommand::Login { .. } | AppCommand::Logout)
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = store::open_session_store(&config)?;
    let session = store.load()?.unwrap_or_default();

    let route = command.route();
    match authorize(route, &session) {
        RouteDecision::Allow => {}
        RouteDecision::RedirectToLogin => {
            bail!("Not signed in. Run `lahan login <username>` first.")
        }
        RouteDecision::RedirectToDashboard => bail!(
            "{} requires an Admin or Superadmin account (signed in as {})",
            route,
            session.role()
        ),
    }

    let client = ApiClient::new(
        &config.api.base_url,
        config.api.timeout(),
        session.tokens.clone(),
    )?;
    let cache: Arc<dyn Cache<QueryKey, Value>> = Arc::new(MemoryCache::<QueryKey, Value>::new());
    let repo = Repository::new(&client, cache, config.cache.ttl());
    let currency = config.currency.as_str();

    info!(route, "Running command");
    let result = match &command {
        AppCommand::Login { username, password } => cli::auth::login(
            &client,
            store.as_ref(),
            username,
            password.as_deref(),
        )
        .await
        .map(|_| ()),
        AppCommand::Register {
            username,
            email,
            password,
        } => cli::auth::register(&client, username, email, password.as_deref()).await,
        AppCommand::Logout => cli::auth::logout(&client, store.as_ref()).await,
        AppCommand::Whoami => cli::auth::whoami(&session),
        AppCommand::Stock { funding } => cli::stock::run(&repo, *funding, currency).await,
        AppCommand::Funding(cmd) => cli::funding::run(&repo, cmd, currency).await,
        AppCommand::Ownership(cmd) => cli::ownership::run(&repo, cmd, currency).await,
        AppCommand::Expense(cmd) => cli::expense::run(&repo, cmd, currency).await,
        AppCommand::Distribution(cmd) => cli::distribution::run(&repo, cmd, currency).await,
        AppCommand::Settings(cmd) => cli::settings::run(&repo, cmd, currency).await,
        AppCommand::Records(cmd) => cli::records::run(&repo, cmd).await,
        AppCommand::Report { name } => cli::records::report(&repo, name).await,
    };

    if let Err(e) = &result {
        if !command.manages_session()
            && matches!(e.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized))
        {
            warn!("Session expired, clearing stored session");
            store.clear()?;
            bail!("Session expired. Run `lahan login <username>` to sign in again.");
        }
    }

    if !command.manages_session() {
        sync_tokens(&client, store.as_ref(), session).await?;
    }
    result
}

/// Persists tokens rotated by a silent refresh during the command.
async fn sync_tokens(
    client: &ApiClient,
    store: &dyn SessionStore,
    mut session: Session,
) -> Result<()> {
    let tokens = client.tokens().await;
    if tokens == session.tokens {
        return Ok(());
    }
    match tokens {
        Some(tokens) => {
            debug!("Saving refreshed tokens");
            session.tokens = Some(tokens);
            store.save(&session)
        }
        None => store.clear(),
    }
}
