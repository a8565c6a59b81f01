use super::ui;
use crate::core::allocation::{
    ShareCheck, StockAvailability, check_share_request, eligible_fundings, funding_availability,
    reconcile_selection,
};
use crate::core::model::{Expense, Funding, FundingStatus, FundingType, Id};
use crate::core::resource::Resource;
use crate::providers::Repository;
use crate::providers::repository::find_by_id;
use crate::providers::wire;
use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use comfy_table::Cell;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tracing::info;

#[derive(Debug, Clone, Subcommand)]
pub enum FundingCommand {
    /// List all fundings
    List,
    /// List fundings an expense may draw from
    Eligible {
        /// Project the expense belongs to; omit for general expenses
        #[arg(long)]
        project: Option<Id>,
        /// Expense being edited
        #[arg(long)]
        expense: Option<Id>,
    },
    /// Record a new funding
    Add(NewFunding),
    /// Change an existing funding
    Update(FundingChanges),
}

#[derive(Debug, Clone, Args)]
pub struct NewFunding {
    /// Funding source id
    #[arg(long)]
    pub source: Id,
    /// investor or donation
    #[arg(long)]
    pub source_type: FundingType,
    #[arg(long)]
    pub amount: Decimal,
    /// Shares bought; only investor fundings carry shares
    #[arg(long)]
    pub shares: Option<u64>,
    /// Project the money is earmarked for; omit for pool funding
    #[arg(long)]
    pub project: Option<Id>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct FundingChanges {
    pub id: Id,
    #[arg(long)]
    pub amount: Option<Decimal>,
    #[arg(long)]
    pub shares: Option<u64>,
    #[arg(long, conflicts_with = "pool")]
    pub project: Option<Id>,
    /// Move the funding back to the general pool
    #[arg(long)]
    pub pool: bool,
    #[arg(long)]
    pub status: Option<FundingStatus>,
}

pub fn display_fundings(title: &str, fundings: &[&Funding], currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Source"),
        ui::header_cell("Type"),
        ui::header_cell("Project"),
        ui::header_cell("Amount"),
        ui::header_cell("Shares"),
        ui::header_cell("Status"),
        ui::header_cell("Received"),
    ]);

    for funding in fundings {
        table.add_row(vec![
            Cell::new(funding.id),
            Cell::new(
                funding
                    .source_name
                    .clone()
                    .or_else(|| funding.source.map(|s| format!("#{s}")))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(funding.source_type),
            Cell::new(
                funding
                    .project
                    .map_or("Pool".to_string(), |p| format!("#{p}")),
            ),
            ui::number_cell(ui::format_amount(funding.amount, currency)),
            ui::number_cell(ui::format_count(funding.shares)),
            Cell::new(funding.status),
            ui::format_optional_cell(funding.date_received, |d| d.to_string()),
        ]);
    }

    format!(
        "{}\n\n{}",
        ui::style_text(title, ui::StyleType::Title),
        table
    )
}

/// Refuses share counts the pool cannot cover.
pub fn ensure_shares_available(requested: u64, availability: &StockAvailability) -> Result<u64> {
    match check_share_request(requested, availability) {
        ShareCheck::Accepted { remaining_after } => Ok(remaining_after),
        ShareCheck::Exceeds { max_allowed } => bail!(
            "Requested {} shares but only {} are available",
            requested,
            max_allowed
        ),
        ShareCheck::Exhausted => bail!("Stock exhausted: no shares are left in the pool"),
    }
}

pub fn new_funding_body(new: &NewFunding) -> Value {
    let shares = match new.source_type {
        FundingType::Investor => new.shares.unwrap_or(0),
        FundingType::Donation => 0,
    };
    json!({
        "source": new.source,
        "source_type": new.source_type,
        "amount": new.amount,
        "shares": shares,
        "project": new.project,
        "status": FundingStatus::Available,
        "date_received": new.date.unwrap_or_else(|| chrono::Local::now().date_naive()),
        "payment_method": new.payment_method,
    })
}

/// Applies changes on top of the stored record for a full PUT.
pub fn apply_changes(mut funding: Funding, changes: &FundingChanges) -> Funding {
    if let Some(amount) = changes.amount {
        funding.amount = amount;
    }
    if let Some(shares) = changes.shares {
        funding.shares = shares;
    }
    if changes.pool {
        funding.project = None;
    } else if let Some(project) = changes.project {
        funding.project = Some(project);
    }
    if let Some(status) = changes.status {
        funding.status = status;
    }
    if funding.source_type == FundingType::Donation {
        funding.shares = 0;
    }
    funding
}

async fn list(repo: &Repository<'_>, currency: &str) -> Result<()> {
    let fundings = ui::with_spinner("Fetching fundings...", repo.fundings()).await?;
    if fundings.is_empty() {
        ui::print_empty("fundings");
        return Ok(());
    }
    let refs: Vec<&Funding> = fundings.iter().collect();
    println!("{}", display_fundings("Fundings", &refs, currency));
    Ok(())
}

async fn eligible(
    repo: &Repository<'_>,
    project: Option<Id>,
    expense_id: Option<Id>,
    currency: &str,
) -> Result<()> {
    let (fundings, expenses) = ui::with_spinner("Fetching fundings...", async {
        futures::try_join!(repo.fundings(), repo.expenses())
    })
    .await?;

    let current_expense: Option<Expense> = match expense_id {
        Some(id) => Some(
            find_by_id(expenses, id, |e| e.id).ok_or_else(|| anyhow!("Expense #{id} not found"))?,
        ),
        None => None,
    };
    let project = project.or_else(|| current_expense.as_ref().and_then(|e| e.project_id));
    let options = eligible_fundings(&fundings, project, current_expense.as_ref());

    let title = match project {
        Some(p) => format!("Fundings eligible for project #{p}"),
        None => "Pool fundings eligible for general expenses".to_string(),
    };
    if options.is_empty() {
        ui::print_empty("eligible fundings");
    } else {
        println!("{}", display_fundings(&title, &options, currency));
    }

    if let Some(expense) = &current_expense {
        if expense.funding_id.is_some() && reconcile_selection(expense.funding_id, &options).is_none() {
            ui::print_warning(&format!(
                "Expense #{} currently draws from funding #{}, which is not eligible here and would be cleared.",
                expense.id,
                expense.funding_id.unwrap_or_default()
            ));
        }
    }
    Ok(())
}

async fn add(repo: &Repository<'_>, new: &NewFunding) -> Result<()> {
    if new.source_type == FundingType::Donation && new.shares.unwrap_or(0) > 0 {
        ui::print_warning("Donations do not buy shares; the share count is ignored.");
    }

    let requested = match new.source_type {
        FundingType::Investor => new.shares.unwrap_or(0),
        FundingType::Donation => 0,
    };
    if requested > 0 {
        let (settings, fundings) = ui::with_spinner("Checking stock...", async {
            futures::try_join!(repo.settings(), repo.fundings())
        })
        .await?;
        let availability = funding_availability(settings.total_shares, &fundings, 0);
        ensure_shares_available(requested, &availability)?;
    }

    let created = repo.create(Resource::Funding, &new_funding_body(new)).await?;
    match wire::record_id(&created) {
        Some(id) => println!("Created funding #{id}"),
        None => println!("Created funding"),
    }
    info!(shares = requested, "Funding created");
    Ok(())
}

async fn update(repo: &Repository<'_>, changes: &FundingChanges) -> Result<()> {
    let (settings, fundings) = ui::with_spinner("Fetching fundings...", async {
        futures::try_join!(repo.settings(), repo.fundings())
    })
    .await?;
    let existing = find_by_id(fundings.clone(), changes.id, |f| f.id)
        .ok_or_else(|| anyhow!("Funding #{} not found", changes.id))?;

    let held = match existing.source_type {
        FundingType::Investor => existing.shares,
        FundingType::Donation => 0,
    };
    let updated = apply_changes(existing, changes);
    // Shrinking a holding frees stock, so only growth is checked.
    if updated.source_type == FundingType::Investor && updated.shares > held {
        let availability = funding_availability(settings.total_shares, &fundings, held);
        ensure_shares_available(updated.shares, &availability)?;
    }

    let body = serde_json::to_value(&updated)?;
    repo.update(Resource::Funding, changes.id, &body).await?;
    println!("Updated funding #{}", changes.id);
    Ok(())
}

pub async fn run(repo: &Repository<'_>, command: &FundingCommand, currency: &str) -> Result<()> {
    match command {
        FundingCommand::List => list(repo, currency).await,
        FundingCommand::Eligible { project, expense } => {
            eligible(repo, *project, *expense, currency).await
        }
        FundingCommand::Add(new) => add(repo, new).await,
        FundingCommand::Update(changes) => update(repo, changes).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::QueryKey;
    use crate::providers::repository::testing::FakeBackend;
    use crate::store::memory::MemoryCache;
    use std::sync::Arc;

    fn backend() -> FakeBackend {
        FakeBackend::with(&[
            ("/api/settings/", json!({"total_shares": 1000, "share_price": "100000"})),
            (
                "/api/funding/",
                json!([
                    {"id": 1, "source": 1, "source_type": "investor", "project": null,
                     "amount": "35000000", "shares": 350, "status": "available"},
                    {"id": 2, "source": 2, "source_type": "investor", "project": 5,
                     "amount": "25000000", "shares": 250, "status": "allocated"},
                    {"id": 3, "source": 3, "source_type": "donation", "project": null,
                     "amount": "9000000", "shares": null, "status": "used"}
                ]),
            ),
            ("/api/funding/2/", json!({"id": 2})),
        ])
    }

    fn repo(backend: &FakeBackend) -> Repository<'_> {
        Repository::new(backend, Arc::new(MemoryCache::<QueryKey, Value>::new()), None)
    }

    fn new_investor_funding(shares: u64) -> NewFunding {
        NewFunding {
            source: 9,
            source_type: FundingType::Investor,
            amount: Decimal::from(shares * 100_000),
            shares: Some(shares),
            project: None,
            date: NaiveDate::from_ymd_opt(2024, 7, 1),
            payment_method: Some("transfer".to_string()),
        }
    }

    fn changes(id: Id, shares: Option<u64>) -> FundingChanges {
        FundingChanges {
            id,
            amount: None,
            shares,
            project: None,
            pool: false,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_add_rejects_more_than_remaining_stock() {
        let backend = backend();
        let repo = repo(&backend);

        let err = add(&repo, &new_investor_funding(500)).await.unwrap_err();
        assert!(err.to_string().contains("only 400 are available"), "{err}");
        assert!(!backend.calls().iter().any(|c| c.starts_with("POST")));
    }

    #[tokio::test]
    async fn test_add_accepts_exact_remaining_stock() {
        let backend = backend();
        let repo = repo(&backend);

        add(&repo, &new_investor_funding(400)).await.unwrap();

        let post = backend
            .calls()
            .into_iter()
            .find(|c| c.starts_with("POST /api/funding/"))
            .expect("funding was not posted");
        assert!(post.contains(r#""shares":400"#), "{post}");
        assert!(post.contains(r#""project":null"#), "{post}");
    }

    #[tokio::test]
    async fn test_donation_never_checks_stock() {
        let backend = backend();
        let repo = repo(&backend);
        let mut donation = new_investor_funding(5000);
        donation.source_type = FundingType::Donation;

        add(&repo, &donation).await.unwrap();

        let calls = backend.calls();
        assert!(!calls.iter().any(|c| c == "GET /api/settings/"));
        assert!(calls.iter().any(|c| c.contains(r#""shares":0"#)));
    }

    #[tokio::test]
    async fn test_update_can_grow_into_own_allocation() {
        let backend = backend();
        let repo = repo(&backend);

        // 600 sold, funding #2 holds 250 -> up to 650 allowed
        update(&repo, &changes(2, Some(650))).await.unwrap();
        let err = update(&repo, &changes(2, Some(651))).await.unwrap_err();
        assert!(err.to_string().contains("only 650 are available"), "{err}");
    }

    #[tokio::test]
    async fn test_update_can_shrink_when_pool_is_oversubscribed() {
        // Total lowered to 500 after 600 shares were sold.
        let backend = FakeBackend::with(&[
            ("/api/settings/", json!({"total_shares": 500, "share_price": "100000"})),
            (
                "/api/funding/",
                json!([
                    {"id": 1, "source": 1, "source_type": "investor", "project": null,
                     "amount": "35000000", "shares": 350, "status": "available"},
                    {"id": 2, "source": 2, "source_type": "investor", "project": 5,
                     "amount": "25000000", "shares": 250, "status": "allocated"}
                ]),
            ),
            ("/api/funding/2/", json!({"id": 2})),
        ]);
        let repo = repo(&backend);

        update(&repo, &changes(2, Some(200))).await.unwrap();
        assert!(backend.calls().iter().any(|c| c.contains(r#""shares":200"#)));

        let err = update(&repo, &changes(2, Some(260))).await.unwrap_err();
        assert!(err.to_string().contains("only 150 are available"), "{err}");
    }

    #[test]
    fn test_apply_changes_moves_to_pool_and_zeroes_donation_shares() {
        let funding: Funding = serde_json::from_value(json!({
            "id": 3, "source_type": "donation", "project": 5,
            "amount": "10", "shares": 4, "status": "available"
        }))
        .unwrap();
        let mut c = changes(3, Some(10));
        c.pool = true;
        c.status = Some(FundingStatus::Used);

        let updated = apply_changes(funding, &c);
        assert_eq!(updated.project, None);
        assert_eq!(updated.shares, 0);
        assert_eq!(updated.status, FundingStatus::Used);
    }

    #[test]
    fn test_display_fundings_marks_pool() {
        let funding: Funding = serde_json::from_value(json!({
            "id": 1, "source_name": "Budi", "source_type": "investor", "project": null,
            "amount": "1000000", "shares": 10, "status": "available"
        }))
        .unwrap();
        let output = display_fundings("Fundings", &[&funding], "Rp");
        assert!(output.contains("Pool"));
        assert!(output.contains("Budi"));
        assert!(output.contains("Rp 1.000.000,00"));
    }
}
