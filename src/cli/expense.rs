use super::funding::display_fundings;
use super::ui;
use crate::core::allocation::{eligible_fundings, reconcile_selection};
use crate::core::model::{Expense, Funding, Id};
use crate::core::resource::Resource;
use crate::providers::Repository;
use crate::providers::repository::find_by_id;
use crate::providers::wire;
use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, info};

#[derive(Debug, Clone, Subcommand)]
pub enum ExpenseCommand {
    /// Record an expense against an eligible funding
    Add(NewExpense),
    /// Change an expense
    Update(ExpenseChanges),
}

#[derive(Debug, Clone, Args)]
pub struct NewExpense {
    #[arg(long)]
    pub category: String,
    #[arg(long)]
    pub amount: Decimal,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// Project the expense belongs to; omit for a general expense
    #[arg(long)]
    pub project: Option<Id>,
    #[arg(long)]
    pub funding: Id,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ExpenseChanges {
    pub id: Id,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub amount: Option<Decimal>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long, conflicts_with = "general")]
    pub project: Option<Id>,
    /// Detach the expense from its project
    #[arg(long)]
    pub general: bool,
    #[arg(long)]
    pub funding: Option<Id>,
    #[arg(long)]
    pub description: Option<String>,
}

fn ineligible(funding: Id, project: Option<Id>, options: &[&Funding]) -> anyhow::Error {
    let scope = match project {
        Some(p) => format!("project #{p}"),
        None => "a general expense".to_string(),
    };
    if options.is_empty() {
        return anyhow!("Funding #{funding} cannot back {scope}: no eligible funding exists");
    }
    let ids: Vec<String> = options.iter().map(|f| f.label()).collect();
    anyhow!(
        "Funding #{funding} cannot back {scope}. Eligible: {}",
        ids.join(", ")
    )
}

async fn add(repo: &Repository<'_>, new: &NewExpense, currency: &str) -> Result<()> {
    let fundings = ui::with_spinner("Fetching fundings...", repo.fundings()).await?;
    let options = eligible_fundings(&fundings, new.project, None);
    if reconcile_selection(Some(new.funding), &options).is_none() {
        if !options.is_empty() {
            println!("{}", display_fundings("Eligible fundings", &options, currency));
        }
        return Err(ineligible(new.funding, new.project, &options));
    }

    let body = json!({
        "category": new.category,
        "amount": new.amount,
        "date": new.date.unwrap_or_else(|| chrono::Local::now().date_naive()),
        "project_id": new.project,
        "funding_id": new.funding,
        "description": new.description,
    });
    let created = repo.create(Resource::Expense, &body).await?;
    match wire::record_id(&created) {
        Some(id) => println!("Created expense #{id}"),
        None => println!("Created expense"),
    }
    info!(funding = new.funding, "Expense created");
    Ok(())
}

/// Applies everything except the funding choice, which needs eligibility.
pub fn apply_changes(mut expense: Expense, changes: &ExpenseChanges) -> Expense {
    if let Some(category) = &changes.category {
        expense.category = category.clone();
    }
    if let Some(amount) = changes.amount {
        expense.amount = amount;
    }
    if let Some(date) = changes.date {
        expense.date = date;
    }
    if changes.general {
        expense.project_id = None;
    } else if let Some(project) = changes.project {
        expense.project_id = Some(project);
    }
    if let Some(description) = &changes.description {
        expense.description = Some(description.clone());
    }
    expense
}

async fn update(repo: &Repository<'_>, changes: &ExpenseChanges, currency: &str) -> Result<()> {
    let (fundings, expenses) = ui::with_spinner("Fetching expenses...", async {
        futures::try_join!(repo.fundings(), repo.expenses())
    })
    .await?;
    let existing = find_by_id(expenses, changes.id, |e| e.id)
        .ok_or_else(|| anyhow!("Expense #{} not found", changes.id))?;

    let mut updated = apply_changes(existing.clone(), changes);
    let options = eligible_fundings(&fundings, updated.project_id, Some(&existing));

    match changes.funding {
        Some(requested) => {
            if reconcile_selection(Some(requested), &options).is_none() {
                return Err(ineligible(requested, updated.project_id, &options));
            }
            updated.funding_id = Some(requested);
        }
        None => {
            updated.funding_id = reconcile_selection(existing.funding_id, &options);
            if updated.funding_id.is_none() {
                if !options.is_empty() {
                    println!("{}", display_fundings("Eligible fundings", &options, currency));
                }
                bail!(
                    "Funding #{} is not eligible after this change; pass --funding with an eligible id",
                    existing.funding_id.map_or("-".to_string(), |id| id.to_string())
                );
            }
        }
    }
    debug!(expense = changes.id, funding = ?updated.funding_id, "Resolved expense funding");

    let body = json!({
        "id": updated.id,
        "category": updated.category,
        "amount": updated.amount,
        "date": updated.date,
        "project_id": updated.project_id,
        "funding_id": updated.funding_id,
        "description": updated.description,
    });
    repo.update(Resource::Expense, changes.id, &body).await?;
    println!("Updated expense #{}", changes.id);
    Ok(())
}

pub async fn run(repo: &Repository<'_>, command: &ExpenseCommand, currency: &str) -> Result<()> {
    match command {
        ExpenseCommand::Add(new) => add(repo, new, currency).await,
        ExpenseCommand::Update(changes) => update(repo, changes, currency).await,
    }
}
