use super::funding::ensure_shares_available;
use super::ui;
use crate::core::allocation::ownership_availability;
use crate::core::composition::{Composition, compose, filter_by_asset};
use crate::core::model::{Asset, Id, Ownership};
use crate::core::resource::Resource;
use crate::providers::Repository;
use crate::providers::repository::find_by_id;
use crate::providers::wire;
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde_json::{Value, json};
use tracing::info;

const BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, Subcommand)]
pub enum OwnershipCommand {
    /// Show who owns what share of an asset, or of everything
    Composition {
        #[arg(long)]
        asset: Option<Id>,
    },
    /// Record a new ownership stake
    Add(NewOwnership),
    /// Change an ownership stake
    Update(OwnershipChanges),
}

#[derive(Debug, Clone, Args)]
pub struct NewOwnership {
    #[arg(long)]
    pub investor: Id,
    #[arg(long)]
    pub funding: Id,
    #[arg(long)]
    pub units: u64,
    /// Asset the units are placed on; omit to keep them in the pool
    #[arg(long)]
    pub asset: Option<Id>,
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Args)]
pub struct OwnershipChanges {
    pub id: Id,
    #[arg(long)]
    pub units: Option<u64>,
    #[arg(long, conflicts_with = "pool")]
    pub asset: Option<Id>,
    /// Take the units off their asset and back into the pool
    #[arg(long)]
    pub pool: bool,
}

pub fn display_composition(title: &str, composition: &Composition, currency: &str) -> String {
    let mut output = format!("{}\n\n", ui::style_text(title, ui::StyleType::Title));

    let headline: Vec<String> = composition
        .summary()
        .iter()
        .map(|s| format!("{} {:.2}%", s.name, s.percentage))
        .collect();
    output.push_str(&format!(
        "{} {}\n\n",
        ui::style_text("Top holders:", ui::StyleType::TotalLabel),
        headline.join(", ")
    ));

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Investor"),
        ui::header_cell("Units"),
        ui::header_cell("Investment"),
        ui::header_cell("Share"),
        ui::header_cell(""),
    ]);
    for share in &composition.shares {
        table.add_row(vec![
            Cell::new(&share.name),
            ui::number_cell(ui::format_count(share.units)),
            ui::number_cell(ui::format_amount(share.investment, currency)),
            ui::format_percentage_cell(share.percentage),
            Cell::new(ui::proportion_bar(share.percentage, BAR_WIDTH)),
        ]);
    }
    table.add_row(vec![
        Cell::new(ui::style_text("Total", ui::StyleType::TotalLabel)),
        ui::number_cell(ui::style_text(
            &ui::format_count(composition.total_units),
            ui::StyleType::TotalValue,
        )),
        ui::number_cell(ui::style_text(
            &ui::format_amount(composition.total_investment, currency),
            ui::StyleType::TotalValue,
        )),
        Cell::new(""),
        Cell::new(""),
    ]);
    output.push_str(&table.to_string());
    output
}

fn composition_title(asset: Option<Id>, assets: &[Asset]) -> String {
    match asset {
        None => "Ownership composition".to_string(),
        Some(id) => match assets.iter().find(|a| a.id == id) {
            Some(a) => format!("Ownership composition: {}", a.name),
            None => format!("Ownership composition: asset #{id}"),
        },
    }
}

async fn composition(repo: &Repository<'_>, asset: Option<Id>, currency: &str) -> Result<()> {
    let (ownerships, assets) = ui::with_spinner("Fetching ownerships...", async {
        futures::try_join!(repo.ownerships(), repo.assets())
    })
    .await?;

    let composition = compose(&filter_by_asset(&ownerships, asset));
    if composition.is_empty() {
        ui::print_empty("ownerships");
        return Ok(());
    }
    println!(
        "{}",
        display_composition(&composition_title(asset, &assets), &composition, currency)
    );
    Ok(())
}

fn new_ownership_body(new: &NewOwnership) -> Value {
    json!({
        "investor": new.investor,
        "asset": new.asset,
        "funding": new.funding,
        "units": new.units,
        "investment_date": new.date.unwrap_or_else(|| chrono::Local::now().date_naive()),
    })
}

async fn add(repo: &Repository<'_>, new: &NewOwnership) -> Result<()> {
    let (settings, ownerships) = ui::with_spinner("Checking stock...", async {
        futures::try_join!(repo.settings(), repo.ownerships())
    })
    .await?;
    let availability = ownership_availability(settings.total_shares, &ownerships, 0);
    let remaining = ensure_shares_available(new.units, &availability)?;

    let created = repo
        .create(Resource::Ownership, &new_ownership_body(new))
        .await?;
    match wire::record_id(&created) {
        Some(id) => println!("Created ownership #{id}"),
        None => println!("Created ownership"),
    }
    info!(units = new.units, remaining, "Ownership created");
    Ok(())
}

pub fn apply_changes(mut ownership: Ownership, changes: &OwnershipChanges) -> Ownership {
    if let Some(units) = changes.units {
        ownership.units = units;
    }
    if changes.pool {
        ownership.asset = None;
    } else if let Some(asset) = changes.asset {
        ownership.asset = Some(asset);
    }
    ownership
}

async fn update(repo: &Repository<'_>, changes: &OwnershipChanges) -> Result<()> {
    let (settings, ownerships) = ui::with_spinner("Fetching ownerships...", async {
        futures::try_join!(repo.settings(), repo.ownerships())
    })
    .await?;
    let existing = find_by_id(ownerships.clone(), changes.id, |o| o.id)
        .ok_or_else(|| anyhow!("Ownership #{} not found", changes.id))?;

    let held = existing.units;
    let updated = apply_changes(existing, changes);
    if updated.units > held {
        let availability = ownership_availability(settings.total_shares, &ownerships, held);
        ensure_shares_available(updated.units, &availability)?;
    }

    repo.update(
        Resource::Ownership,
        changes.id,
        &serde_json::to_value(&updated)?,
    )
    .await?;
    println!("Updated ownership #{}", changes.id);
    Ok(())
}

pub async fn run(repo: &Repository<'_>, command: &OwnershipCommand, currency: &str) -> Result<()> {
    match command {
        OwnershipCommand::Composition { asset } => composition(repo, *asset, currency).await,
        OwnershipCommand::Add(new) => add(repo, new).await,
        OwnershipCommand::Update(changes) => update(repo, changes).await,
    }
}
