use super::ui;
use crate::core::distribution::DistributionSummary;
use crate::core::model::{DistributionItem, Id, ProfitDistribution};
use crate::core::resource::Resource;
use crate::providers::Repository;
use crate::providers::wire;
use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use comfy_table::Cell;
use rust_decimal::Decimal;
use serde_json::{Value, json};

#[derive(Debug, Clone, Subcommand)]
pub enum DistributionCommand {
    /// List recorded distributions
    List,
    /// Show the breakdown of one distribution
    Show { id: Id },
    /// Ask the backend how an amount would be split, without saving
    Preview(DistributionRequest),
    /// Record a distribution
    Create(DistributionRequest),
    /// Delete a distribution
    Delete { id: Id },
}

#[derive(Debug, Clone, Args)]
pub struct DistributionRequest {
    /// Amount to distribute
    #[arg(long)]
    pub total: Decimal,
    #[arg(long)]
    pub date: Option<NaiveDate>,
    #[arg(long)]
    pub notes: Option<String>,
}

impl DistributionRequest {
    fn body(&self) -> Value {
        json!({
            "total_distributed": self.total,
            "date": self.date.unwrap_or_else(|| chrono::Local::now().date_naive()),
            "notes": self.notes,
        })
    }
}

pub fn display_distributions(distributions: &[ProfitDistribution], currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Date"),
        ui::header_cell("Total"),
        ui::header_cell("Landowner"),
        ui::header_cell("Investors"),
        ui::header_cell("Retained"),
        ui::header_cell("Paid out"),
    ]);
    for d in distributions {
        table.add_row(vec![
            ui::format_optional_cell(d.id, |id| id.to_string()),
            ui::format_optional_cell(d.date, |date| date.to_string()),
            ui::number_cell(ui::format_amount(d.total_distributed, currency)),
            ui::number_cell(ui::format_amount(d.landowner_portion, currency)),
            ui::number_cell(ui::format_amount(d.investor_portion, currency)),
            ui::number_cell(ui::format_amount(d.retained_portion, currency)),
            ui::number_cell(ui::format_amount(d.real_distributed, currency)),
        ]);
    }
    format!(
        "{}\n\n{}",
        ui::style_text("Profit distributions", ui::StyleType::Title),
        table
    )
}

fn items_table(
    summary: &DistributionSummary,
    items: &[DistributionItem],
    with_share: bool,
    currency: &str,
) -> String {
    let mut table = ui::new_styled_table();
    let mut header = vec![ui::header_cell("Recipient"), ui::header_cell("Amount")];
    if with_share {
        header.push(ui::header_cell("Share"));
    }
    table.set_header(header);
    for item in items {
        let mut row = vec![
            Cell::new(&item.description),
            ui::number_cell(ui::format_amount(item.amount, currency)),
        ];
        if with_share {
            row.push(ui::format_optional_cell(
                summary.investor_item_share(item),
                |share| format!("{share:.2}%"),
            ));
        }
        table.add_row(row);
    }
    table.to_string()
}

pub fn display_summary(title: &str, record: &ProfitDistribution, currency: &str) -> String {
    let summary = DistributionSummary::from_record(record);
    let mut output = format!("{}\n\n", ui::style_text(title, ui::StyleType::Title));

    let mut portions = ui::new_styled_table();
    portions.set_header(vec![
        ui::header_cell("Portion"),
        ui::header_cell("Allocated"),
        ui::header_cell("Paid"),
    ]);
    portions.add_row(vec![
        Cell::new("Landowner"),
        ui::number_cell(ui::format_amount(summary.landowner_portion, currency)),
        ui::number_cell(ui::format_amount(summary.landowner_paid, currency)),
    ]);
    portions.add_row(vec![
        Cell::new("Investors"),
        ui::number_cell(ui::format_amount(summary.investor_portion, currency)),
        ui::number_cell(ui::format_amount(summary.investor_paid, currency)),
    ]);
    portions.add_row(vec![
        Cell::new("Retained"),
        ui::number_cell(ui::format_amount(summary.retained_portion, currency)),
        Cell::new(""),
    ]);
    portions.add_row(vec![
        Cell::new(ui::style_text("Total", ui::StyleType::TotalLabel)),
        ui::number_cell(ui::style_text(
            &ui::format_amount(summary.total_distributed, currency),
            ui::StyleType::TotalValue,
        )),
        ui::number_cell(ui::style_text(
            &ui::format_amount(summary.real_distributed, currency),
            ui::StyleType::TotalValue,
        )),
    ]);
    output.push_str(&portions.to_string());
    output.push_str(&format!(
        "\n{} {}\n",
        ui::style_text("Undistributed:", ui::StyleType::TotalLabel),
        ui::format_amount(summary.undistributed, currency)
    ));

    if !summary.landowner_items.is_empty() {
        output.push_str(&format!(
            "\n{}\n{}\n",
            ui::style_text("Landowner", ui::StyleType::TotalLabel),
            items_table(&summary, &summary.landowner_items, false, currency)
        ));
    }
    if !summary.investor_items.is_empty() {
        output.push_str(&format!(
            "\n{}\n{}\n",
            ui::style_text("Investors", ui::StyleType::TotalLabel),
            items_table(&summary, &summary.investor_items, true, currency)
        ));
    }
    if let Some(notes) = record.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        output.push_str(&format!(
            "\n{}\n",
            ui::style_text(&format!("Notes: {notes}"), ui::StyleType::Subtle)
        ));
    }
    output
}

pub async fn run(repo: &Repository<'_>, command: &DistributionCommand, currency: &str) -> Result<()> {
    match command {
        DistributionCommand::List => {
            let distributions =
                ui::with_spinner("Fetching distributions...", repo.distributions()).await?;
            if distributions.is_empty() {
                ui::print_empty("distributions");
            } else {
                println!("{}", display_distributions(&distributions, currency));
            }
        }
        DistributionCommand::Show { id } => {
            let record = ui::with_spinner("Fetching distribution...", repo.distribution(*id)).await?;
            let title = format!("Distribution #{id}");
            println!("{}", display_summary(&title, &record, currency));
        }
        DistributionCommand::Preview(request) => {
            if request.total <= Decimal::ZERO {
                bail!("Distribution total must be positive");
            }
            let preview = ui::with_spinner(
                "Computing preview...",
                repo.preview_distribution(&request.body()),
            )
            .await?;
            println!("{}", display_summary("Distribution preview", &preview, currency));
        }
        DistributionCommand::Create(request) => {
            if request.total <= Decimal::ZERO {
                bail!("Distribution total must be positive");
            }
            let created = repo
                .create(Resource::ProfitDistribution, &request.body())
                .await?;
            match wire::decode_one::<ProfitDistribution>(created.clone()) {
                Ok(record) if !record.items.is_empty() => {
                    let title = match record.id {
                        Some(id) => format!("Created distribution #{id}"),
                        None => "Created distribution".to_string(),
                    };
                    println!("{}", display_summary(&title, &record, currency));
                }
                _ => match wire::record_id(&created) {
                    Some(id) => println!("Created distribution #{id}"),
                    None => println!("Created distribution"),
                },
            }
        }
        DistributionCommand::Delete { id } => {
            repo.delete(Resource::ProfitDistribution, *id).await?;
            println!("Deleted distribution #{id}");
        }
    }
    Ok(())
}
