use super::ui;
use crate::core::allocation::sold_shares;
use crate::core::model::Settings;
use crate::providers::Repository;
use anyhow::{Result, bail};
use clap::Subcommand;
use comfy_table::Cell;
use rust_decimal::Decimal;
use tracing::info;

#[derive(Debug, Clone, Subcommand)]
pub enum SettingsCommand {
    /// Show the share pool configuration
    Show,
    /// Change the share pool configuration
    Update {
        #[arg(long)]
        total_shares: Option<u64>,
        #[arg(long)]
        share_price: Option<Decimal>,
    },
}

pub fn display_settings(settings: &Settings, sold: u64, currency: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Setting"), ui::header_cell("Value")]);
    table.add_row(vec![
        Cell::new("Total shares"),
        ui::number_cell(ui::format_count(settings.total_shares)),
    ]);
    table.add_row(vec![
        Cell::new("Share price"),
        ui::number_cell(ui::format_amount(settings.share_price, currency)),
    ]);
    table.add_row(vec![
        Cell::new("Sold to investors"),
        ui::number_cell(ui::format_count(sold)),
    ]);
    table.add_row(vec![
        Cell::new("Pool value"),
        ui::number_cell(ui::format_amount(
            settings.share_price * Decimal::from(settings.total_shares),
            currency,
        )),
    ]);
    format!(
        "{}\n\n{}",
        ui::style_text("Settings", ui::StyleType::Title),
        table
    )
}

pub async fn run(repo: &Repository<'_>, command: &SettingsCommand, currency: &str) -> Result<()> {
    let (settings, fundings) = ui::with_spinner("Fetching settings...", async {
        futures::try_join!(repo.settings(), repo.fundings())
    })
    .await?;
    let sold = sold_shares(&fundings);

    match command {
        SettingsCommand::Show => {
            println!("{}", display_settings(&settings, sold, currency));
        }
        SettingsCommand::Update {
            total_shares,
            share_price,
        } => {
            if total_shares.is_none() && share_price.is_none() {
                bail!("Nothing to update: pass --total-shares and/or --share-price");
            }
            if share_price.is_some_and(|p| p < Decimal::ZERO) {
                bail!("Share price cannot be negative");
            }
            let mut updated = settings.clone();
            if let Some(total) = total_shares {
                updated.total_shares = *total;
            }
            if let Some(price) = share_price {
                updated.share_price = *price;
            }
            if updated.total_shares < sold {
                ui::print_warning(&format!(
                    "{} shares are already sold; the pool is now oversubscribed.",
                    ui::format_count(sold)
                ));
            }

            let saved = repo.update_settings(&updated).await?;
            info!(total_shares = saved.total_shares, "Settings updated");
            println!("{}", display_settings(&saved, sold, currency));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::QueryKey;
    use crate::providers::repository::testing::FakeBackend;
    use crate::store::memory::MemoryCache;
    use serde_json::{Value, json};
    use std::sync::Arc;

    #[test]
    fn test_display_settings() {
        let settings = Settings {
            total_shares: 1000,
            share_price: Decimal::from(100_000),
        };
        let output = display_settings(&settings, 600, "Rp");
        assert!(output.contains("Rp 100.000.000,00"));
        assert!(output.contains("600"));
    }

    #[tokio::test]
    async fn test_update_merges_with_current_settings() {
        let backend = FakeBackend::with(&[
            ("/api/settings/", json!({"total_shares": 1000, "share_price": "100000"})),
            ("/api/funding/", json!([])),
        ]);
        let repo = Repository::new(
            &backend,
            Arc::new(MemoryCache::<QueryKey, Value>::new()),
            None,
        );

        run(
            &repo,
            &SettingsCommand::Update {
                total_shares: Some(1500),
                share_price: None,
            },
            "Rp",
        )
        .await
        .unwrap();

        let post = backend
            .calls()
            .into_iter()
            .find(|c| c.starts_with("POST /api/settings/"))
            .unwrap();
        assert!(post.contains(r#""total_shares":1500"#), "{post}");
        assert!(post.contains("100000"), "{post}");
    }

    #[tokio::test]
    async fn test_empty_update_is_refused() {
        let backend = FakeBackend::with(&[
            ("/api/settings/", json!([])),
            ("/api/funding/", json!([])),
        ]);
        let repo = Repository::new(
            &backend,
            Arc::new(MemoryCache::<QueryKey, Value>::new()),
            None,
        );

        let err = run(
            &repo,
            &SettingsCommand::Update {
                total_shares: None,
                share_price: None,
            },
            "Rp",
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Nothing to update"));
    }
}
