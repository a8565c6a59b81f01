use super::ui;
use crate::core::allocation::{StockAvailability, funding_availability};
use crate::core::model::{FundingType, Id, Settings};
use crate::providers::Repository;
use crate::providers::repository::find_by_id;
use anyhow::{Result, anyhow};
use comfy_table::Cell;
use rust_decimal::Decimal;

pub fn display_availability(
    availability: &StockAvailability,
    settings: &Settings,
    currency: &str,
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Share pool"), ui::header_cell("Value")]);

    let rows = [
        ("Total shares", ui::format_count(availability.total_shares)),
        ("Sold to investors", ui::format_count(availability.sold_shares)),
        (
            "Held by edited funding",
            ui::format_count(availability.current_transaction_shares),
        ),
        ("Available", ui::format_count(availability.available)),
        (
            "Share price",
            ui::format_amount(settings.share_price, currency),
        ),
        (
            "Value of available shares",
            ui::format_amount(
                settings.share_price * Decimal::from(availability.available),
                currency,
            ),
        ),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), ui::number_cell(value)]);
    }

    let mut output = format!(
        "{}\n\n",
        ui::style_text("Stock availability", ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output
}

pub async fn run(repo: &Repository<'_>, editing_funding: Option<Id>, currency: &str) -> Result<()> {
    let (settings, fundings) = ui::with_spinner("Fetching stock...", async {
        futures::try_join!(repo.settings(), repo.fundings())
    })
    .await?;

    let current = match editing_funding {
        Some(id) => {
            let funding = find_by_id(fundings.clone(), id, |f| f.id)
                .ok_or_else(|| anyhow!("Funding #{id} not found"))?;
            if funding.source_type == FundingType::Investor {
                funding.shares
            } else {
                0
            }
        }
        None => 0,
    };

    let availability = funding_availability(settings.total_shares, &fundings, current);
    println!("{}", display_availability(&availability, &settings, currency));

    if settings.total_shares == 0 {
        ui::print_warning("The share pool has not been configured yet.");
    } else if availability.is_exhausted() {
        ui::print_warning("Stock exhausted: no shares are left for new investor fundings.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_availability() {
        let availability = StockAvailability::compute(1000, 600, 0);
        let settings = Settings {
            total_shares: 1000,
            share_price: Decimal::from(150_000),
        };

        let output = display_availability(&availability, &settings, "Rp");

        assert!(output.contains("Stock availability"));
        assert!(output.contains("1.000"));
        assert!(output.contains("400"));
        assert!(output.contains("Rp 150.000,00"));
        assert!(output.contains("Rp 60.000.000,00"));
    }
}
