//! Read-only view over a profit distribution computed by the backend.
use crate::core::model::{DistributionItem, DistributionRole, ProfitDistribution};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct DistributionSummary {
    pub total_distributed: Decimal,
    pub landowner_portion: Decimal,
    pub investor_portion: Decimal,
    pub retained_portion: Decimal,
    pub real_distributed: Decimal,
    /// Portion announced but not paid out.
    pub undistributed: Decimal,
    pub landowner_paid: Decimal,
    pub investor_paid: Decimal,
    pub landowner_items: Vec<DistributionItem>,
    pub investor_items: Vec<DistributionItem>,
}

impl DistributionSummary {
    pub fn from_record(record: &ProfitDistribution) -> Self {
        let (landowner_items, investor_items): (Vec<_>, Vec<_>) = record
            .items
            .iter()
            .cloned()
            .partition(|item| item.role == DistributionRole::Landowner);

        let landowner_paid = landowner_items.iter().map(|i| i.amount).sum();
        let investor_paid = investor_items.iter().map(|i| i.amount).sum();

        Self {
            total_distributed: record.total_distributed,
            landowner_portion: record.landowner_portion,
            investor_portion: record.investor_portion,
            retained_portion: record.retained_portion,
            real_distributed: record.real_distributed,
            undistributed: record.total_distributed - record.real_distributed,
            landowner_paid,
            investor_paid,
            landowner_items,
            investor_items,
        }
    }

    /// Share of the investor portion paid to one item, as a percentage.
    pub fn investor_item_share(&self, item: &DistributionItem) -> Option<Decimal> {
        if self.investor_portion.is_zero() {
            return None;
        }
        Some((item.amount / self.investor_portion * Decimal::ONE_HUNDRED).round_dp(2))
    }
}
