//! Aggregates ownership records into per-investor holdings.
use crate::core::model::{Id, Ownership};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

/// One investor's share of the filtered ownership set.
#[derive(Debug, Clone, PartialEq)]
pub struct InvestorShare {
    pub investor: Id,
    pub name: String,
    pub units: u64,
    pub investment: Decimal,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub total_units: u64,
    pub total_investment: Decimal,
    /// Sorted by percentage, highest first.
    pub shares: Vec<InvestorShare>,
}

impl Composition {
    /// The top three holders shown as the headline summary.
    pub fn summary(&self) -> &[InvestorShare] {
        &self.shares[..self.shares.len().min(3)]
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

/// Only records placed on `asset`; `None` keeps all of them.
pub fn filter_by_asset(ownerships: &[Ownership], asset: Option<Id>) -> Vec<Ownership> {
    ownerships
        .iter()
        .filter(|o| asset.is_none() || o.asset == asset)
        .cloned()
        .collect()
}

pub fn compose(ownerships: &[Ownership]) -> Composition {
    let mut index: HashMap<Id, usize> = HashMap::new();
    let mut groups: Vec<InvestorShare> = Vec::new();

    for ownership in ownerships {
        let slot = *index.entry(ownership.investor).or_insert_with(|| {
            groups.push(InvestorShare {
                investor: ownership.investor,
                name: ownership
                    .investor_name
                    .clone()
                    .unwrap_or_else(|| format!("Investor #{}", ownership.investor)),
                units: 0,
                investment: Decimal::ZERO,
                percentage: 0.0,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.units += ownership.units;
        group.investment += ownership.total_investment;
    }

    let total_units: u64 = groups.iter().map(|g| g.units).sum();
    let total_investment = groups.iter().map(|g| g.investment).sum();
    if total_units > 0 {
        for group in &mut groups {
            group.percentage = group.units as f64 * 100.0 / total_units as f64;
        }
    }

    // sort_by is stable, equal percentages keep first-seen order
    groups.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));
    debug!(
        investors = groups.len(),
        total_units, "Computed ownership composition"
    );

    Composition {
        total_units,
        total_investment,
        shares: groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ownership(id: Id, investor: Id, asset: Option<Id>, units: u64) -> Ownership {
        Ownership {
            id,
            investor,
            investor_name: Some(format!("Investor {investor}")),
            asset,
            funding: None,
            units,
            investment_date: None,
            ownership_percentage: None,
            total_investment: Decimal::from(units * 100_000),
        }
    }

    #[test]
    fn test_two_investor_split_sorted_descending() {
        let composition = compose(&[
            ownership(1, 1, Some(1), 30),
            ownership(2, 2, Some(1), 70),
        ]);

        let order: Vec<(Id, f64)> = composition
            .shares
            .iter()
            .map(|s| (s.investor, s.percentage))
            .collect();
        assert_eq!(order, vec![(2, 70.0), (1, 30.0)]);
        assert_eq!(composition.total_units, 100);
    }

    #[test]
    fn test_same_investor_accumulates() {
        let composition = compose(&[
            ownership(1, 1, Some(1), 10),
            ownership(2, 2, Some(1), 25),
            ownership(3, 1, Some(2), 20),
        ]);

        let first = &composition.shares[0];
        assert_eq!(first.investor, 1);
        assert_eq!(first.units, 30);
        assert_eq!(first.investment, Decimal::from(3_000_000));
        assert_eq!(composition.total_investment, Decimal::from(5_500_000));
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let composition = compose(&[
            ownership(1, 1, None, 1),
            ownership(2, 2, None, 1),
            ownership(3, 3, None, 1),
            ownership(4, 4, None, 7),
        ]);
        let sum: f64 = composition.shares.iter().map(|s| s.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9, "sum was {sum}");
    }

    #[test]
    fn test_zero_units_yield_zero_percentages() {
        let composition = compose(&[ownership(1, 1, None, 0), ownership(2, 2, None, 0)]);
        assert!(composition.shares.iter().all(|s| s.percentage == 0.0));
        assert!(composition.shares.iter().all(|s| !s.percentage.is_nan()));
    }

    #[test]
    fn test_ties_keep_input_order_and_summary_is_top_three() {
        let composition = compose(&[
            ownership(1, 4, None, 10),
            ownership(2, 3, None, 10),
            ownership(3, 2, None, 10),
            ownership(4, 1, None, 10),
            ownership(5, 9, None, 60),
        ]);
        let order: Vec<Id> = composition.shares.iter().map(|s| s.investor).collect();
        assert_eq!(order, vec![9, 4, 3, 2, 1]);

        let summary: Vec<Id> = composition.summary().iter().map(|s| s.investor).collect();
        assert_eq!(summary, vec![9, 4, 3]);
    }

    #[test]
    fn test_filter_by_asset() {
        let all = vec![
            ownership(1, 1, Some(1), 10),
            ownership(2, 2, Some(2), 10),
            ownership(3, 3, None, 10),
        ];
        assert_eq!(filter_by_asset(&all, Some(2)).len(), 1);
        assert_eq!(filter_by_asset(&all, None).len(), 3);
        assert!(compose(&filter_by_asset(&all, Some(42))).is_empty());
    }

    #[test]
    fn test_missing_name_falls_back_to_id() {
        let mut o = ownership(1, 12, None, 5);
        o.investor_name = None;
        assert_eq!(compose(&[o]).shares[0].name, "Investor #12");
    }
}
