//! Share-pool arithmetic and funding eligibility rules.
//!
//! Everything here is a pure function over already-fetched records. The
//! backend stays the system of record; these checks only decide what the
//! console lets a user submit.
use crate::core::model::{Expense, Funding, FundingStatus, FundingType, Id, Ownership};

/// Result of comparing the share pool with what has already been sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAvailability {
    pub total_shares: u64,
    pub sold_shares: u64,
    /// Shares already held by the record being edited.
    pub current_transaction_shares: u64,
    pub available: u64,
}

impl StockAvailability {
    /// Computes `max(0, total - (sold - current))` without intermediate
    /// underflow, so a stale `current` above `sold` still counts in full.
    pub fn compute(total_shares: u64, sold_shares: u64, current_transaction_shares: u64) -> Self {
        Self {
            total_shares,
            sold_shares,
            current_transaction_shares,
            available: total_shares
                .saturating_add(current_transaction_shares)
                .saturating_sub(sold_shares),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.available == 0
    }
}

/// Sum of shares across investor fundings. Donations never consume the pool.
pub fn sold_shares(fundings: &[Funding]) -> u64 {
    fundings
        .iter()
        .filter(|f| f.source_type == FundingType::Investor)
        .map(|f| f.shares)
        .sum()
}

/// Shares still purchasable through a funding record.
pub fn funding_availability(
    total_shares: u64,
    fundings: &[Funding],
    current_transaction_shares: u64,
) -> StockAvailability {
    StockAvailability::compute(total_shares, sold_shares(fundings), current_transaction_shares)
}

/// Units still assignable through an ownership record.
pub fn ownership_availability(
    total_shares: u64,
    ownerships: &[Ownership],
    current_units: u64,
) -> StockAvailability {
    let allocated = ownerships.iter().map(|o| o.units).sum();
    StockAvailability::compute(total_shares, allocated, current_units)
}

/// Outcome of validating a requested share count against availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareCheck {
    Accepted { remaining_after: u64 },
    Exceeds { max_allowed: u64 },
    /// Nothing left and the request asks for more than zero.
    Exhausted,
}

pub fn check_share_request(requested: u64, availability: &StockAvailability) -> ShareCheck {
    if requested == 0 {
        return ShareCheck::Accepted {
            remaining_after: availability.available,
        };
    }
    if availability.is_exhausted() {
        return ShareCheck::Exhausted;
    }
    if requested > availability.available {
        return ShareCheck::Exceeds {
            max_allowed: availability.available,
        };
    }
    ShareCheck::Accepted {
        remaining_after: availability.available - requested,
    }
}

/// Whether `funding` may back an expense under the selected project.
///
/// Pool fundings are always candidates. Project fundings only serve their own
/// project. A used funding stays selectable for the expense that already
/// consumes it.
pub fn is_funding_eligible(
    funding: &Funding,
    selected_project: Option<Id>,
    current_expense: Option<&Expense>,
) -> bool {
    let own_funding = current_expense
        .and_then(|e| e.funding_id)
        .is_some_and(|id| id == funding.id);
    if funding.status == FundingStatus::Used && !own_funding {
        return false;
    }
    match selected_project {
        Some(project) => funding.project.is_none() || funding.project == Some(project),
        None => funding.project.is_none(),
    }
}

pub fn eligible_fundings<'a>(
    fundings: &'a [Funding],
    selected_project: Option<Id>,
    current_expense: Option<&Expense>,
) -> Vec<&'a Funding> {
    fundings
        .iter()
        .filter(|f| is_funding_eligible(f, selected_project, current_expense))
        .collect()
}

/// Drops a selected funding that is no longer among the eligible ones.
pub fn reconcile_selection(selected: Option<Id>, eligible: &[&Funding]) -> Option<Id> {
    selected.filter(|id| eligible.iter().any(|f| f.id == *id))
}
