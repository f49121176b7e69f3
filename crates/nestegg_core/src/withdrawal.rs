//! Withdrawal waterfall across account buckets
//!
//! A mandatory distribution is taken from the tax-deferred bucket first.
//! Any shortfall left is then drawn taxable, tax-deferred, Roth in that
//! order. Proportional cost-basis reduction divides by the bucket balance,
//! so buckets under `STABILITY_FLOOR` are treated as exhausted.

use crate::model::{AccountBucket, Balances};

/// Buckets holding less than this are left untouched
pub const STABILITY_FLOOR: f64 = 1_000.0;

/// Outcome of covering one year's shortfall
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WithdrawalBreakdown {
    pub from_taxable: f64,
    pub from_tax_deferred: f64,
    pub from_roth: f64,
    /// Mandatory part of the tax-deferred withdrawal
    pub required_distribution: f64,
    /// Distribution in excess of the shortfall, moved into taxable
    pub reinvested: f64,
    /// Gain realized by the taxable withdrawal
    pub realized_gain: f64,
    /// Shortfall the buckets could not cover
    pub unmet: f64,
    /// Buckets skipped because they held only dust, by `AccountBucket::index`
    pub floored: [bool; 3],
    pub balances: Balances,
}

impl WithdrawalBreakdown {
    pub fn total(&self) -> f64 {
        self.from_taxable + self.from_tax_deferred + self.from_roth
    }

    /// Amount available for spending: withdrawals less the reinvested excess
    pub fn spendable(&self) -> f64 {
        self.total() - self.reinvested
    }

    pub fn floored_buckets(&self) -> impl Iterator<Item = AccountBucket> + '_ {
        AccountBucket::WITHDRAWAL_ORDER
            .into_iter()
            .filter(|b| self.floored[b.index()])
    }
}

/// Cover `shortfall` from `balances`, releasing at least
/// `required_minimum_distribution` from the tax-deferred bucket.
///
/// Negative shortfalls are treated as zero. The total withdrawn never
/// exceeds the total available.
pub fn withdraw(
    shortfall: f64,
    balances: &Balances,
    required_minimum_distribution: f64,
) -> WithdrawalBreakdown {
    let mut out = WithdrawalBreakdown {
        balances: *balances,
        ..Default::default()
    };
    let mut remaining = shortfall.max(0.0);

    let rmd = required_minimum_distribution
        .max(0.0)
        .min(out.balances.tax_deferred);
    if rmd > 0.0 {
        out.balances.tax_deferred -= rmd;
        out.from_tax_deferred = rmd;
        out.required_distribution = rmd;

        let applied = rmd.min(remaining);
        remaining -= applied;
        let excess = rmd - applied;
        if excess > 0.0 {
            out.balances.deposit_taxable(excess);
            out.reinvested = excess;
        }
    }

    for bucket in AccountBucket::WITHDRAWAL_ORDER {
        if remaining <= 0.0 {
            break;
        }
        let available = out.balances.get(bucket);
        if available <= 0.0 {
            continue;
        }
        if available < STABILITY_FLOOR {
            out.floored[bucket.index()] = true;
            continue;
        }

        let take = remaining.min(available);
        remaining -= take;
        match bucket {
            AccountBucket::Taxable => {
                let share = take / available;
                out.realized_gain += take * out.balances.unrealized_gain_fraction();
                out.balances.taxable_basis -= out.balances.taxable_basis * share;
                out.balances.taxable -= take;
                out.from_taxable += take;
            }
            AccountBucket::TaxDeferred => {
                out.balances.tax_deferred -= take;
                out.from_tax_deferred += take;
            }
            AccountBucket::Roth => {
                out.balances.roth -= take;
                out.from_roth += take;
            }
        }
    }

    out.unmet = remaining;
    out.balances.floor_at_zero();
    out
}
