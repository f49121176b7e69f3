//! Account buckets
//!
//! Household savings are grouped by tax treatment into three buckets.
//! Only the taxable bucket tracks cost basis; withdrawals from it realize
//! the unrealized-gain share of the amount drawn.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Tax treatment of a savings bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountBucket {
    /// Brokerage accounts: gains taxed when realized
    Taxable,
    /// Traditional 401(k)/IRA: withdrawals taxed as ordinary income
    TaxDeferred,
    /// Roth accounts: withdrawals tax free
    Roth,
}

impl AccountBucket {
    /// Order in which shortfalls are drawn
    pub const WITHDRAWAL_ORDER: [AccountBucket; 3] = [
        AccountBucket::Taxable,
        AccountBucket::TaxDeferred,
        AccountBucket::Roth,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            AccountBucket::Taxable => 0,
            AccountBucket::TaxDeferred => 1,
            AccountBucket::Roth => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AccountBucket::Taxable => "taxable",
            AccountBucket::TaxDeferred => "tax-deferred",
            AccountBucket::Roth => "roth",
        }
    }
}

/// Starting balances as supplied by the household
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccountBalances {
    #[serde(default)]
    pub taxable: f64,
    /// Cost basis of the taxable bucket; defaults to its full value
    #[serde(default)]
    pub taxable_cost_basis: Option<f64>,
    #[serde(default)]
    pub tax_deferred: f64,
    #[serde(default)]
    pub roth: f64,
}

impl AccountBalances {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_amount("taxable", self.taxable)?;
        if let Some(basis) = self.taxable_cost_basis {
            ValidationError::check_amount("taxable_cost_basis", basis)?;
        }
        ValidationError::check_amount("tax_deferred", self.tax_deferred)?;
        ValidationError::check_amount("roth", self.roth)
    }

    pub fn total(&self) -> f64 {
        self.taxable + self.tax_deferred + self.roth
    }

    /// Working balances with the cost basis resolved
    pub fn to_balances(&self) -> Balances {
        Balances {
            taxable: self.taxable,
            taxable_basis: self
                .taxable_cost_basis
                .unwrap_or(self.taxable)
                .min(self.taxable),
            tax_deferred: self.tax_deferred,
            roth: self.roth,
        }
    }
}

/// Live balances of the three buckets within one simulated path
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Balances {
    pub taxable: f64,
    pub taxable_basis: f64,
    pub tax_deferred: f64,
    pub roth: f64,
}

impl Balances {
    #[inline]
    pub fn total(&self) -> f64 {
        self.taxable + self.tax_deferred + self.roth
    }

    #[inline]
    pub fn get(&self, bucket: AccountBucket) -> f64 {
        match bucket {
            AccountBucket::Taxable => self.taxable,
            AccountBucket::TaxDeferred => self.tax_deferred,
            AccountBucket::Roth => self.roth,
        }
    }

    /// Fraction of the taxable bucket that is unrealized gain
    #[inline]
    pub fn unrealized_gain_fraction(&self) -> f64 {
        if self.taxable <= 0.0 {
            return 0.0;
        }
        ((self.taxable - self.taxable_basis) / self.taxable).clamp(0.0, 1.0)
    }

    /// Add new money to the taxable bucket at full basis
    #[inline]
    pub fn deposit_taxable(&mut self, amount: f64) {
        if amount > 0.0 {
            self.taxable += amount;
            self.taxable_basis += amount;
        }
    }

    /// Clamp every bucket at zero; tiny negatives come from float rounding
    #[inline]
    pub fn floor_at_zero(&mut self) {
        self.taxable = self.taxable.max(0.0);
        self.taxable_basis = self.taxable_basis.clamp(0.0, self.taxable.max(0.0));
        self.tax_deferred = self.tax_deferred.max(0.0);
        self.roth = self.roth.max(0.0);
    }

    pub fn clear(&mut self) {
        *self = Balances::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basis_defaults_to_value() {
        let accounts = AccountBalances {
            taxable: 100_000.0,
            taxable_cost_basis: None,
            tax_deferred: 50_000.0,
            roth: 10_000.0,
        };
        let b = accounts.to_balances();
        assert_eq!(b.taxable_basis, 100_000.0);
        assert_eq!(b.total(), 160_000.0);
        assert_eq!(b.unrealized_gain_fraction(), 0.0);
    }

    #[test]
    fn test_basis_capped_at_value() {
        let accounts = AccountBalances {
            taxable: 100_000.0,
            taxable_cost_basis: Some(150_000.0),
            ..Default::default()
        };
        assert_eq!(accounts.to_balances().taxable_basis, 100_000.0);
    }

    #[test]
    fn test_unrealized_gain_fraction() {
        let b = Balances {
            taxable: 200_000.0,
            taxable_basis: 50_000.0,
            ..Default::default()
        };
        assert!((b.unrealized_gain_fraction() - 0.75).abs() < 1e-12);
        assert_eq!(Balances::default().unrealized_gain_fraction(), 0.0);
    }

    #[test]
    fn test_negative_balance_rejected() {
        let accounts = AccountBalances {
            roth: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            accounts.validate(),
            Err(ValidationError::NegativeAmount { field: "roth", .. })
        ));
    }

    #[test]
    fn test_floor_at_zero() {
        let mut b = Balances {
            taxable: -1e-9,
            taxable_basis: 10.0,
            tax_deferred: -3.0,
            roth: 5.0,
        };
        b.floor_at_zero();
        assert_eq!(b.taxable, 0.0);
        assert_eq!(b.taxable_basis, 0.0);
        assert_eq!(b.tax_deferred, 0.0);
        assert_eq!(b.roth, 5.0);
    }
}
