//! Simplified Norwegian rental tax estimate.
//!
//! Rental profit is capital income taxed at a flat rate. Letting part of
//! the home the landlord lives in (at most half by rental value) is tax
//! free. Short-term letting of the own home has a yearly tax-free
//! allowance; 85 % of the income above it is taxable and expenses are not
//! separately deductible. All arithmetic is integer øre, rounding down at
//! every step.

use serde::Serialize;
use utleie_database::LettingKind;

/// Flat capital-income tax rate (skatt på alminnelig inntekt).
pub const CAPITAL_INCOME_TAX_RATE_PERCENT: i64 = 22;

/// Yearly tax-free allowance for short-term letting of the own home
/// (10 000 kr, in øre).
pub const SHORT_TERM_TAX_FREE_ALLOWANCE_ORE: i64 = 1_000_000;

/// Share of short-term income above the allowance that is taxable.
pub const SHORT_TERM_TAXABLE_SHARE_PERCENT: i64 = 85;

/// Estimated tax position for one unit over one year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxEstimate {
    pub letting_kind: LettingKind,
    pub gross_income_ore: i64,
    pub deductible_expenses_ore: i64,
    /// Income minus deductible expenses, may be negative.
    pub profit_ore: i64,
    /// The base the flat rate applies to, never negative.
    pub taxable_base_ore: i64,
    pub estimated_tax_ore: i64,
    pub tax_free: bool,
}

/// Estimate the tax owed on one unit's yearly income and expenses.
pub fn estimate(kind: LettingKind, income_ore: i64, expenses_ore: i64) -> TaxEstimate {
    match kind {
        LettingKind::OwnHome => TaxEstimate {
            letting_kind: kind,
            gross_income_ore: income_ore,
            deductible_expenses_ore: 0,
            profit_ore: income_ore,
            taxable_base_ore: 0,
            estimated_tax_ore: 0,
            tax_free: true,
        },
        LettingKind::ShortTermOwnHome => {
            let above_allowance = (income_ore - SHORT_TERM_TAX_FREE_ALLOWANCE_ORE).max(0);
            let taxable_base = above_allowance * SHORT_TERM_TAXABLE_SHARE_PERCENT / 100;
            TaxEstimate {
                letting_kind: kind,
                gross_income_ore: income_ore,
                deductible_expenses_ore: 0,
                profit_ore: income_ore,
                taxable_base_ore: taxable_base,
                estimated_tax_ore: taxable_base * CAPITAL_INCOME_TAX_RATE_PERCENT / 100,
                tax_free: taxable_base == 0,
            }
        }
        LettingKind::Secondary => {
            let profit = income_ore - expenses_ore;
            let taxable_base = profit.max(0);
            TaxEstimate {
                letting_kind: kind,
                gross_income_ore: income_ore,
                deductible_expenses_ore: expenses_ore,
                profit_ore: profit,
                taxable_base_ore: taxable_base,
                estimated_tax_ore: taxable_base * CAPITAL_INCOME_TAX_RATE_PERCENT / 100,
                tax_free: false,
            }
        }
    }
}
