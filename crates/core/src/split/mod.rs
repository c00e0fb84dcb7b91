//! Expense split calculation.
//!
//! A pure function from (amount, active members, policy, policy input) to
//! per-member owed amounts, with rounding-remainder reconciliation so that
//! the shares always sum back to the expense amount.

mod calculator;
mod error;
mod types;

#[cfg(test)]
mod calculator_props;

pub use calculator::compute_splits;
pub use error::SplitError;
pub use types::{SplitDetail, SplitShare, SplitType};
