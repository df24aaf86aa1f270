//! Month balances of the people sharing costs, the carry-over balance and the
//! spending ratio breakdown.

mod core;
mod endpoints;

pub use core::{
    CarryOver, MonthlyTotals, OwnerBalance, SpendingRatio, monthly_totals, owner_balance,
    record_carry_over, spending_ratio,
};
pub use endpoints::{
    create_carry_over_endpoint, get_balance_endpoint, get_monthly_balance_endpoint,
    get_spending_ratio_endpoint,
};
