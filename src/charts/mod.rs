//! Aggregations behind the dashboard charts: cumulative line sums, per person
//! and per shop bars, and the category pie.

mod core;
mod endpoints;

pub use core::{
    CategoryExpense, ChartParams, DailySums, MonthlySums, PersonExpenses, ShopExpense,
    bar_persons, bar_shops, daily_line_sums, monthly_line_sums, pie_categories,
};
pub use endpoints::{
    get_bar_persons_endpoint, get_bar_shops_endpoint, get_line_sums_endpoint,
    get_monthly_line_sums_endpoint, get_pie_categories_endpoint,
};
