//! An HTML overview of one month: share totals per owner and charts.

mod charts;
mod handlers;
mod tables;

pub use handlers::get_dashboard_page;
