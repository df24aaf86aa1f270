//! The cache of recently used shop names that backs the shop auto-complete.

mod core;
mod endpoints;

pub use core::{
    MIN_QUERY_LENGTH, capitalize, clear_shops, create_recent_shop_table, normalize_name,
    rescan_shops, search_shops, touch_shop,
};
pub use endpoints::{clear_shops_endpoint, rescan_shops_endpoint, search_shops_endpoint};
