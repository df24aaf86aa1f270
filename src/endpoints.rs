//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/person/{person_id}', use [format_endpoint].

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The HTML overview of a month.
pub const DASHBOARD_VIEW: &str = "/dashboard";

/// The route to list the item categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to list and create people.
pub const PERSONS: &str = "/api/person";
/// The route to access a single person.
pub const PERSON: &str = "/api/person/{person_id}";
/// The route to list and create receipts.
pub const RECEIPTS: &str = "/api/receipts";
/// The route to access a single receipt.
pub const RECEIPT: &str = "/api/receipts/{receipt_id}";
/// The route to list items.
pub const ITEMS: &str = "/api/items";
/// The route to access a single item.
pub const ITEM: &str = "/api/items/{item_id}";
/// The route to list the receipts with flat bills in a month.
pub const BILLS: &str = "/api/bills";
/// The route to compare the computed and saved balance of a month, or save a carry-over.
pub const BALANCE: &str = "/api/balance";
/// The route to split a person's expenses into the invest, spending and fun groups.
pub const SPENDING_RATIO: &str = "/api/spending-ratio";
/// The route for a person's income and expense totals in a month.
pub const MONTHLY_BALANCE: &str = "/api/monthly-balance";
/// The route for the cumulative daily sums of a month.
pub const LINE_SUMS: &str = "/api/fetch/line-sums";
/// The route for the cumulative monthly sums of a year.
pub const LINE_SUMS_MONTHLY: &str = "/api/fetch/line-sums-monthly";
/// The route for the expenses per payer.
pub const BAR_PERSONS: &str = "/api/fetch/bar-persons";
/// The route for the expenses per shop.
pub const BAR_SHOPS: &str = "/api/fetch/bar-shops";
/// The route for the expenses per category.
pub const PIE_CATEGORIES: &str = "/api/fetch/pie-categories";
/// The route to search, rescan and clear the recent shops.
pub const RECENT_SHOPS: &str = "/api/shops/recent";
/// The route to search, rescan and clear the item description predictions.
pub const PREDICTIONS: &str = "/api/predictions";
/// The route to download every receipt as NDJSON.
pub const EXPORT: &str = "/api/receipts/export";
/// The route to download every receipt in a zip archive.
pub const EXPORT_ZIP: &str = "/api/receipts/export.zip";
/// The route to upload an NDJSON file or a zip archive of receipts.
pub const IMPORT: &str = "/api/receipts/import";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/person/{person_id}', '{person_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, it is returned unchanged.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
