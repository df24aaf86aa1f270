//! Dashboard HTTP handler and view rendering.

use std::{
    ops::RangeInclusive,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Query, QueryRejection};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, Month};

use crate::{
    AppState, Error,
    charts::{bar_shops, pie_categories},
    dashboard::{
        charts::{
            DashboardChart, category_pie_chart, charts_script, charts_view,
            cumulative_daily_shares, daily_line_chart, shop_bar_chart,
        },
        tables::{share_summaries, summary_table},
    },
    database_id::PersonId,
    endpoints,
    html::{HeadElement, PAGE_CONTAINER_STYLE, base, link},
    period::{month_range, parse_month},
    person::{Person, get_all_persons, get_persons_flagged_owner},
    receipt::{ReceiptFilter, TransactionType, get_receipts},
    timezone::local_today,
};

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading receipts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Warsaw".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The month and people to show on the dashboard.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub year: Option<i32>,
    pub month: Option<u8>,
    /// Defaults to every person flagged as an owner.
    #[serde(rename = "owners[]", default)]
    pub owners: Vec<PersonId>,
}

/// Holds all the data needed to render the dashboard.
struct DashboardData {
    charts: [DashboardChart; 3],
    summary: Markup,
}

/// Display an overview of a month for a group of owners.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> Result<Response, Error> {
    let Query(query) = query?;

    let today = local_today(&state.local_timezone)?;
    let year = query.year.unwrap_or(today.year());
    let month = match query.month {
        Some(month) => parse_month(month)?,
        None => today.month(),
    };
    // The year must be valid before the navigation links step over it.
    let range = month_range(year, month)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let owners = select_owners(&query.owners, &connection)?;
    let navigation = month_navigation(year, month, &query.owners);

    match build_dashboard_data(year, month, range, &owners, &connection)? {
        Some(data) => Ok(dashboard_view(year, month, &navigation, &data).into_response()),
        None => Ok(dashboard_no_data_view(year, month, &navigation).into_response()),
    }
}

/// The people the dashboard is about: the requested IDs that exist, or every
/// owner-flagged person when none were requested.
fn select_owners(requested: &[PersonId], connection: &Connection) -> Result<Vec<Person>, Error> {
    if requested.is_empty() {
        return get_persons_flagged_owner(connection);
    }

    Ok(get_all_persons(connection)?
        .into_iter()
        .filter(|person| requested.contains(&person.id))
        .collect())
}

/// Fetches and builds all data needed for the dashboard display.
///
/// Returns `None` if no receipts were paid in the month or none of the
/// requested owners exist.
fn build_dashboard_data(
    year: i32,
    month: Month,
    range: RangeInclusive<Date>,
    owners: &[Person],
    connection: &Connection,
) -> Result<Option<DashboardData>, Error> {
    if owners.is_empty() {
        return Ok(None);
    }

    let receipts = get_receipts(&ReceiptFilter::in_range(range.clone()), connection)
        .inspect_err(|error| tracing::error!("could not get receipts for {year}-{month}: {error}"))?;

    if receipts.is_empty() {
        return Ok(None);
    }

    let owner_ids: Vec<PersonId> = owners.iter().map(|owner| owner.id).collect();

    let categories = pie_categories(
        range.clone(),
        &owner_ids,
        Some(TransactionType::Expense),
        connection,
    )?;
    let shops = bar_shops(
        range,
        &owner_ids,
        Some(TransactionType::Expense),
        &[],
        connection,
    )?;
    let cumulative = cumulative_daily_shares(&receipts, &owner_ids, year, month)?;

    let charts = [
        DashboardChart {
            id: "categories-chart",
            options: category_pie_chart(&categories).to_string(),
        },
        DashboardChart {
            id: "shops-chart",
            options: shop_bar_chart(&shops).to_string(),
        },
        DashboardChart {
            id: "daily-chart",
            options: daily_line_chart(&cumulative).to_string(),
        },
    ];

    Ok(Some(DashboardData {
        charts,
        summary: summary_table(&share_summaries(&receipts, owners)),
    }))
}

/// Links to the previous and next month that keep the selected owners.
fn month_navigation(year: i32, month: Month, owners: &[PersonId]) -> Markup {
    let previous_year = if month == Month::January { year - 1 } else { year };
    let next_year = if month == Month::December { year + 1 } else { year };

    let owners_query: String = owners
        .iter()
        .map(|owner| format!("&owners%5B%5D={owner}"))
        .collect();
    let url = |year: i32, month: Month| {
        format!(
            "{}?year={year}&month={}{owners_query}",
            endpoints::DASHBOARD_VIEW,
            month as u8
        )
    };

    html!(
        nav class="flex gap-4 mb-4"
        {
            (link(&url(previous_year, month.previous()), "Previous month"))
            (link(&url(next_year, month.next()), "Next month"))
        }
    )
}

/// Renders the dashboard page when no receipts exist for the month.
fn dashboard_no_data_view(year: i32, month: Month, navigation: &Markup) -> Markup {
    let content = html!(
        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-2xl font-bold mb-2" { (month) " " (year) }

            (navigation)

            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p
            {
                "Charts will show up here once receipts have been recorded
                for this month."
            }
        }
    );

    base("Dashboard", &[], &content)
}

/// Renders the main dashboard page with the summary table and charts.
fn dashboard_view(year: i32, month: Month, navigation: &Markup, data: &DashboardData) -> Markup {
    let content = html!(
        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            h1 class="text-2xl font-bold mb-2" { (month) " " (year) }

            (navigation)

            div class="w-full mb-8" { (data.summary) }

            (charts_view(&data.charts))
        }
    );

    let scripts = [HeadElement::echarts(), charts_script(&data.charts)];

    base("Dashboard", &scripts, &content)
}
