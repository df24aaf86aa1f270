//! Route handlers that serve the chart data as JSON.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use axum_extra::extract::{Query, QueryRejection};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    charts::{
        CategoryExpense, ChartParams, DailySums, MonthlySums, PersonExpenses, ShopExpense,
        bar_persons, bar_shops, daily_line_sums, monthly_line_sums, pie_categories,
    },
    period::OwnerMonthParams,
};

/// The state needed for the chart data.
#[derive(Debug, Clone)]
pub struct ChartState {
    /// The database connection for reading receipts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ChartState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn missing_owners() -> Error {
    Error::InvalidQuery("No owners were given in owners[]".to_owned())
}

/// The running totals of the first owner's shares for each day of a month.
pub async fn get_line_sums_endpoint(
    State(state): State<ChartState>,
    query: Result<Query<OwnerMonthParams>, QueryRejection>,
) -> Result<Json<Vec<DailySums>>, Error> {
    let Query(params) = query?;
    let (owners, year, month) = params.require()?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    daily_line_sums(owners[0], year, month, &connection).map(Json)
}

/// The running totals of the first owner's shares for each month of a year.
pub async fn get_monthly_line_sums_endpoint(
    State(state): State<ChartState>,
    query: Result<Query<ChartParams>, QueryRejection>,
) -> Result<Json<Vec<MonthlySums>>, Error> {
    let Query(params) = query?;
    let owner = *params.owners.first().ok_or_else(missing_owners)?;
    let year = params
        .year
        .ok_or_else(|| Error::InvalidQuery("Invalid or missing 'year' parameter".to_owned()))?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    monthly_line_sums(owner, year, &connection).map(Json)
}

/// What each payer spent on shared items and items they do not own.
pub async fn get_bar_persons_endpoint(
    State(state): State<ChartState>,
    query: Result<Query<ChartParams>, QueryRejection>,
) -> Result<Json<PersonExpenses>, Error> {
    let Query(params) = query?;
    let range = params.date_range()?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    bar_persons(range, &params.owners, params.categories(), &connection).map(Json)
}

/// The totals of the requested owners' items per shop.
pub async fn get_bar_shops_endpoint(
    State(state): State<ChartState>,
    query: Result<Query<ChartParams>, QueryRejection>,
) -> Result<Json<Vec<ShopExpense>>, Error> {
    let Query(params) = query?;
    let range = params.date_range()?;
    if params.owners.is_empty() {
        return Err(missing_owners());
    }
    let transaction_type = params.transaction_type()?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    bar_shops(
        range,
        &params.owners,
        transaction_type,
        params.categories(),
        &connection,
    )
    .map(Json)
}

/// The owner shares per category.
pub async fn get_pie_categories_endpoint(
    State(state): State<ChartState>,
    query: Result<Query<ChartParams>, QueryRejection>,
) -> Result<Json<Vec<CategoryExpense>>, Error> {
    let Query(params) = query?;
    let range = params.date_range()?;
    let transaction_type = params.transaction_type()?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    pie_categories(range, &params.owners, transaction_type, &connection).map(Json)
}
