//! Route handlers for the balance reports and recording carry-over balances.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Query, QueryRejection};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    balance::{
        CarryOver, MonthlyTotals, OwnerBalance, SpendingRatio, monthly_totals, owner_balance,
        record_carry_over, spending_ratio,
    },
    database_id::PersonId,
    period::{OwnerMonthParams, parse_month},
    timezone::local_today,
};

/// The state needed for the balance reports.
#[derive(Debug, Clone)]
pub struct BalanceState {
    /// The database connection for reading receipts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Warsaw".
    pub local_timezone: String,
}

impl FromRef<AppState> for BalanceState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Get the balance of the requested owners' shares for a month.
pub async fn get_balance_endpoint(
    State(state): State<BalanceState>,
    query: Result<Query<OwnerMonthParams>, QueryRejection>,
) -> Result<Json<OwnerBalance>, Error> {
    let Query(params) = query?;
    let (owners, year, month) = params.require()?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    owner_balance(&owners, year, month, &connection).map(Json)
}

/// Record the balance carried over into a month, responding with 201 and the
/// new receipt.
pub async fn create_carry_over_endpoint(
    State(state): State<BalanceState>,
    body: Result<Json<CarryOver>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(carry_over) = body?;
    let today = local_today(&state.local_timezone)?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = connection.unchecked_transaction()?;
    let receipt = record_carry_over(&carry_over, today, &transaction)
        .inspect_err(|error| tracing::debug!("could not record carry over: {error}"))?;
    transaction.commit()?;

    tracing::info!(
        "Recorded carry over of {} for {}-{:02}",
        carry_over.value,
        carry_over.year,
        carry_over.month
    );

    Ok((StatusCode::CREATED, Json(receipt)).into_response())
}

/// Get the spending ratio of the first requested owner for a month.
pub async fn get_spending_ratio_endpoint(
    State(state): State<BalanceState>,
    query: Result<Query<OwnerMonthParams>, QueryRejection>,
) -> Result<Json<SpendingRatio>, Error> {
    let Query(params) = query?;
    let (owners, year, month) = params.require()?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    spending_ratio(owners[0], year, month, &connection).map(Json)
}

#[derive(Debug, Deserialize)]
pub struct MonthlyBalanceQuery {
    owner: Option<PersonId>,
    year: Option<i32>,
    month: Option<u8>,
}

/// Get an owner's income and expense totals, defaulting to the current month.
pub async fn get_monthly_balance_endpoint(
    State(state): State<BalanceState>,
    query: Result<Query<MonthlyBalanceQuery>, QueryRejection>,
) -> Result<Json<MonthlyTotals>, Error> {
    let Query(query) = query?;
    let owner = query
        .owner
        .ok_or_else(|| Error::InvalidQuery("Invalid owner ID".to_owned()))?;
    let today = local_today(&state.local_timezone)?;
    let year = query.year.unwrap_or(today.year());
    let month = match query.month {
        Some(month) => parse_month(month)?,
        None => today.month(),
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    monthly_totals(owner, year, month, &connection).map(Json)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        http::StatusCode,
        routing::get,
    };
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};
    use time::macros::date;

    use crate::{
        category::Category,
        db::initialize,
        endpoints,
        person::{PersonForm, create_person},
        receipt::{NewItem, NewReceipt, Receipt, TransactionType, create_receipt},
    };

    use super::{
        BalanceState, create_carry_over_endpoint, get_balance_endpoint,
        get_monthly_balance_endpoint, get_spending_ratio_endpoint,
    };

    fn get_test_server(with_payer: bool) -> TestServer {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        create_person(&PersonForm::payer("Alice"), &conn).unwrap();
        create_person(&PersonForm::owner("Bob"), &conn).unwrap();
        let receipt = NewReceipt::build(date!(2025 - 02 - 14), 1, "Cinema", TransactionType::Expense)
            .item(NewItem::new(Category::TicketsEntrance, 50.0, &[1, 2]));
        create_receipt(&receipt, date!(2025 - 02 - 14), &conn).unwrap();
        if !with_payer {
            conn.execute("UPDATE person SET payer = 0", []).unwrap();
        }

        let state = BalanceState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let app = Router::new()
            .route(
                endpoints::BALANCE,
                get(get_balance_endpoint).post(create_carry_over_endpoint),
            )
            .route(endpoints::SPENDING_RATIO, get(get_spending_ratio_endpoint))
            .route(endpoints::MONTHLY_BALANCE, get(get_monthly_balance_endpoint))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn balance_reads_repeated_owner_keys() {
        let server = get_test_server(true);

        let balance: Value = server
            .get(&format!("{}?owners%5B%5D=1&owners%5B%5D=2&year=2025&month=2", endpoints::BALANCE))
            .await
            .json();

        assert_eq!(
            balance,
            json!({"computed_balance": -25.0, "create": true, "year": 2025, "month": 2})
        );
    }

    #[tokio::test]
    async fn balance_requires_parameters() {
        let server = get_test_server(true);

        server
            .get(&format!("{}?owners%5B%5D=1&year=2025", endpoints::BALANCE))
            .await
            .assert_status_bad_request();
        server
            .get(&format!("{}?owners%5B%5D=x&year=2025&month=2", endpoints::BALANCE))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn carry_over_creates_income_receipt() {
        let server = get_test_server(true);

        let response = server
            .post(endpoints::BALANCE)
            .json(&json!({"year": 2025, "month": 2, "value": 10.0}))
            .await;

        response.assert_status(StatusCode::CREATED);
        let receipt: Receipt = response.json();
        assert_eq!(receipt.transaction_type, TransactionType::Income);
        assert_eq!(receipt.items[0].category, Category::LastMonthBalance);

        let balance: Value = server
            .get(&format!("{}?owners%5B%5D=1&year=2025&month=2", endpoints::BALANCE))
            .await
            .json();
        assert_eq!(balance["create"], json!(false));
        assert_eq!(balance["saved_balance"], json!(10.0));
    }

    #[tokio::test]
    async fn carry_over_without_payer_is_bad_request() {
        let server = get_test_server(false);

        server
            .post(endpoints::BALANCE)
            .json(&json!({"year": 2025, "month": 2, "value": 10.0}))
            .await
            .assert_status_bad_request();
        server
            .post(endpoints::BALANCE)
            .json(&json!({"year": 2025}))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn spending_ratio_of_first_owner() {
        let server = get_test_server(true);

        let ratio: Value = server
            .get(&format!(
                "{}?owners%5B%5D=2&owners%5B%5D=1&year=2025&month=2",
                endpoints::SPENDING_RATIO
            ))
            .await
            .json();

        assert_eq!(ratio["spending"], json!(100.0));
        assert_eq!(ratio["spending_ids"], json!([1]));

        let empty: Value = server
            .get(&format!("{}?owners%5B%5D=2&year=2025&month=3", endpoints::SPENDING_RATIO))
            .await
            .json();
        assert_eq!(empty, json!({"detail": "No expenses in this period."}));

        server
            .get(&format!("{}?owners%5B%5D=9&year=2025&month=3", endpoints::SPENDING_RATIO))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn monthly_balance_needs_owner() {
        let server = get_test_server(true);

        let totals: Value = server
            .get(endpoints::MONTHLY_BALANCE)
            .add_query_param("owner", 2)
            .add_query_param("year", 2025)
            .add_query_param("month", 2)
            .await
            .json();
        assert_eq!(totals["total_expense"], json!(50.0));
        assert_eq!(totals["balance"], json!(-50.0));

        server
            .get(endpoints::MONTHLY_BALANCE)
            .add_query_param("owner", "-")
            .await
            .assert_status_bad_request();
        server
            .get(endpoints::MONTHLY_BALANCE)
            .await
            .assert_status_bad_request();
    }
}
