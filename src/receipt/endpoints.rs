//! Route handlers for receipts, items and bills.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Query, QueryRejection};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    category::Category,
    database_id::{ItemId, ReceiptId},
    prediction::increment_prediction,
    receipt::{
        Item, ItemFilter, NewItem, NewReceipt, Receipt, ReceiptFilter, TransactionType,
        create_receipt, delete_item, delete_receipt, get_item, get_items, get_receipt,
        get_receipts, update_item, update_receipt,
    },
    shop::touch_shop,
    timezone::local_today,
};

/// The state needed for managing receipts and items.
#[derive(Debug, Clone)]
pub struct ReceiptState {
    /// The database connection for managing receipts.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Warsaw".
    pub local_timezone: String,
}

impl FromRef<AppState> for ReceiptState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A request body holding either one receipt or a list of them.
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptPayload {
    Many(Vec<NewReceipt>),
    One(NewReceipt),
}

impl TryFrom<Value> for ReceiptPayload {
    type Error = Error;

    /// Arrays are read as a list of receipts, anything else as a single receipt.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let payload = match value {
            Value::Array(_) => serde_json::from_value(value).map(ReceiptPayload::Many),
            value => serde_json::from_value(value).map(ReceiptPayload::One),
        };

        payload.map_err(|error| {
            tracing::debug!("rejected receipt body: {error}");
            Error::InvalidRequestBody(error.to_string())
        })
    }
}

/// Create one or more receipts, responding with 201 and the receipt(s) as given.
///
/// All receipts are created in a single transaction. Shops and item
/// descriptions are added to the auto-complete caches.
pub async fn create_receipts_endpoint(
    State(state): State<ReceiptState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(body) = body?;
    let payload = ReceiptPayload::try_from(body)?;
    let today = local_today(&state.local_timezone)?;
    let now = OffsetDateTime::now_utc();
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = connection.unchecked_transaction()?;
    let create = |new_receipt: &NewReceipt| -> Result<Receipt, Error> {
        let receipt = create_receipt(new_receipt, today, &transaction)?;
        touch_shop(&receipt.shop, now, &transaction)?;

        for item in &receipt.items {
            increment_prediction(&item.description, &transaction)?;
        }

        Ok(receipt)
    };

    let response = match payload {
        ReceiptPayload::One(new_receipt) => {
            let receipt = create(&new_receipt)
                .inspect_err(|error| tracing::debug!("could not create receipt: {error}"))?;
            Json(receipt).into_response()
        }
        ReceiptPayload::Many(new_receipts) => {
            let receipts = new_receipts
                .iter()
                .map(create)
                .collect::<Result<Vec<_>, _>>()
                .inspect_err(|error| tracing::debug!("could not create receipts: {error}"))?;
            Json(receipts).into_response()
        }
    };

    transaction.commit()?;

    Ok((StatusCode::CREATED, response).into_response())
}

/// List the receipts matching the query parameters.
pub async fn get_receipts_endpoint(
    State(state): State<ReceiptState>,
    query: Result<Query<ReceiptFilter>, QueryRejection>,
) -> Result<Json<Vec<Receipt>>, Error> {
    let Query(filter) = query?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_receipts(&filter, &connection).map(Json)
}

/// Get a single receipt by ID.
pub async fn get_receipt_endpoint(
    State(state): State<ReceiptState>,
    Path(receipt_id): Path<ReceiptId>,
) -> Result<Json<Receipt>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_receipt(receipt_id, &connection).map(Json)
}

/// Replace a receipt and all of its items.
pub async fn update_receipt_endpoint(
    State(state): State<ReceiptState>,
    Path(receipt_id): Path<ReceiptId>,
    body: Result<Json<NewReceipt>, JsonRejection>,
) -> Result<Json<Receipt>, Error> {
    let Json(new_receipt) = body?;
    let today = local_today(&state.local_timezone)?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = connection.unchecked_transaction()?;
    let receipt = update_receipt(receipt_id, &new_receipt, today, &transaction)
        .inspect_err(|error| tracing::debug!("could not update receipt {receipt_id}: {error}"))?;
    transaction.commit()?;

    Ok(Json(receipt))
}

/// Delete a receipt and its items.
pub async fn delete_receipt_endpoint(
    State(state): State<ReceiptState>,
    Path(receipt_id): Path<ReceiptId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    delete_receipt(receipt_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// List the items matching the `owner` and `category` query parameters.
pub async fn get_items_endpoint(
    State(state): State<ReceiptState>,
    query: Result<Query<ItemFilter>, QueryRejection>,
) -> Result<Json<Vec<Item>>, Error> {
    let Query(filter) = query?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_items(&filter, &connection).map(Json)
}

/// Get a single item by ID.
pub async fn get_item_endpoint(
    State(state): State<ReceiptState>,
    Path(item_id): Path<ItemId>,
) -> Result<Json<Item>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_item(item_id, &connection).map(Json)
}

/// Replace an item's details and owners.
pub async fn update_item_endpoint(
    State(state): State<ReceiptState>,
    Path(item_id): Path<ItemId>,
    body: Result<Json<NewItem>, JsonRejection>,
) -> Result<Json<Item>, Error> {
    let Json(new_item) = body?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = connection.unchecked_transaction()?;
    let item = update_item(item_id, &new_item, &transaction)?;
    transaction.commit()?;

    Ok(Json(item))
}

/// Delete a single item from its receipt.
pub async fn delete_item_endpoint(
    State(state): State<ReceiptState>,
    Path(item_id): Path<ItemId>,
) -> Result<StatusCode, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    delete_item(item_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct BillsQuery {
    year: i32,
    month: u8,
}

/// List the expense receipts of a month that include a flat bills item.
pub async fn get_bills_endpoint(
    State(state): State<ReceiptState>,
    query: Result<Query<BillsQuery>, QueryRejection>,
) -> Result<Json<Vec<Receipt>>, Error> {
    let Query(BillsQuery { year, month }) = query?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let filter = ReceiptFilter {
        year: Some(year),
        month: Some(month),
        transaction_type: Some(TransactionType::Expense),
        category: Some(Category::FlatBills),
        ..Default::default()
    };

    get_receipts(&filter, &connection).map(Json)
}
