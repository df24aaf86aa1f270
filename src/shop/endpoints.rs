//! Route handlers for searching, rescanning and clearing the recent shop cache.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use axum_extra::extract::{Query, QueryRejection};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    database_id::DatabaseId,
    shop::{capitalize, clear_shops, rescan_shops, search_shops},
};

/// The state needed for the recent shop cache.
#[derive(Debug, Clone)]
pub struct ShopState {
    /// The database connection for the shop cache.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ShopState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
}

/// A shop name suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopSuggestion {
    pub id: DatabaseId,
    pub name: String,
}

/// The body of a search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopSearchResults {
    pub results: Vec<ShopSuggestion>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RescanRequest {
    #[serde(default)]
    new_shops: Vec<String>,
}

/// Search the recent shops by the `q` query parameter.
pub async fn search_shops_endpoint(
    State(state): State<ShopState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<ShopSearchResults>, Error> {
    let Query(query) = query?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let results = search_shops(query.q.as_deref(), &connection)?
        .into_iter()
        .map(|shop| ShopSuggestion {
            id: shop.id,
            name: capitalize(&shop.name),
        })
        .collect();

    Ok(Json(ShopSearchResults { results }))
}

/// Rebuild the cache from the receipts, adding the shops in the request body.
pub async fn rescan_shops_endpoint(
    State(state): State<ShopState>,
    body: Result<Json<RescanRequest>, JsonRejection>,
) -> Result<Json<Value>, Error> {
    // A rescan without a JSON body only rebuilds the cache from the receipts.
    let request = match body {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => RescanRequest::default(),
        Err(rejection) => return Err(rejection.into()),
    };
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let updated_shops = rescan_shops(&request.new_shops, OffsetDateTime::now_utc(), &connection)?;
    tracing::info!("Rescanned {} shops", updated_shops.len());

    Ok(Json(json!({
        "message": "Shops updated successfully.",
        "updated_shops": updated_shops,
    })))
}

/// Remove every shop from the cache.
pub async fn clear_shops_endpoint(State(state): State<ShopState>) -> Result<Json<Value>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let deleted = clear_shops(&connection)?;
    tracing::info!("Deleted {deleted} recent shops");

    Ok(Json(json!({ "message": "All recent shops have been deleted." })))
}
