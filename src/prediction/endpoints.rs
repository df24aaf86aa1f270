//! Route handlers for the item description predictions.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use axum_extra::extract::{Query, QueryRejection};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    prediction::{clear_predictions, rescan_predictions, search_predictions},
    shop::capitalize,
};

/// The state needed for the item predictions.
#[derive(Debug, Clone)]
pub struct PredictionState {
    /// The database connection for the predictions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for PredictionState {
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

/// A suggested item description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSuggestion {
    pub name: String,
    pub frequency: i64,
}

/// The body of a search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSearchResults {
    pub results: Vec<PredictionSuggestion>,
}

/// Search the item descriptions by the `q` query parameter.
pub async fn search_predictions_endpoint(
    State(state): State<PredictionState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<PredictionSearchResults>, Error> {
    let Query(query) = query?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let results = search_predictions(query.q.as_deref(), &connection)?
        .into_iter()
        .map(|prediction| PredictionSuggestion {
            name: capitalize(&prediction.item_description),
            frequency: prediction.frequency,
        })
        .collect();

    Ok(Json(PredictionSearchResults { results }))
}

/// Recount the item descriptions of every receipt.
pub async fn rescan_predictions_endpoint(
    State(state): State<PredictionState>,
) -> Result<Json<Value>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let count = rescan_predictions(&connection)?;
    tracing::info!("Rescanned {count} item descriptions");

    Ok(Json(json!({ "message": "ItemPrediction table updated." })))
}

/// Remove every prediction.
pub async fn clear_predictions_endpoint(
    State(state): State<PredictionState>,
) -> Result<Json<Value>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let deleted = clear_predictions(&connection)?;
    tracing::info!("Deleted {deleted} item predictions");

    Ok(Json(json!({ "message": "All predictions have been deleted." })))
}
